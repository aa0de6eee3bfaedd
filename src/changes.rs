//! Pending-change log and the commit-review state machine.
//!
//! `Recorded -> begin_review -> UnderReview -> resolve(Accept | Decline | Modify)`.
//! Accept and Decline clear the log; Modify returns to `Recorded` with the
//! log intact. Applying the outcome to the graph is the caller's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    AddTable,
    UpdateTable,
    DeleteTable,
    AddAttribute,
    UpdateAttribute,
    DeleteAttribute,
    AddRelationship,
    DeleteRelationship,
    AddColumn,
    AddTransformation,
    BulkUpload,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddTable => "add_table",
            Self::UpdateTable => "update_table",
            Self::DeleteTable => "delete_table",
            Self::AddAttribute => "add_attribute",
            Self::UpdateAttribute => "update_attribute",
            Self::DeleteAttribute => "delete_attribute",
            Self::AddRelationship => "add_relationship",
            Self::DeleteRelationship => "delete_relationship",
            Self::AddColumn => "add_column",
            Self::AddTransformation => "add_transformation",
            Self::BulkUpload => "bulk_upload",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::AddTable => "Added table",
            Self::UpdateTable => "Updated table",
            Self::DeleteTable => "Deleted table",
            Self::AddAttribute => "Added attribute",
            Self::UpdateAttribute => "Updated attribute",
            Self::DeleteAttribute => "Deleted attribute",
            Self::AddRelationship => "Added relationship",
            Self::DeleteRelationship => "Deleted relationship",
            Self::AddColumn => "Added column",
            Self::AddTransformation => "Added transformation",
            Self::BulkUpload => "Bulk upload",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub id: String,
    pub kind: ChangeKind,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl PendingChange {
    pub fn new(kind: ChangeKind, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// One-line summary for the review dialog.
    pub fn summary_line(&self) -> String {
        let subject = ["tableName", "attributeName", "name", "id"]
            .iter()
            .find_map(|k| self.payload.get(*k).and_then(Value::as_str));
        match subject {
            Some(s) => format!("{}: {}", self.kind.describe(), s),
            None => self.kind.describe().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    #[default]
    Recorded,
    UnderReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOutcome {
    Accept,
    Decline,
    Modify,
}

impl ReviewOutcome {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "accept" => Some(Self::Accept),
            "decline" => Some(Self::Decline),
            "modify" => Some(Self::Modify),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub total: usize,
    pub by_kind: BTreeMap<ChangeKind, usize>,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("There are no pending changes to commit")]
    NothingToCommit,
    #[error("Changes are under review; accept, decline or modify first")]
    ReviewInProgress,
    #[error("No review is in progress")]
    NotUnderReview,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    pending: Vec<PendingChange>,
    state: ReviewState,
}

impl ChangeLog {
    pub fn pending(&self) -> &[PendingChange] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn ensure_recording(&self) -> Result<(), TransactionError> {
        match self.state {
            ReviewState::Recorded => Ok(()),
            ReviewState::UnderReview => Err(TransactionError::ReviewInProgress),
        }
    }

    pub fn record(&mut self, kind: ChangeKind, payload: Value) -> Result<&PendingChange, TransactionError> {
        self.ensure_recording()?;
        let change = PendingChange::new(kind, payload);
        tracing::debug!(kind = kind.as_str(), pending = self.pending.len() + 1, "recorded change");
        self.pending.push(change);
        Ok(&self.pending[self.pending.len() - 1])
    }

    /// Commit: freeze the log and summarize it for review.
    pub fn begin_review(&mut self) -> Result<ReviewSummary, TransactionError> {
        self.ensure_recording()?;
        if self.pending.is_empty() {
            return Err(TransactionError::NothingToCommit);
        }
        self.state = ReviewState::UnderReview;

        let mut by_kind = BTreeMap::new();
        for change in &self.pending {
            *by_kind.entry(change.kind).or_insert(0) += 1;
        }
        Ok(ReviewSummary {
            total: self.pending.len(),
            by_kind,
            lines: self.pending.iter().map(PendingChange::summary_line).collect(),
        })
    }

    /// Close the review. Returns the changes that were cleared, if any.
    pub fn resolve(&mut self, outcome: ReviewOutcome) -> Result<Vec<PendingChange>, TransactionError> {
        if self.state != ReviewState::UnderReview {
            return Err(TransactionError::NotUnderReview);
        }
        self.state = ReviewState::Recorded;
        let cleared = match outcome {
            ReviewOutcome::Accept | ReviewOutcome::Decline => std::mem::take(&mut self.pending),
            ReviewOutcome::Modify => Vec::new(),
        };
        tracing::info!(?outcome, cleared = cleared.len(), retained = self.pending.len(), "review resolved");
        Ok(cleared)
    }

    /// Drop the log outside a review, e.g. after a view switch.
    pub fn clear(&mut self) -> Vec<PendingChange> {
        std::mem::take(&mut self.pending)
    }
}
