//! Bulk task import.
//!
//! Input is a JSON array of task descriptors. Parsing is all-or-nothing:
//! a malformed document or a single bad descriptor rejects the whole batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_STATUS: &str = "completed";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON array of tasks")]
    NotAnArray,
    #[error("Task {index} is missing a non-empty \"task\" field")]
    MissingTask { index: usize },
    #[error("Task {index} has a non-string \"status\"")]
    InvalidStatus { index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultLogEntry {
    pub id: String,
    pub task: String,
    pub status: String,
    pub output: Value,
    pub timestamp: DateTime<Utc>,
}

/// A validated batch together with the document it came from. The raw
/// array is what gets recorded as the change payload.
#[derive(Debug, Clone)]
pub struct TaskBatch {
    pub tasks: Vec<TaskDescriptor>,
    pub raw: Value,
}

impl TaskBatch {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

pub fn parse_tasks(input: &str) -> Result<TaskBatch, ImportError> {
    let raw: Value = serde_json::from_str(input)?;
    let Value::Array(items) = &raw else {
        return Err(ImportError::NotAnArray);
    };

    let mut tasks = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let task = item
            .get("task")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ImportError::MissingTask { index })?;
        let status = match item.get("status") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ImportError::InvalidStatus { index }),
        };
        tasks.push(TaskDescriptor {
            task: task.to_string(),
            status,
            params: item.get("params").cloned(),
        });
    }

    Ok(TaskBatch { tasks, raw })
}

/// One result entry per task, in input order.
pub fn replay(batch: &TaskBatch) -> Vec<ResultLogEntry> {
    let now = Utc::now();
    batch
        .tasks
        .iter()
        .map(|t| ResultLogEntry {
            id: Uuid::new_v4().to_string(),
            task: t.task.clone(),
            status: t.status.clone().unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            output: t.params.clone().unwrap_or_else(|| Value::Object(Default::default())),
            timestamp: now,
        })
        .collect()
}
