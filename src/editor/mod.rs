//! Table and attribute editors.
//!
//! An editor is a draft over one entity. It validates edits as they are made
//! and hands the store a canonical node, patch or edge set on save. Nothing
//! touches the store until the session applies a save.

pub mod attribute;
pub mod impact;
pub mod suggest;
pub mod table;

pub use attribute::AttributeEditor;
pub use impact::{AffectedPeer, ImpactPreview, ImpactScope};
pub use suggest::{RelationshipStrategy, SubstringAffinity, Suggestion, TableRef};
pub use table::{Direction, RelationshipDraft, TableEditor};

use crate::model::KeyConflict;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("A table needs at least one column")]
    NoColumns,
    #[error(transparent)]
    KeyConflict(#[from] KeyConflict),
    #[error("{table}.{column} is a key column and cannot be deleted directly; delete the table {table} instead")]
    ProtectedColumn { table: String, column: String },
    #[error("Attribute {table}.{attribute} is a key and cannot be deleted directly; delete the table {table} instead")]
    ProtectedAttribute { table: String, attribute: String },
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
    #[error("Column already exists: {0}")]
    DuplicateColumn(String),
    #[error("Relationship target is not a table: {0}")]
    UnknownPeer(String),
    #[error("No suggestion at index {0}")]
    NoSuchSuggestion(usize),
}

/// Whether the user has confirmed past the warnings of a save or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Confirmation {
    #[default]
    Unconfirmed,
    Confirmed,
}

impl Confirmation {
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed { Self::Confirmed } else { Self::Unconfirmed }
    }
}

/// Non-blocking findings a save needs confirmed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "camelCase")]
pub enum SaveWarning {
    MissingPrimaryKey { table: String },
    KeyImpact(ImpactPreview),
}

impl std::fmt::Display for SaveWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPrimaryKey { table } => write!(f, "Table {} has no primary key", table),
            Self::KeyImpact(preview) => f.write_str(&preview.summary()),
        }
    }
}

/// Reject blank required input.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), EditorError> {
    if value.trim().is_empty() {
        Err(EditorError::MissingField(field))
    } else {
        Ok(())
    }
}
