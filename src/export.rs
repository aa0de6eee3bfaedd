//! Export formats: DDL file naming and the session snapshot document.

use crate::artifacts::{ChatMessage, Transformation};
use crate::changes::PendingChange;
use crate::import::ResultLogEntry;
use crate::model::{Edge, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `schema_<unix millis>.sql`
pub fn ddl_file_name(at: DateTime<Utc>) -> String {
    format!("schema_{}.sql", at.timestamp_millis())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub transformations: Vec<Transformation>,
    pub result_logs: Vec<ResultLogEntry>,
    pub chat_messages: Vec<ChatMessage>,
    pub pending_changes: Vec<PendingChange>,
    pub timestamp: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
