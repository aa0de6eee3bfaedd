//! Append-only audit log.
//!
//! Entries are kept in memory and optionally forwarded to an [`AuditSink`].
//! A sink failure is reported through `tracing` and otherwise ignored; it
//! never reaches the operation being audited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuditSinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait AuditSink {
    fn write_entry(&mut self, entry: &AuditLogEntry) -> Result<(), AuditSinkError>;
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> AuditSink for JsonLinesSink<W> {
    fn write_entry(&mut self, entry: &AuditLogEntry) -> Result<(), AuditSinkError> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub struct AuditLog {
    actor_id: String,
    entries: Vec<AuditLogEntry>,
    sink: Option<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("actor_id", &self.actor_id)
            .field("entries", &self.entries.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl AuditLog {
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            entries: Vec::new(),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    pub fn entries(&self) -> &[AuditLogEntry] {
        &self.entries
    }

    pub fn log_action(&mut self, action: &str, details: Value, context_id: Option<&str>) -> &AuditLogEntry {
        let entry = AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            action: action.to_string(),
            timestamp: Utc::now(),
            actor_id: self.actor_id.clone(),
            details,
            context_id: context_id.map(str::to_string),
        };
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.write_entry(&entry) {
                tracing::warn!(action, error = %e, "audit sink failed; entry kept in memory only");
            }
        }
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Export as a JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;

    struct Broken;

    impl AuditSink for Broken {
        fn write_entry(&mut self, _: &AuditLogEntry) -> Result<(), AuditSinkError> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed").into())
        }
    }

    #[test]
    fn test_log_action() {
        let mut log = AuditLog::new("analyst");
        log.log_action("add_table", json!({"tableName": "Payment"}), Some("tbl:Payment"));
        let entry = &log.entries()[0];
        assert_eq!(entry.actor_id, "analyst");
        assert_eq!(entry.context_id.as_deref(), Some("tbl:Payment"));

        let exported: Value = serde_json::from_str(&log.to_json().unwrap()).unwrap();
        assert_eq!(exported[0]["action"], "add_table");
        assert_eq!(exported[0]["actorId"], "analyst");
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let mut log = AuditLog::new("analyst").with_sink(Box::new(Broken));
        log.log_action("delete_table", json!({}), None);
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn test_json_lines_sink() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let writer = file.reopen().unwrap();
        let mut log = AuditLog::new("a").with_sink(Box::new(JsonLinesSink::new(writer)));
        log.log_action("add_table", json!({"n": 1}), None);
        log.log_action("add_column", json!({"n": 2}), None);

        let text = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: AuditLogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.action, "add_column");
    }
}
