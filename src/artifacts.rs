//! Session artifacts that ride along with the graph: transformations and
//! the accepted query-service conversation.

use crate::editor::{require, EditorError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    pub id: String,
    pub name: String,
    pub source_table: String,
    pub target_table: String,
    pub expression: String,
    pub created_at: DateTime<Utc>,
}

impl Transformation {
    pub fn new(
        name: &str,
        source_table: &str,
        target_table: &str,
        expression: &str,
    ) -> Result<Self, EditorError> {
        require("Transformation name", name)?;
        require("Source table", source_table)?;
        require("Target table", target_table)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            source_table: source_table.trim().to_string(),
            target_table: target_table.trim().to_string(),
            expression: expression.to_string(),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transformation_requires_names() {
        let err = Transformation::new("", "Order", "Fact", "SUM(total)").unwrap_err();
        assert_eq!(err, EditorError::MissingField("Transformation name"));

        let t = Transformation::new(" daily_totals ", "Order", "Fact", "SUM(total)").unwrap();
        assert_eq!(t.name, "daily_totals");
    }

    #[test]
    fn test_wire_names() {
        let t = Transformation::new("t", "A", "B", "x").unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["sourceTable"], "A");
        assert!(json.get("createdAt").is_some());

        let m = ChatMessage::new(ChatRole::Assistant, "hi");
        assert_eq!(serde_json::to_value(&m).unwrap()["role"], "assistant");
    }
}
