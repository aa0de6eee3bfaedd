//! Source model roster: the single source of truth both views project from.

use crate::model::{Cardinality, Column, Edge, Node};
use crate::view::gather_tables;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Invalid roster JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Table {0} is defined more than once")]
    DuplicateTable(String),
    #[error("Column {column} is defined more than once on table {table}")]
    DuplicateColumn { table: String, column: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceModel {
    #[serde(default)]
    pub tables: Vec<SourceTable>,
    #[serde(default)]
    pub relationships: Vec<SourceRelationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTable {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl SourceTable {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            columns,
        }
    }
}

/// Table-level relationship between two roster tables, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRelationship {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl SourceRelationship {
    pub fn new(source: impl Into<String>, target: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: String::new(),
            cardinality,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Whether this relationship joins `a` and `b` in either direction.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

impl SourceModel {
    /// Parse and validate a roster.
    pub fn from_json(input: &str) -> Result<Self, RosterError> {
        let roster: Self = serde_json::from_str(input)?;
        roster.validate()?;
        Ok(roster)
    }

    /// Table names and, within a table, column names must be unique.
    pub fn validate(&self) -> Result<(), RosterError> {
        let mut tables = HashSet::new();
        for table in &self.tables {
            if !tables.insert(table.name.as_str()) {
                return Err(RosterError::DuplicateTable(table.name.clone()));
            }
            let mut columns = HashSet::new();
            if let Some(col) = table.columns.iter().find(|c| !columns.insert(c.name.as_str())) {
                return Err(RosterError::DuplicateColumn {
                    table: table.name.clone(),
                    column: col.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&SourceTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Fold a graph back into a roster.
    ///
    /// Column details a projection does not carry (nullability, description,
    /// alias) are kept from `previous` when the same `table.column` existed
    /// there. Relationships are read from table-to-table edges; attribute
    /// edges add a relationship between their owning tables, and previous
    /// relationships between surviving tables are kept when the graph holds
    /// no table-level edges at all.
    pub fn from_graph(nodes: &[Node], edges: &[Edge], previous: &SourceModel) -> Self {
        let tables: Vec<SourceTable> = gather_tables(nodes)
            .into_iter()
            .map(|shape| {
                let before = previous.table(&shape.name);
                let columns = shape
                    .columns
                    .into_iter()
                    .map(|mut col| {
                        if let Some(old) = before.and_then(|t| t.columns.iter().find(|c| c.name == col.name)) {
                            if col.description.is_none() {
                                col.description = old.description.clone();
                            }
                            if col.alias.is_none() {
                                col.alias = old.alias.clone();
                            }
                            if !col.is_primary_key() && shape.from_attributes {
                                col.nullable = old.nullable;
                            }
                        }
                        col.is_user_added = false;
                        col
                    })
                    .collect();
                SourceTable {
                    name: shape.name,
                    description: shape.description,
                    columns,
                }
            })
            .collect();

        let names: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id(), n)).collect();

        let mut relationships = Vec::new();
        let mut table_edges = 0;
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for edge in edges {
            let (Some(src), Some(tgt)) = (
                by_id.get(edge.source_node_id.as_str()),
                by_id.get(edge.target_node_id.as_str()),
            ) else {
                continue;
            };
            match (src, tgt) {
                (Node::Table(s), Node::Table(t)) => {
                    table_edges += 1;
                    relationships.push(SourceRelationship {
                        source: s.table_name.clone(),
                        target: t.table_name.clone(),
                        label: edge.label.clone(),
                        cardinality: edge.cardinality,
                    });
                }
                _ => {
                    let pair = (src.table_name().to_string(), tgt.table_name().to_string());
                    if seen.insert(pair.clone()) {
                        relationships.push(SourceRelationship {
                            source: pair.0,
                            target: pair.1,
                            label: edge.label.clone(),
                            cardinality: edge.cardinality,
                        });
                    }
                }
            }
        }

        if table_edges == 0 {
            // Attribute projections do not show table-level relationships,
            // so carry the previous ones over.
            let mut carried: Vec<SourceRelationship> = previous
                .relationships
                .iter()
                .filter(|r| names.contains(r.source.as_str()) && names.contains(r.target.as_str()))
                .cloned()
                .collect();
            relationships.retain(|r| !carried.iter().any(|c| c.joins(&r.source, &r.target)));
            carried.extend(relationships);
            relationships = carried;
        }

        SourceModel {
            tables,
            relationships,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{GraphProjection, ViewLevel};

    fn shop() -> SourceModel {
        SourceModel {
            tables: vec![
                SourceTable::new("Customer", vec![Column::new("id", "BIGINT").primary_key()]),
                SourceTable::new(
                    "Order",
                    vec![
                        Column::new("id", "BIGINT").primary_key(),
                        Column::new("customer_id", "BIGINT").not_null().references("Customer", "id"),
                    ],
                ),
            ],
            relationships: vec![
                SourceRelationship::new("Customer", "Order", Cardinality::OneToMany).with_label("places"),
            ],
        }
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "tables": [{"name": "Customer", "columns": [{"name": "id", "dataType": "BIGINT", "primaryKey": true}]}],
            "relationships": []
        }"#;
        let roster = SourceModel::from_json(json).unwrap();
        assert_eq!(roster.tables.len(), 1);
        assert!(roster.tables[0].columns[0].is_primary_key());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let json = r#"{"tables": [
            {"name": "Customer", "columns": [{"name": "id", "dataType": "BIGINT"}]},
            {"name": "Customer", "columns": [{"name": "code", "dataType": "TEXT"}]}
        ]}"#;
        let err = SourceModel::from_json(json).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateTable(ref name) if name == "Customer"));

        let json = r#"{"tables": [{"name": "Order", "columns": [
            {"name": "id", "dataType": "BIGINT"},
            {"name": "id", "dataType": "TEXT"}
        ]}]}"#;
        let err = SourceModel::from_json(json).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateColumn { ref column, .. } if column == "id"));

        assert!(matches!(SourceModel::from_json("{"), Err(RosterError::Json(_))));
    }

    #[test]
    fn test_fold_table_view_is_identity() {
        let roster = shop();
        let projection = GraphProjection::from_roster(&roster, ViewLevel::Table);
        let folded = SourceModel::from_graph(&projection.nodes, &projection.edges, &roster);
        assert_eq!(folded, roster);
    }

    #[test]
    fn test_fold_attribute_view_keeps_details() {
        let roster = shop();
        let projection = GraphProjection::from_roster(&roster, ViewLevel::Attribute);
        let folded = SourceModel::from_graph(&projection.nodes, &projection.edges, &roster);

        assert_eq!(folded.tables, roster.tables);
        assert_eq!(folded.relationships.len(), 1);
        assert_eq!(folded.relationships[0].label, "places");
    }
}
