use crate::model::{
    attribute_node_id, table_node_id, AttributeNode, Cardinality, Column, Edge, Node, Position, TableNode, REFERENCES,
};
use crate::roster::SourceModel;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const COLUMN_GAP: f64 = 280.0;
const ROW_GAP: f64 = 220.0;
const ATTRIBUTE_ROW: f64 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewLevel {
    #[default]
    Table,
    Attribute,
}

impl ViewLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "table" | "tables" => Some(Self::Table),
            "attribute" | "attributes" => Some(Self::Attribute),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Attribute => "attribute",
        }
    }
}

/// Nodes and edges materialized from a roster for one view.
#[derive(Debug, Clone, Default)]
pub struct GraphProjection {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphProjection {
    pub fn from_roster(roster: &SourceModel, view: ViewLevel) -> Self {
        let positions = arrange(roster);
        let table_names: HashSet<&str> = roster.tables.iter().map(|t| t.name.as_str()).collect();

        match view {
            ViewLevel::Table => {
                let nodes = roster
                    .tables
                    .iter()
                    .map(|t| {
                        Node::Table(TableNode {
                            id: table_node_id(&t.name),
                            position: positions.get(t.name.as_str()).copied().unwrap_or_default(),
                            table_name: t.name.clone(),
                            description: t.description.clone(),
                            columns: t.columns.clone(),
                            is_user_added: false,
                        })
                    })
                    .collect();

                let edges = roster
                    .relationships
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| {
                        table_names.contains(r.source.as_str()) && table_names.contains(r.target.as_str())
                    })
                    .map(|(i, r)| Edge {
                        id: format!("rel:{}", i),
                        source_node_id: table_node_id(&r.source),
                        target_node_id: table_node_id(&r.target),
                        label: r.label.clone(),
                        cardinality: r.cardinality,
                        is_user_added: false,
                    })
                    .collect();

                GraphProjection { nodes, edges }
            }
            ViewLevel::Attribute => {
                let mut nodes = Vec::new();
                let mut edges = Vec::new();

                for table in &roster.tables {
                    let origin = positions.get(table.name.as_str()).copied().unwrap_or_default();
                    // Group header; columns live on the attribute nodes.
                    nodes.push(Node::Table(TableNode {
                        id: table_node_id(&table.name),
                        position: origin,
                        table_name: table.name.clone(),
                        description: table.description.clone(),
                        columns: Vec::new(),
                        is_user_added: false,
                    }));
                    for (i, col) in table.columns.iter().enumerate() {
                        nodes.push(Node::Attribute(AttributeNode {
                            id: attribute_node_id(&table.name, &col.name),
                            position: Position::new(origin.x, origin.y + ATTRIBUTE_ROW * (i as f64 + 1.0)),
                            attribute_name: col.name.clone(),
                            table_name: table.name.clone(),
                            data_type: col.type_with_length(),
                            key: col.key.clone(),
                            is_user_added: false,
                        }));
                    }
                }

                for table in &roster.tables {
                    for col in &table.columns {
                        let Some((target_table, target_column)) = col.key.reference() else {
                            continue;
                        };
                        let Some(target) = roster.table(target_table) else {
                            continue;
                        };
                        let target_id = if target.columns.iter().any(|c| c.name == target_column) {
                            attribute_node_id(target_table, target_column)
                        } else {
                            table_node_id(target_table)
                        };
                        edges.push(Edge {
                            id: format!("fk:{}.{}", table.name, col.name),
                            source_node_id: attribute_node_id(&table.name, &col.name),
                            target_node_id: target_id,
                            label: REFERENCES.to_string(),
                            cardinality: Cardinality::ManyToOne,
                            is_user_added: false,
                        });
                    }
                }

                GraphProjection { nodes, edges }
            }
        }
    }
}

/// Grid positions by relationship dependency.
/// Referenced tables go to upper rows, alphabetical within a row.
fn arrange(roster: &SourceModel) -> HashMap<&str, Position> {
    let names: HashSet<&str> = roster.tables.iter().map(|t| t.name.as_str()).collect();

    // table -> tables it depends on (the ones it references)
    let mut parents: HashMap<&str, HashSet<&str>> = names.iter().map(|n| (*n, HashSet::new())).collect();
    for rel in &roster.relationships {
        if !names.contains(rel.source.as_str()) || !names.contains(rel.target.as_str()) {
            continue;
        }
        let (parent, child) = if rel.cardinality.fk_on_source() {
            (rel.target.as_str(), rel.source.as_str())
        } else {
            (rel.source.as_str(), rel.target.as_str())
        };
        if parent != child {
            if let Some(deps) = parents.get_mut(child) {
                deps.insert(parent);
            }
        }
    }
    for table in &roster.tables {
        for col in &table.columns {
            if let Some((target, _)) = col.key.reference() {
                if target != table.name && names.contains(target) {
                    if let Some(deps) = parents.get_mut(table.name.as_str()) {
                        deps.insert(target);
                    }
                }
            }
        }
    }

    let mut levels: HashMap<&str, usize> = HashMap::new();
    for (table, deps) in &parents {
        if deps.is_empty() {
            levels.insert(*table, 0);
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for (table, deps) in &parents {
            if levels.contains_key(table) {
                continue;
            }
            let parent_levels: Vec<usize> = deps.iter().filter_map(|p| levels.get(p).copied()).collect();
            if parent_levels.len() == deps.len() {
                let level = parent_levels.iter().max().copied().unwrap_or(0) + 1;
                levels.insert(*table, level);
                changed = true;
            }
        }
    }

    // Cycles: everything left goes one row below the deepest level.
    let max_level = levels.values().copied().max().unwrap_or(0);
    for name in &names {
        levels.entry(*name).or_insert(max_level + 1);
    }

    let mut rows: Vec<Vec<&str>> = Vec::new();
    for (table, level) in &levels {
        if rows.len() <= *level {
            rows.resize(*level + 1, Vec::new());
        }
        rows[*level].push(*table);
    }

    let mut positions = HashMap::new();
    for (y, row) in rows.iter_mut().filter(|r| !r.is_empty()).enumerate() {
        row.sort();
        for (x, table) in row.iter().enumerate() {
            positions.insert(*table, Position::new(x as f64 * COLUMN_GAP, y as f64 * ROW_GAP));
        }
    }
    positions
}

/// A table as seen across both views: a table node's own columns followed by
/// the attribute nodes naming it.
#[derive(Debug, Clone)]
pub struct TableShape {
    pub name: String,
    pub description: String,
    pub columns: Vec<Column>,
    /// Id of the table node, if there is one.
    pub node_id: Option<String>,
    /// Whether any column came from an attribute node.
    pub from_attributes: bool,
}

/// Collect tables from a node list in node order. Attribute nodes whose table
/// has no node produce a table at the position of their first attribute.
pub fn gather_tables(nodes: &[Node]) -> Vec<TableShape> {
    let mut shapes: Vec<TableShape> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for node in nodes {
        if let Node::Table(t) = node {
            if index.contains_key(&t.table_name) {
                continue;
            }
            index.insert(t.table_name.clone(), shapes.len());
            shapes.push(TableShape {
                name: t.table_name.clone(),
                description: t.description.clone(),
                columns: t.columns.clone(),
                node_id: Some(t.id.clone()),
                from_attributes: false,
            });
        }
    }

    for node in nodes {
        let Node::Attribute(a) = node else {
            continue;
        };
        let slot = match index.get(&a.table_name) {
            Some(i) => *i,
            None => {
                index.insert(a.table_name.clone(), shapes.len());
                shapes.push(TableShape {
                    name: a.table_name.clone(),
                    description: String::new(),
                    columns: Vec::new(),
                    node_id: None,
                    from_attributes: true,
                });
                shapes.len() - 1
            }
        };
        let shape = &mut shapes[slot];
        if shape.columns.iter().any(|c| c.name == a.attribute_name) {
            continue;
        }
        shape.columns.push(a.to_column());
        shape.from_attributes = true;
    }

    shapes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{SourceRelationship, SourceTable};

    fn shop() -> SourceModel {
        SourceModel {
            tables: vec![
                SourceTable::new(
                    "Customer",
                    vec![
                        Column::new("id", "BIGINT").primary_key(),
                        Column::new("email", "VARCHAR").with_length(255),
                    ],
                ),
                SourceTable::new(
                    "Order",
                    vec![
                        Column::new("id", "BIGINT").primary_key(),
                        Column::new("customer_id", "BIGINT").references("Customer", "id"),
                    ],
                ),
            ],
            relationships: vec![SourceRelationship::new("Customer", "Order", Cardinality::OneToMany)],
        }
    }

    #[test]
    fn test_table_view() {
        let p = GraphProjection::from_roster(&shop(), ViewLevel::Table);
        assert_eq!(p.nodes.len(), 2);
        assert_eq!(p.edges.len(), 1);
        assert_eq!(p.edges[0].source_node_id, "tbl:Customer");
        assert_eq!(p.nodes[0].as_table().unwrap().columns.len(), 2);
    }

    #[test]
    fn test_attribute_view() {
        let p = GraphProjection::from_roster(&shop(), ViewLevel::Attribute);
        // 2 group headers + 4 attributes
        assert_eq!(p.nodes.len(), 6);
        assert_eq!(p.edges.len(), 1);
        assert_eq!(p.edges[0].source_node_id, "attr:Order.customer_id");
        assert_eq!(p.edges[0].target_node_id, "attr:Customer.id");

        let email = p.nodes.iter().find(|n| n.id() == "attr:Customer.email").unwrap();
        assert_eq!(email.as_attribute().unwrap().data_type, "VARCHAR(255)");
    }

    #[test]
    fn test_relationship_to_unknown_table_is_dropped() {
        let mut roster = shop();
        roster
            .relationships
            .push(SourceRelationship::new("Order", "Invoice", Cardinality::OneToOne));
        let p = GraphProjection::from_roster(&roster, ViewLevel::Table);
        assert_eq!(p.edges.len(), 1);
    }

    #[test]
    fn test_arrangement_levels() {
        let p = GraphProjection::from_roster(&shop(), ViewLevel::Table);
        let customer = p.nodes.iter().find(|n| n.label() == "Customer").unwrap();
        let order = p.nodes.iter().find(|n| n.label() == "Order").unwrap();
        assert!(customer.position().y < order.position().y);
    }

    #[test]
    fn test_gather_attribute_tables() {
        let p = GraphProjection::from_roster(&shop(), ViewLevel::Attribute);
        let shapes = gather_tables(&p.nodes);
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].name, "Customer");
        assert_eq!(shapes[0].columns.len(), 2);
        assert_eq!(shapes[0].columns[1].length, Some(255));
        assert!(shapes[1].columns[1].is_foreign_key());
    }
}
