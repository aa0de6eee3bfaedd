//! Graph model store.
//!
//! Holds the node and edge collections of the active view and enforces the
//! structural rules: no dangling edges, unique table and attribute names,
//! cascading removal. The roster it was materialized from is kept alongside;
//! view switches re-project from it.

mod arena;

pub use arena::{Arena, Keyed};

use crate::model::{new_id, Cardinality, Column, Edge, KeyConflict, KeyRole, Node, NodeKind, Position, TableNode};
use crate::roster::SourceModel;
use crate::view::{GraphProjection, ViewLevel};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),
    #[error("Node id already in use: {0}")]
    DuplicateNode(String),
    #[error("Edge id already in use: {0}")]
    DuplicateEdge(String),
    #[error("Ids must not be empty")]
    EmptyId,
    #[error("Edge {edge} references missing node {node}")]
    DanglingEdge { edge: String, node: String },
    #[error("Edge {edge} does not touch node {node}")]
    UnrelatedEdge { edge: String, node: String },
    #[error("Table name already in use: {0}")]
    DuplicateTableName(String),
    #[error("Attribute {table}.{attribute} already exists")]
    DuplicateAttribute { table: String, attribute: String },
    #[error("Column {column} already exists on table {table}")]
    DuplicateColumn { table: String, column: String },
    #[error("Column {column} not found on table {table}")]
    ColumnNotFound { table: String, column: String },
    #[error("Node {id} is a {actual} node, expected {expected}")]
    VariantMismatch {
        id: String,
        expected: NodeKind,
        actual: NodeKind,
    },
    #[error("{table}.{column} is a key column; delete the owning table instead")]
    ProtectedKey { table: String, column: String },
    #[error(transparent)]
    KeyConflict(#[from] KeyConflict),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TablePatch {
    pub table_name: Option<String>,
    pub description: Option<String>,
    pub columns: Option<Vec<Column>>,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributePatch {
    pub attribute_name: Option<String>,
    pub table_name: Option<String>,
    pub data_type: Option<String>,
    pub key: Option<KeyRole>,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodePatch {
    Table(TablePatch),
    Attribute(AttributePatch),
}

impl NodePatch {
    fn kind(&self) -> NodeKind {
        match self {
            Self::Table(_) => NodeKind::Table,
            Self::Attribute(_) => NodeKind::Attribute,
        }
    }
}

/// Everything a removal took out of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Removal {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// `(table, column)` pairs stripped from surviving tables.
    pub columns: Vec<(String, Column)>,
    /// `(table, column)` foreign keys cleared because their target went away.
    pub unlinked: Vec<(String, String)>,
}

impl Removal {
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id()).collect()
    }

    pub fn edge_ids(&self) -> Vec<&str> {
        self.edges.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.columns.is_empty() && self.unlinked.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GraphStore {
    roster: SourceModel,
    view: ViewLevel,
    nodes: Arena<Node>,
    edges: Arena<Edge>,
}

impl GraphStore {
    pub fn materialize(roster: SourceModel, view: ViewLevel) -> Self {
        let projection = GraphProjection::from_roster(&roster, view);
        tracing::debug!(
            view = view.as_str(),
            nodes = projection.nodes.len(),
            edges = projection.edges.len(),
            "materialized graph"
        );
        Self {
            roster,
            view,
            nodes: Arena::from_items(projection.nodes),
            edges: Arena::from_items(projection.edges),
        }
    }

    pub fn view(&self) -> ViewLevel {
        self.view
    }

    pub fn roster(&self) -> &SourceModel {
        &self.roster
    }

    pub fn nodes(&self) -> &[Node] {
        self.nodes.as_slice()
    }

    pub fn edges(&self) -> &[Edge] {
        self.edges.as_slice()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableNode> {
        self.nodes.iter().filter_map(Node::as_table)
    }

    pub fn table_by_name(&self, name: &str) -> Option<&TableNode> {
        self.tables().find(|t| t.table_name == name)
    }

    pub fn incident_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node_id))
    }

    /// Re-project from the roster. Edits not folded into the roster are lost.
    pub fn switch_view(&mut self, view: ViewLevel) {
        let projection = GraphProjection::from_roster(&self.roster, view);
        self.view = view;
        self.nodes = Arena::from_items(projection.nodes);
        self.edges = Arena::from_items(projection.edges);
        tracing::debug!(view = view.as_str(), nodes = self.nodes.len(), "switched view");
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), StoreError> {
        if node.id().is_empty() {
            return Err(StoreError::EmptyId);
        }
        if self.nodes.contains(node.id()) {
            return Err(StoreError::DuplicateNode(node.id().to_string()));
        }
        match &node {
            Node::Table(t) => {
                self.ensure_table_name_free(&t.table_name, None)?;
                ensure_unique_columns(&t.table_name, &t.columns)?;
            }
            Node::Attribute(a) => self.ensure_attribute_free(&a.table_name, &a.attribute_name, None)?,
        }
        tracing::debug!(id = node.id(), kind = %node.kind(), "add node");
        self.nodes
            .insert(node)
            .map_err(|n| StoreError::DuplicateNode(n.id().to_string()))
    }

    /// Apply a patch. Renames are propagated to every reference by name.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<&Node, StoreError> {
        let current = self.nodes.get(id).ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;

        match (current, patch) {
            (Node::Table(t), NodePatch::Table(p)) => {
                let old_name = t.table_name.clone();
                let name = p.table_name.clone().unwrap_or_else(|| old_name.clone());
                if name != old_name {
                    self.ensure_table_name_free(&name, Some(id))?;
                }
                if let Some(columns) = &p.columns {
                    ensure_unique_columns(&name, columns)?;
                }

                if let Some(Node::Table(t)) = self.nodes.get_mut(id) {
                    t.table_name = name.clone();
                    if let Some(description) = p.description {
                        t.description = description;
                    }
                    if let Some(columns) = p.columns {
                        t.columns = columns;
                    }
                    if let Some(position) = p.position {
                        t.position = position;
                    }
                }
                if name != old_name {
                    self.rename_table_references(&old_name, &name);
                }
            }
            (Node::Attribute(a), NodePatch::Attribute(p)) => {
                let (old_table, old_name) = (a.table_name.clone(), a.attribute_name.clone());
                let table = p.table_name.clone().unwrap_or_else(|| old_table.clone());
                let name = p.attribute_name.clone().unwrap_or_else(|| old_name.clone());
                if table != old_table || name != old_name {
                    self.ensure_attribute_free(&table, &name, Some(id))?;
                }

                if let Some(Node::Attribute(a)) = self.nodes.get_mut(id) {
                    a.table_name = table.clone();
                    a.attribute_name = name.clone();
                    if let Some(data_type) = p.data_type {
                        a.data_type = data_type;
                    }
                    if let Some(key) = p.key {
                        a.key = key;
                    }
                    if let Some(position) = p.position {
                        a.position = position;
                    }
                }
                if table == old_table && name != old_name {
                    self.rename_column_references(&table, &old_name, &name);
                }
            }
            (current, patch) => {
                return Err(StoreError::VariantMismatch {
                    id: id.to_string(),
                    expected: patch.kind(),
                    actual: current.kind(),
                });
            }
        }

        tracing::debug!(id, "update node");
        self.nodes.get(id).ok_or_else(|| StoreError::NodeNotFound(id.to_string()))
    }

    /// Remove a node and everything hanging off it: incident edges, and in
    /// the attribute view, the attributes of a removed table.
    pub fn remove_node(&mut self, id: &str) -> Result<Removal, StoreError> {
        let node = self.nodes.remove(id).ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;

        let mut removal = Removal::default();
        if let (Node::Table(t), ViewLevel::Attribute) = (&node, self.view) {
            let name = t.table_name.clone();
            removal.nodes = self
                .nodes
                .retain(|n| !matches!(n, Node::Attribute(a) if a.table_name == name));
        }

        let mut gone: HashSet<String> = removal.nodes.iter().map(|n| n.id().to_string()).collect();
        gone.insert(id.to_string());
        removal.edges = self
            .edges
            .retain(|e| !gone.contains(&e.source_node_id) && !gone.contains(&e.target_node_id));
        removal.unlinked = match &node {
            Node::Table(t) => self.unlink_references(&t.table_name, None),
            Node::Attribute(a) => self.unlink_references(&a.table_name, Some(&a.attribute_name)),
        };
        removal.nodes.insert(0, node);

        tracing::debug!(
            id,
            cascaded_nodes = removal.nodes.len() - 1,
            cascaded_edges = removal.edges.len(),
            unlinked = removal.unlinked.len(),
            "remove node"
        );
        Ok(removal)
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<(), StoreError> {
        if edge.id.is_empty() {
            return Err(StoreError::EmptyId);
        }
        if self.edges.contains(&edge.id) {
            return Err(StoreError::DuplicateEdge(edge.id));
        }
        self.ensure_endpoints(&edge)?;
        tracing::debug!(id = %edge.id, source = %edge.source_node_id, target = %edge.target_node_id, "add edge");
        self.edges.insert(edge).map_err(|e| StoreError::DuplicateEdge(e.id))
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge, StoreError> {
        let edge = self.edges.remove(id).ok_or_else(|| StoreError::EdgeNotFound(id.to_string()))?;
        tracing::debug!(id, "remove edge");
        Ok(edge)
    }

    /// Create a default `one-to-many` user edge between two nodes.
    pub fn connect(&mut self, source_id: &str, target_id: &str) -> Result<&Edge, StoreError> {
        let mut edge = Edge::new(new_id("edge"), source_id, target_id, Cardinality::OneToMany);
        edge.is_user_added = true;
        let id = edge.id.clone();
        self.add_edge(edge)?;
        self.edges.get(&id).ok_or(StoreError::EdgeNotFound(id))
    }

    /// Swap the edges incident to `node_id` for `edges`. Every new edge must
    /// touch the node. Nothing changes unless all of them are valid.
    pub fn replace_incident_edges(&mut self, node_id: &str, edges: Vec<Edge>) -> Result<Removal, StoreError> {
        if !self.nodes.contains(node_id) {
            return Err(StoreError::NodeNotFound(node_id.to_string()));
        }
        let mut ids = HashSet::new();
        for edge in &edges {
            if edge.id.is_empty() {
                return Err(StoreError::EmptyId);
            }
            if !edge.touches(node_id) {
                return Err(StoreError::UnrelatedEdge {
                    edge: edge.id.clone(),
                    node: node_id.to_string(),
                });
            }
            let taken = self.edges.get(&edge.id).is_some_and(|e| !e.touches(node_id));
            if taken || !ids.insert(edge.id.as_str()) {
                return Err(StoreError::DuplicateEdge(edge.id.clone()));
            }
            self.ensure_endpoints(edge)?;
        }

        let removed = self.edges.retain(|e| !e.touches(node_id));
        for edge in edges {
            self.edges.insert(edge).map_err(|e| StoreError::DuplicateEdge(e.id))?;
        }
        Ok(Removal {
            edges: removed,
            ..Removal::default()
        })
    }

    pub fn add_column(&mut self, table_id: &str, column: Column) -> Result<(), StoreError> {
        let table = self.table_mut(table_id)?;
        if table.column(&column.name).is_some() {
            return Err(StoreError::DuplicateColumn {
                table: table.table_name.clone(),
                column: column.name,
            });
        }
        tracing::debug!(table = %table.table_name, column = %column.name, "add column");
        table.columns.push(column);
        Ok(())
    }

    /// Remove a non-key column. Key columns go only with their table.
    pub fn remove_column(&mut self, table_id: &str, name: &str) -> Result<Column, StoreError> {
        let table = self.table_mut(table_id)?;
        let pos = table
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| StoreError::ColumnNotFound {
                table: table.table_name.clone(),
                column: name.to_string(),
            })?;
        if table.columns[pos].key.is_key() {
            return Err(StoreError::ProtectedKey {
                table: table.table_name.clone(),
                column: name.to_string(),
            });
        }
        Ok(table.columns.remove(pos))
    }

    /// Drop every user-added node, edge and column.
    pub fn discard_user_added(&mut self) -> Removal {
        let mut removal = Removal::default();

        let added: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.is_user_added())
            .map(|n| n.id().to_string())
            .collect();
        for id in added {
            // Already gone if an earlier cascade took it.
            if let Ok(r) = self.remove_node(&id) {
                removal.nodes.extend(r.nodes);
                removal.edges.extend(r.edges);
                removal.unlinked.extend(r.unlinked);
            }
        }
        removal.edges.extend(self.edges.retain(|e| !e.is_user_added));

        for node in self.nodes.iter_mut() {
            if let Node::Table(t) = node {
                let (kept, dropped): (Vec<Column>, Vec<Column>) =
                    t.columns.drain(..).partition(|c| !c.is_user_added);
                t.columns = kept;
                removal
                    .columns
                    .extend(dropped.into_iter().map(|c| (t.table_name.clone(), c)));
            }
        }

        removal
    }

    /// Make the current graph the baseline: clear every user-added flag and
    /// fold the graph back into the roster.
    pub fn promote_baseline(&mut self) {
        for node in self.nodes.iter_mut() {
            node.set_user_added(false);
            if let Node::Table(t) = node {
                for col in &mut t.columns {
                    col.is_user_added = false;
                }
            }
        }
        for edge in self.edges.iter_mut() {
            edge.is_user_added = false;
        }
        self.roster = SourceModel::from_graph(self.nodes.as_slice(), self.edges.as_slice(), &self.roster);
    }

    /// Verify that no edge dangles.
    pub fn check_integrity(&self) -> Result<(), StoreError> {
        self.edges.iter().try_for_each(|e| self.ensure_endpoints(e))
    }

    fn table_mut(&mut self, table_id: &str) -> Result<&mut TableNode, StoreError> {
        match self.nodes.get_mut(table_id) {
            Some(Node::Table(t)) => Ok(t),
            Some(other) => Err(StoreError::VariantMismatch {
                id: table_id.to_string(),
                expected: NodeKind::Table,
                actual: other.kind(),
            }),
            None => Err(StoreError::NodeNotFound(table_id.to_string())),
        }
    }

    fn ensure_endpoints(&self, edge: &Edge) -> Result<(), StoreError> {
        for end in [&edge.source_node_id, &edge.target_node_id] {
            if !self.nodes.contains(end) {
                return Err(StoreError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: end.clone(),
                });
            }
        }
        Ok(())
    }

    fn ensure_table_name_free(&self, name: &str, except: Option<&str>) -> Result<(), StoreError> {
        let taken = self
            .tables()
            .any(|t| t.table_name == name && Some(t.id.as_str()) != except);
        if taken {
            Err(StoreError::DuplicateTableName(name.to_string()))
        } else {
            Ok(())
        }
    }

    fn ensure_attribute_free(&self, table: &str, name: &str, except: Option<&str>) -> Result<(), StoreError> {
        let taken = self.nodes.iter().filter_map(Node::as_attribute).any(|a| {
            a.table_name == table && a.attribute_name == name && Some(a.id.as_str()) != except
        });
        if taken {
            Err(StoreError::DuplicateAttribute {
                table: table.to_string(),
                attribute: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Clear foreign keys pointing at `table` (or at `table.column` only).
    fn unlink_references(&mut self, table: &str, column: Option<&str>) -> Vec<(String, String)> {
        let hits = |key: &KeyRole| {
            key.reference()
                .is_some_and(|(t, c)| t == table && column.is_none_or(|col| col == c))
        };
        let mut unlinked = Vec::new();
        for node in self.nodes.iter_mut() {
            match node {
                Node::Table(t) => {
                    for col in t.columns.iter_mut().filter(|c| hits(&c.key)) {
                        col.key.clear_foreign();
                        unlinked.push((t.table_name.clone(), col.name.clone()));
                    }
                }
                Node::Attribute(a) if hits(&a.key) => {
                    a.key.clear_foreign();
                    unlinked.push((a.table_name.clone(), a.attribute_name.clone()));
                }
                Node::Attribute(_) => {}
            }
        }
        unlinked
    }

    fn rename_table_references(&mut self, from: &str, to: &str) {
        for node in self.nodes.iter_mut() {
            match node {
                Node::Table(t) => {
                    for col in &mut t.columns {
                        col.key.rename_table(from, to);
                    }
                }
                Node::Attribute(a) => {
                    if a.table_name == from {
                        a.table_name = to.to_string();
                    }
                    a.key.rename_table(from, to);
                }
            }
        }
    }

    fn rename_column_references(&mut self, table: &str, from: &str, to: &str) {
        for node in self.nodes.iter_mut() {
            match node {
                Node::Table(t) => {
                    for col in &mut t.columns {
                        col.key.rename_column(table, from, to);
                    }
                }
                Node::Attribute(a) => {
                    a.key.rename_column(table, from, to);
                }
            }
        }
    }
}

fn ensure_unique_columns(table: &str, columns: &[Column]) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for col in columns {
        if !seen.insert(col.name.as_str()) {
            return Err(StoreError::DuplicateColumn {
                table: table.to_string(),
                column: col.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeNode, Column, TableNode};
    use crate::roster::{SourceRelationship, SourceTable};

    fn shop() -> SourceModel {
        SourceModel {
            tables: vec![
                SourceTable::new("Customer", vec![Column::new("id", "BIGINT").primary_key()]),
                SourceTable::new(
                    "Order",
                    vec![
                        Column::new("id", "BIGINT").primary_key(),
                        Column::new("customer_id", "BIGINT").references("Customer", "id"),
                        Column::new("note", "TEXT"),
                    ],
                ),
            ],
            relationships: vec![SourceRelationship::new("Customer", "Order", Cardinality::OneToMany)],
        }
    }

    #[test]
    fn test_add_edge_rejects_dangling() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let edge = Edge::new("e", "tbl:Customer", "tbl:Nope", Cardinality::OneToOne);
        let err = store.add_edge(edge).unwrap_err();
        assert!(matches!(err, StoreError::DanglingEdge { .. }));
        assert_eq!(store.edges().len(), 1);
    }

    #[test]
    fn test_remove_table_cascades_edges() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let removal = store.remove_node("tbl:Customer").unwrap();
        assert_eq!(removal.nodes.len(), 1);
        assert_eq!(removal.edges.len(), 1);
        assert!(store.edges().is_empty());
        store.check_integrity().unwrap();

        // keys pointing at the removed table go with it
        assert_eq!(removal.unlinked, vec![("Order".to_string(), "customer_id".to_string())]);
        let order = store.table_by_name("Order").unwrap();
        assert_eq!(order.column("customer_id").unwrap().key, KeyRole::None);
    }

    #[test]
    fn test_remove_referenced_table_in_attribute_view_unlinks_keys() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Attribute);
        let removal = store.remove_node("tbl:Customer").unwrap();
        assert_eq!(removal.unlinked, vec![("Order".to_string(), "customer_id".to_string())]);
        let attr = store.node("attr:Order.customer_id").and_then(Node::as_attribute).unwrap();
        assert!(!attr.is_foreign_key());
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_remove_table_in_attribute_view_cascades_attributes() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Attribute);
        store.remove_node("tbl:Order").unwrap();

        assert!(!store
            .nodes()
            .iter()
            .filter_map(Node::as_attribute)
            .any(|a| a.table_name == "Order"));
        // Customer.id stays, and the fk edge from Order.customer_id is gone.
        assert!(store.node("attr:Customer.id").is_some());
        assert!(store.edges().is_empty());
        store.check_integrity().unwrap();
    }

    #[test]
    fn test_remove_table_in_table_view_leaves_attributes() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let attr = AttributeNode::new("a1", "Order", "extra", "INT");
        store.add_node(Node::Attribute(attr)).unwrap();
        store.remove_node("tbl:Order").unwrap();
        assert!(store.node("a1").is_some());
    }

    #[test]
    fn test_connect_defaults() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let edge = store.connect("tbl:Order", "tbl:Customer").unwrap().clone();
        assert_eq!(edge.cardinality, Cardinality::OneToMany);
        assert!(edge.is_user_added);
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn test_duplicate_table_name() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let err = store
            .add_node(Node::Table(TableNode::new("t-new", "Customer")))
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateTableName("Customer".into()));
    }

    #[test]
    fn test_rename_table_updates_references() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let patch = NodePatch::Table(TablePatch {
            table_name: Some("Client".into()),
            ..TablePatch::default()
        });
        store.update_node("tbl:Customer", patch).unwrap();

        let order = store.table_by_name("Order").unwrap();
        assert_eq!(
            order.column("customer_id").unwrap().key.reference(),
            Some(("Client", "id"))
        );
    }

    #[test]
    fn test_update_variant_mismatch() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let err = store
            .update_node("tbl:Order", NodePatch::Attribute(AttributePatch::default()))
            .unwrap_err();
        assert!(matches!(err, StoreError::VariantMismatch { .. }));
    }

    #[test]
    fn test_remove_column_protects_keys() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let err = store.remove_column("tbl:Order", "customer_id").unwrap_err();
        assert!(matches!(err, StoreError::ProtectedKey { .. }));
        assert!(store.table_by_name("Order").unwrap().column("customer_id").is_some());

        store.remove_column("tbl:Order", "note").unwrap();
        assert!(store.table_by_name("Order").unwrap().column("note").is_none());
    }

    #[test]
    fn test_replace_incident_edges_is_all_or_nothing() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let good = Edge::new("e1", "tbl:Order", "tbl:Customer", Cardinality::ManyToOne);
        let bad = Edge::new("e2", "tbl:Order", "tbl:Ghost", Cardinality::ManyToOne);
        assert!(store.replace_incident_edges("tbl:Order", vec![good.clone(), bad]).is_err());
        assert_eq!(store.edges()[0].id, "rel:0");

        let removal = store.replace_incident_edges("tbl:Order", vec![good]).unwrap();
        assert_eq!(removal.edges.len(), 1);
        assert_eq!(store.edges().len(), 1);
        assert_eq!(store.edges()[0].id, "e1");
    }

    #[test]
    fn test_discard_user_added() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let mut payment = TableNode::new("t-pay", "Payment");
        payment.is_user_added = true;
        store.add_node(Node::Table(payment)).unwrap();
        store.connect("tbl:Order", "t-pay").unwrap();
        let mut extra = Column::new("coupon", "TEXT");
        extra.is_user_added = true;
        store.add_column("tbl:Order", extra).unwrap();

        let removal = store.discard_user_added();
        assert_eq!(removal.nodes.len(), 1);
        assert_eq!(removal.edges.len(), 1);
        assert_eq!(removal.columns.len(), 1);
        assert_eq!(store.nodes().len(), 2);
        assert_eq!(store.edges().len(), 1);
    }

    #[test]
    fn test_promote_then_switch_view_keeps_additions() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        let mut payment = TableNode::new("t-pay", "Payment")
            .with_columns(vec![Column::new("payment_id", "BIGINT").primary_key()]);
        payment.is_user_added = true;
        store.add_node(Node::Table(payment)).unwrap();

        store.promote_baseline();
        assert!(store.nodes().iter().all(|n| !n.is_user_added()));

        store.switch_view(ViewLevel::Attribute);
        assert!(store.node("attr:Payment.payment_id").is_some());
    }

    #[test]
    fn test_switch_view_discards_unpromoted_edits() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Table);
        store.add_node(Node::Table(TableNode::new("t-x", "Scratch"))).unwrap();
        store.switch_view(ViewLevel::Attribute);
        store.switch_view(ViewLevel::Table);
        assert!(store.table_by_name("Scratch").is_none());
    }

    #[test]
    fn test_no_dangling_edges_after_mixed_operations() {
        let mut store = GraphStore::materialize(shop(), ViewLevel::Attribute);
        store
            .add_node(Node::Attribute(AttributeNode::new("a-1", "Customer", "email", "TEXT")))
            .unwrap();
        store.connect("a-1", "attr:Order.note").unwrap();
        store.connect("attr:Order.id", "tbl:Customer").unwrap();
        store.remove_node("attr:Order.note").unwrap();
        store.check_integrity().unwrap();
        store.remove_node("tbl:Customer").unwrap();
        store.check_integrity().unwrap();
        assert!(store.node("a-1").is_none());
        store.discard_user_added();
        store.check_integrity().unwrap();
    }
}
