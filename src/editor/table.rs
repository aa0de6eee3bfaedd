use super::suggest::{RelationshipStrategy, Suggestion, TableRef};
use super::{require, EditorError, SaveWarning};
use crate::model::{new_id, Cardinality, Column, Edge, Node, Position, TableNode};
use crate::store::{GraphStore, TablePatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// This table is the edge source.
    Outgoing,
    /// This table is the edge target.
    Incoming,
}

/// A relationship as edited: the peer table by node id, never by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDraft {
    pub peer_id: String,
    pub direction: Direction,
    pub cardinality: Cardinality,
    pub label: String,
    /// Id of the stored edge this draft came from.
    pub edge_id: Option<String>,
    pub is_user_added: bool,
}

impl RelationshipDraft {
    pub fn new(peer_id: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            peer_id: peer_id.into(),
            direction: Direction::Outgoing,
            cardinality,
            label: String::new(),
            edge_id: None,
            is_user_added: true,
        }
    }

    fn to_edge(&self, node_id: &str) -> Edge {
        let (source, target) = match self.direction {
            Direction::Outgoing => (node_id, self.peer_id.as_str()),
            Direction::Incoming => (self.peer_id.as_str(), node_id),
        };
        let id = self.edge_id.clone().unwrap_or_else(|| new_id("edge"));
        let mut edge = Edge::new(id, source, target, self.cardinality).with_label(self.label.clone());
        edge.is_user_added = self.is_user_added;
        edge
    }
}

#[derive(Debug, Clone)]
pub struct TableEditor {
    node_id: String,
    original: Option<TableNode>,
    pub table_name: String,
    pub description: String,
    pub position: Position,
    columns: Vec<Column>,
    relationships: Vec<RelationshipDraft>,
    suggestions: Vec<Suggestion>,
}

impl TableEditor {
    /// Draft for a new table.
    pub fn create() -> Self {
        Self {
            node_id: new_id("table"),
            original: None,
            table_name: String::new(),
            description: String::new(),
            position: Position::default(),
            columns: Vec::new(),
            relationships: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Draft over a stored table, with its table-to-table edges as drafts.
    pub fn open(store: &GraphStore, id: &str) -> Option<Self> {
        let table = store.node(id)?.as_table()?;
        let relationships = store
            .incident_edges(id)
            .filter_map(|e| {
                let peer = e.other_end(id)?;
                store.node(peer)?.as_table()?;
                Some(RelationshipDraft {
                    peer_id: peer.to_string(),
                    direction: if e.source_node_id == id { Direction::Outgoing } else { Direction::Incoming },
                    cardinality: e.cardinality,
                    label: e.label.clone(),
                    edge_id: Some(e.id.clone()),
                    is_user_added: e.is_user_added,
                })
            })
            .collect();

        Some(Self {
            node_id: table.id.clone(),
            original: Some(table.clone()),
            table_name: table.table_name.clone(),
            description: table.description.clone(),
            position: table.position,
            columns: table.columns.clone(),
            relationships,
            suggestions: Vec::new(),
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn relationships(&self) -> &[RelationshipDraft] {
        &self.relationships
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn add_column(&mut self, mut column: Column) -> Result<(), EditorError> {
        require("Column name", &column.name)?;
        require("Data type", &column.data_type)?;
        if self.columns.iter().any(|c| c.name == column.name) {
            return Err(EditorError::DuplicateColumn(column.name));
        }
        column.is_user_added = true;
        self.columns.push(column);
        Ok(())
    }

    /// Remove a non-key column from the draft.
    pub fn remove_column(&mut self, name: &str) -> Result<Column, EditorError> {
        let pos = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| EditorError::ColumnNotFound(name.to_string()))?;
        if self.columns[pos].key.is_key() {
            return Err(EditorError::ProtectedColumn {
                table: self.table_name.clone(),
                column: name.to_string(),
            });
        }
        Ok(self.columns.remove(pos))
    }

    pub fn set_column_type(&mut self, name: &str, data_type: &str, length: Option<u32>) -> Result<(), EditorError> {
        require("Data type", data_type)?;
        let col = self.column_mut(name)?;
        col.data_type = data_type.trim().to_string();
        col.length = length;
        Ok(())
    }

    pub fn set_column_nullable(&mut self, name: &str, nullable: bool) -> Result<(), EditorError> {
        let col = self.column_mut(name)?;
        col.nullable = nullable && !col.is_primary_key();
        Ok(())
    }

    pub fn set_column_primary_key(&mut self, name: &str, on: bool) -> Result<(), EditorError> {
        let col = self.column_mut(name)?;
        col.key.set_primary(name, on)?;
        if on {
            col.nullable = false;
        }
        Ok(())
    }

    pub fn set_column_foreign_key(&mut self, name: &str, table: &str, column: &str) -> Result<(), EditorError> {
        let col = self.column_mut(name)?;
        col.key.set_foreign(name, table, column)?;
        Ok(())
    }

    pub fn clear_column_foreign_key(&mut self, name: &str) -> Result<(), EditorError> {
        self.column_mut(name)?.key.clear_foreign();
        Ok(())
    }

    pub fn add_relationship(&mut self, draft: RelationshipDraft) {
        self.relationships.push(draft);
    }

    pub fn remove_relationship(&mut self, index: usize) -> Option<RelationshipDraft> {
        (index < self.relationships.len()).then(|| self.relationships.remove(index))
    }

    /// Rank other tables in the store against the current name.
    pub fn refresh_suggestions(&mut self, store: &GraphStore, strategy: &dyn RelationshipStrategy, limit: usize) {
        let linked: Vec<&str> = self.relationships.iter().map(|r| r.peer_id.as_str()).collect();
        let tables: Vec<TableRef<'_>> = store
            .tables()
            .filter(|t| t.id != self.node_id && !linked.contains(&t.id.as_str()))
            .map(|t| TableRef {
                id: &t.id,
                name: &t.table_name,
            })
            .collect();
        let mut suggestions = strategy.suggest(&self.table_name, &tables);
        suggestions.truncate(limit);
        self.suggestions = suggestions;
    }

    /// Turn a suggestion into a relationship draft. Persisted only on save.
    pub fn accept_suggestion(&mut self, index: usize) -> Result<&RelationshipDraft, EditorError> {
        if index >= self.suggestions.len() {
            return Err(EditorError::NoSuchSuggestion(index));
        }
        let suggestion = self.suggestions.remove(index);
        let draft = RelationshipDraft::new(suggestion.table_id, Cardinality::OneToMany).with_label(suggestion.reason);
        self.relationships.push(draft);
        Ok(&self.relationships[self.relationships.len() - 1])
    }

    /// Blocking validation. Returns the warnings that need confirmation.
    pub fn validate(&self, store: &GraphStore) -> Result<Vec<SaveWarning>, EditorError> {
        require("Table name", &self.table_name)?;
        if self.columns.is_empty() {
            return Err(EditorError::NoColumns);
        }
        for draft in &self.relationships {
            let is_table = store.node(&draft.peer_id).is_some_and(|n| matches!(n, Node::Table(_)));
            if !is_table || draft.peer_id == self.node_id {
                return Err(EditorError::UnknownPeer(draft.peer_id.clone()));
            }
        }

        let mut warnings = Vec::new();
        if !self.columns.iter().any(Column::is_primary_key) {
            warnings.push(SaveWarning::MissingPrimaryKey {
                table: self.table_name.clone(),
            });
        }
        Ok(warnings)
    }

    /// Stored key columns whose key role this draft removes or changes.
    pub fn dropped_keys(&self) -> Vec<Column> {
        let Some(original) = &self.original else {
            return Vec::new();
        };
        original
            .columns
            .iter()
            .filter(|c| c.key.is_key())
            .filter(|c| self.columns.iter().find(|d| d.name == c.name).is_none_or(|d| d.key != c.key))
            .cloned()
            .collect()
    }

    /// Node for a new table.
    pub fn to_node(&self) -> TableNode {
        TableNode {
            id: self.node_id.clone(),
            position: self.position,
            table_name: self.table_name.trim().to_string(),
            description: self.description.clone(),
            columns: self.columns.clone(),
            is_user_added: true,
        }
    }

    /// Patch for an existing table.
    pub fn to_patch(&self) -> TablePatch {
        TablePatch {
            table_name: Some(self.table_name.trim().to_string()),
            description: Some(self.description.clone()),
            columns: Some(self.columns.clone()),
            position: Some(self.position),
        }
    }

    /// Whether the draft's relationships differ from the stored edges.
    pub fn relationships_changed(&self, store: &GraphStore) -> bool {
        let stored = store
            .incident_edges(&self.node_id)
            .filter(|e| e.other_end(&self.node_id).and_then(|p| store.node(p)).is_some_and(|n| n.as_table().is_some()))
            .count();
        stored != self.relationships.len() || self.relationships.iter().any(|r| r.edge_id.is_none())
    }

    /// Edge set replacing the table's incident edges.
    pub fn to_edges(&self) -> Vec<Edge> {
        self.relationships.iter().map(|r| r.to_edge(&self.node_id)).collect()
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column, EditorError> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| EditorError::ColumnNotFound(name.to_string()))
    }
}

impl RelationshipDraft {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn incoming(mut self) -> Self {
        self.direction = Direction::Incoming;
        self
    }
}
