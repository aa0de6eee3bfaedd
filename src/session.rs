//! The editing session: one store, one change log, one audit log and at
//! most one open editor. Every user action goes through `&mut Session`.
//!
//! Each store mutation appends exactly one pending change and one audit
//! entry. Nothing mutates while a review is open, and direct mutations are
//! refused while an editor holds the lease.

use crate::artifacts::{ChatMessage, ChatRole, Transformation};
use crate::audit::{AuditLog, AuditSink};
use crate::changes::{ChangeKind, ChangeLog, PendingChange, ReviewOutcome, ReviewSummary, TransactionError};
use crate::collab::{
    ranked_matches, CollaboratorError, ImpactResponse, ImpactService, OntologyMatch, OntologyMatcher, QueryResponse,
    QueryService, RequestTicket,
};
use crate::config::EditorConfig;
use crate::ddl::generate_ddl_with;
use crate::editor::{
    AttributeEditor, Confirmation, EditorError, ImpactPreview, RelationshipStrategy, SaveWarning, SubstringAffinity,
    TableEditor,
};
use crate::export::{ddl_file_name, SessionSnapshot};
use crate::import::{parse_tasks, replay, ImportError, ResultLogEntry};
use crate::model::{new_id, Cardinality, Column, Edge, Node, REFERENCES};
use crate::roster::SourceModel;
use crate::search::compute_matches;
use crate::store::{GraphStore, NodePatch, Removal, StoreError};
use crate::view::ViewLevel;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Another editor is open; save or close it first")]
    EditorBusy,
    #[error("No editor is open")]
    NoEditor,
    #[error("The editor lease is no longer valid")]
    StaleLease,
    #[error("Open editor is a {open} editor, not a {requested} editor")]
    WrongEditor {
        open: &'static str,
        requested: &'static str,
    },
    #[error("This editor needs the {required} view; the active view is {active}")]
    ViewMismatch { required: &'static str, active: &'static str },
}

/// Proof of holding the editor slot. Stale once the editor is saved or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditorLease(u64);

#[derive(Debug, Clone)]
enum OpenEditor {
    Table(TableEditor),
    Attribute(AttributeEditor),
}

impl OpenEditor {
    fn name(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Attribute(_) => "attribute",
        }
    }
}

#[derive(Debug, Clone)]
struct EditorSlot {
    lease: EditorLease,
    editor: OpenEditor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved { node_id: String },
    /// Nothing was written; retry with confirmation.
    NeedsConfirmation(Vec<SaveWarning>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted(Removal),
    /// Nothing was removed; retry with confirmation.
    NeedsConfirmation(ImpactPreview),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcome: ReviewOutcome,
    pub cleared: Vec<PendingChange>,
    /// What Decline took out of the graph.
    pub removed: Removal,
}

/// A query handed to a collaborator, tagged with the context it was asked in.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub ticket: RequestTicket,
    pub question: String,
}

pub struct Session {
    config: EditorConfig,
    store: GraphStore,
    changes: ChangeLog,
    audit: AuditLog,
    transformations: Vec<Transformation>,
    result_logs: Vec<ResultLogEntry>,
    chat_messages: Vec<ChatMessage>,
    editor: Option<EditorSlot>,
    next_lease: u64,
    epoch: u64,
    next_request: u64,
    strategy: Box<dyn RelationshipStrategy>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("view", &self.store.view())
            .field("nodes", &self.store.nodes().len())
            .field("edges", &self.store.edges().len())
            .field("pending", &self.changes.len())
            .field("editor", &self.editor.as_ref().map(|s| s.editor.name()))
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl Session {
    pub fn new(roster: SourceModel, config: EditorConfig) -> Self {
        let store = GraphStore::materialize(roster, config.initial_view);
        let audit = AuditLog::new(config.actor_id.clone());
        Self {
            config,
            store,
            changes: ChangeLog::default(),
            audit,
            transformations: Vec::new(),
            result_logs: Vec::new(),
            chat_messages: Vec::new(),
            editor: None,
            next_lease: 0,
            epoch: 0,
            next_request: 0,
            strategy: Box::new(SubstringAffinity::default()),
        }
    }

    pub fn with_audit_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = self.audit.with_sink(sink);
        self
    }

    pub fn with_strategy(mut self, strategy: Box<dyn RelationshipStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn view(&self) -> ViewLevel {
        self.store.view()
    }

    pub fn changes(&self) -> &ChangeLog {
        &self.changes
    }

    pub fn pending(&self) -> &[PendingChange] {
        self.changes.pending()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    pub fn result_logs(&self) -> &[ResultLogEntry] {
        &self.result_logs
    }

    pub fn chat_messages(&self) -> &[ChatMessage] {
        &self.chat_messages
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn has_open_editor(&self) -> bool {
        self.editor.is_some()
    }

    // Editors

    pub fn create_table_editor(&mut self) -> Result<EditorLease, SessionError> {
        self.ensure_can_open(ViewLevel::Table)?;
        Ok(self.lease(OpenEditor::Table(TableEditor::create())))
    }

    pub fn edit_table(&mut self, id: &str) -> Result<EditorLease, SessionError> {
        self.ensure_can_open(ViewLevel::Table)?;
        let editor = TableEditor::open(&self.store, id).ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;
        Ok(self.lease(OpenEditor::Table(editor)))
    }

    pub fn create_attribute_editor(&mut self, table_name: &str) -> Result<EditorLease, SessionError> {
        self.ensure_can_open(ViewLevel::Attribute)?;
        Ok(self.lease(OpenEditor::Attribute(AttributeEditor::create(table_name))))
    }

    pub fn edit_attribute(&mut self, id: &str) -> Result<EditorLease, SessionError> {
        self.ensure_can_open(ViewLevel::Attribute)?;
        let node = self
            .store
            .node(id)
            .and_then(Node::as_attribute)
            .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;
        let editor = AttributeEditor::open(node);
        Ok(self.lease(OpenEditor::Attribute(editor)))
    }

    pub fn table_editor(&mut self, lease: EditorLease) -> Result<&mut TableEditor, SessionError> {
        match &mut self.slot(lease)?.editor {
            OpenEditor::Table(editor) => Ok(editor),
            other => Err(SessionError::WrongEditor {
                open: other.name(),
                requested: "table",
            }),
        }
    }

    pub fn attribute_editor(&mut self, lease: EditorLease) -> Result<&mut AttributeEditor, SessionError> {
        match &mut self.slot(lease)?.editor {
            OpenEditor::Attribute(editor) => Ok(editor),
            other => Err(SessionError::WrongEditor {
                open: other.name(),
                requested: "attribute",
            }),
        }
    }

    /// Re-rank relationship suggestions for the open table editor.
    pub fn refresh_suggestions(&mut self, lease: EditorLease) -> Result<(), SessionError> {
        let limit = self.config.suggestion_limit;
        let Self {
            editor, store, strategy, ..
        } = self;
        match editor.as_mut() {
            Some(EditorSlot {
                lease: held,
                editor: OpenEditor::Table(table),
            }) if *held == lease => {
                table.refresh_suggestions(store, &**strategy, limit);
                Ok(())
            }
            Some(slot) if slot.lease == lease => Err(SessionError::WrongEditor {
                open: slot.editor.name(),
                requested: "table",
            }),
            Some(_) => Err(SessionError::StaleLease),
            None => Err(SessionError::NoEditor),
        }
    }

    /// Discard the draft and release the lease.
    pub fn close_editor(&mut self, lease: EditorLease) -> Result<(), SessionError> {
        self.slot(lease)?;
        self.editor = None;
        self.bump_epoch();
        Ok(())
    }

    pub fn save_table_editor(
        &mut self,
        lease: EditorLease,
        confirmation: Confirmation,
    ) -> Result<SaveOutcome, SessionError> {
        self.changes.ensure_recording()?;
        let editor = self.table_editor(lease)?.clone();

        let mut warnings = editor.validate(&self.store)?;
        let dropped = editor.dropped_keys();
        if !dropped.is_empty() {
            if let Some(preview) = ImpactPreview::for_edit(&self.store, editor.node_id(), &dropped) {
                warnings.push(SaveWarning::KeyImpact(preview));
            }
        }
        if !warnings.is_empty() && !confirmation.is_confirmed() {
            return Ok(SaveOutcome::NeedsConfirmation(warnings));
        }

        // Stage on a copy so a failure part-way leaves the graph untouched.
        let mut staged = self.store.clone();
        let mut records: Vec<(ChangeKind, Value)> = Vec::new();
        let node_id = editor.node_id().to_string();

        if editor.is_new() {
            let node = Node::Table(editor.to_node());
            records.push((ChangeKind::AddTable, serde_json::to_value(&node)?));
            staged.add_node(node)?;
        } else {
            let node = staged.update_node(&node_id, NodePatch::Table(editor.to_patch()))?;
            records.push((ChangeKind::UpdateTable, serde_json::to_value(node)?));
        }

        if editor.is_new() || editor.relationships_changed(&self.store) {
            let before: HashSet<String> = staged.incident_edges(&node_id).map(|e| e.id.clone()).collect();
            let edges = editor.to_edges();
            let after: HashSet<String> = edges.iter().map(|e| e.id.clone()).collect();
            for edge in edges.iter().filter(|e| !before.contains(&e.id)) {
                records.push((ChangeKind::AddRelationship, serde_json::to_value(edge)?));
            }
            let removal = staged.replace_incident_edges(&node_id, edges)?;
            for edge in removal.edges.iter().filter(|e| !after.contains(&e.id)) {
                records.push((ChangeKind::DeleteRelationship, serde_json::to_value(edge)?));
            }
        }

        self.store = staged;
        for (kind, payload) in records {
            self.record(kind, payload, &node_id)?;
        }
        self.editor = None;
        self.bump_epoch();
        Ok(SaveOutcome::Saved { node_id })
    }

    pub fn save_attribute_editor(
        &mut self,
        lease: EditorLease,
        confirmation: Confirmation,
    ) -> Result<SaveOutcome, SessionError> {
        self.changes.ensure_recording()?;
        let editor = self.attribute_editor(lease)?.clone();
        let key = editor.validate()?;

        if editor.drops_key()? && !confirmation.is_confirmed() {
            let dropped: Vec<Column> = editor.original().map(|o| vec![o.to_column()]).unwrap_or_default();
            let warnings = ImpactPreview::for_edit(&self.store, editor.node_id(), &dropped)
                .map(SaveWarning::KeyImpact)
                .into_iter()
                .collect();
            return Ok(SaveOutcome::NeedsConfirmation(warnings));
        }

        let mut staged = self.store.clone();
        let mut records: Vec<(ChangeKind, Value)> = Vec::new();
        let node_id = editor.node_id().to_string();

        if editor.is_new() {
            let node = Node::Attribute(editor.to_node()?);
            records.push((ChangeKind::AddAttribute, serde_json::to_value(&node)?));
            staged.add_node(node)?;
        } else {
            let node = staged.update_node(&node_id, NodePatch::Attribute(editor.to_patch()?))?;
            records.push((ChangeKind::UpdateAttribute, serde_json::to_value(node)?));
        }

        // A foreign key gets an edge to the attribute it references, when
        // that attribute is on the canvas. Outgoing reference edges that no
        // longer match the key are dropped.
        let target = key.reference().and_then(|(table, column)| {
            staged
                .nodes()
                .iter()
                .find(|n| matches!(n, Node::Attribute(a) if a.table_name == table && a.attribute_name == column))
                .map(|n| n.id().to_string())
        });
        let stale: Vec<String> = staged
            .edges()
            .iter()
            .filter(|e| e.is_reference_from(&node_id) && Some(&e.target_node_id) != target.as_ref())
            .map(|e| e.id.clone())
            .collect();
        for id in stale {
            let edge = staged.remove_edge(&id)?;
            records.push((ChangeKind::DeleteRelationship, serde_json::to_value(&edge)?));
        }
        if let Some(target) = target {
            let linked = staged
                .edges()
                .iter()
                .any(|e| e.is_reference_from(&node_id) && e.target_node_id == target);
            if !linked {
                let mut edge =
                    Edge::new(new_id("edge"), node_id.as_str(), target, Cardinality::ManyToOne).with_label(REFERENCES);
                edge.is_user_added = true;
                records.push((ChangeKind::AddRelationship, serde_json::to_value(&edge)?));
                staged.add_edge(edge)?;
            }
        }

        self.store = staged;
        for (kind, payload) in records {
            self.record(kind, payload, &node_id)?;
        }
        self.editor = None;
        self.bump_epoch();
        Ok(SaveOutcome::Saved { node_id })
    }

    // Direct mutations

    /// Delete a node with its cascade. Key columns and key attributes cannot
    /// be deleted on their own; deleting a table that breaks keys needs
    /// confirmation.
    pub fn delete_node(&mut self, id: &str, confirmation: Confirmation) -> Result<DeleteOutcome, SessionError> {
        self.ensure_direct_mutation()?;
        let node = self.store.node(id).ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;

        if let Node::Attribute(a) = node {
            if a.key.is_key() {
                return Err(EditorError::ProtectedAttribute {
                    table: a.table_name.clone(),
                    attribute: a.attribute_name.clone(),
                }
                .into());
            }
        }
        let kind = match node {
            Node::Table(_) => ChangeKind::DeleteTable,
            Node::Attribute(_) => ChangeKind::DeleteAttribute,
        };

        if let Some(preview) = ImpactPreview::for_delete(&self.store, id) {
            if preview.breaks_keys() && !confirmation.is_confirmed() {
                return Ok(DeleteOutcome::NeedsConfirmation(preview));
            }
        }

        let removal = self.store.remove_node(id)?;
        let payload = json!({
            "id": id,
            "tableName": removal.nodes.first().map(|n| n.table_name()).unwrap_or_default(),
            "name": removal.nodes.first().map(|n| n.label()).unwrap_or_default(),
            "removedNodes": removal.node_ids(),
            "removedEdges": removal.edge_ids(),
            "unlinkedKeys": removal
                .unlinked
                .iter()
                .map(|(table, column)| format!("{}.{}", table, column))
                .collect::<Vec<_>>(),
        });
        self.record(kind, payload, id)?;
        Ok(DeleteOutcome::Deleted(removal))
    }

    pub fn add_column(&mut self, table_id: &str, mut column: Column) -> Result<(), SessionError> {
        self.ensure_direct_mutation()?;
        crate::editor::require("Column name", &column.name)?;
        crate::editor::require("Data type", &column.data_type)?;
        column.is_user_added = true;
        let payload = json!({ "tableId": table_id, "name": column.name, "column": serde_json::to_value(&column)? });
        self.store.add_column(table_id, column)?;
        self.record(ChangeKind::AddColumn, payload, table_id)?;
        Ok(())
    }

    /// Remove a non-key column. Recorded as a table update.
    pub fn delete_column(&mut self, table_id: &str, name: &str) -> Result<Column, SessionError> {
        self.ensure_direct_mutation()?;
        let column = self.store.remove_column(table_id, name)?;
        let table = self.store.node(table_id).map(Node::label).unwrap_or_default().to_string();
        self.record(
            ChangeKind::UpdateTable,
            json!({ "id": table_id, "tableName": table, "removedColumn": name }),
            table_id,
        )?;
        Ok(column)
    }

    /// Draw a default relationship between two nodes.
    pub fn connect(&mut self, source_id: &str, target_id: &str) -> Result<Edge, SessionError> {
        self.ensure_direct_mutation()?;
        let edge = self.store.connect(source_id, target_id)?.clone();
        self.record(ChangeKind::AddRelationship, serde_json::to_value(&edge)?, &edge.id)?;
        Ok(edge)
    }

    pub fn delete_edge(&mut self, id: &str) -> Result<Edge, SessionError> {
        self.ensure_direct_mutation()?;
        let edge = self.store.remove_edge(id)?;
        self.record(ChangeKind::DeleteRelationship, serde_json::to_value(&edge)?, id)?;
        Ok(edge)
    }

    pub fn add_transformation(
        &mut self,
        name: &str,
        source_table: &str,
        target_table: &str,
        expression: &str,
    ) -> Result<&Transformation, SessionError> {
        self.ensure_direct_mutation()?;
        let transformation = Transformation::new(name, source_table, target_table, expression)?;
        let id = transformation.id.clone();
        self.record(ChangeKind::AddTransformation, serde_json::to_value(&transformation)?, &id)?;
        self.transformations.push(transformation);
        Ok(&self.transformations[self.transformations.len() - 1])
    }

    /// Replay a JSON array of tasks into the result log. A bad document
    /// changes nothing.
    pub fn bulk_import(&mut self, input: &str) -> Result<usize, SessionError> {
        self.ensure_direct_mutation()?;
        let batch = parse_tasks(input).inspect_err(|e| tracing::warn!(error = %e, "bulk import rejected"))?;
        let entries = replay(&batch);
        let count = entries.len();
        self.record(ChangeKind::BulkUpload, batch.raw, "bulk_upload")?;
        self.result_logs.extend(entries);
        tracing::info!(tasks = count, "bulk import replayed");
        Ok(count)
    }

    // Review

    /// Freeze the pending log for review.
    pub fn commit(&mut self) -> Result<ReviewSummary, SessionError> {
        if self.editor.is_some() {
            return Err(SessionError::EditorBusy);
        }
        let summary = self.changes.begin_review()?;
        self.audit.log_action("commit", serde_json::to_value(&summary)?, None);
        tracing::info!(total = summary.total, "review started");
        Ok(summary)
    }

    /// Apply the reviewer's decision. Accept keeps the graph as the new
    /// baseline; Decline drops everything user-added; Modify reopens editing.
    pub fn resolve_review(&mut self, outcome: ReviewOutcome) -> Result<Resolution, SessionError> {
        let cleared = self.changes.resolve(outcome)?;
        let removed = match outcome {
            ReviewOutcome::Accept => {
                self.store.promote_baseline();
                Removal::default()
            }
            ReviewOutcome::Decline => self.store.discard_user_added(),
            ReviewOutcome::Modify => Removal::default(),
        };
        self.audit.log_action(
            "resolve_review",
            json!({
                "outcome": outcome,
                "cleared": cleared.len(),
                "removedNodes": removed.node_ids(),
                "removedEdges": removed.edge_ids(),
                "removedColumns": removed.columns.len(),
            }),
            None,
        );
        self.bump_epoch();
        Ok(Resolution {
            outcome,
            cleared,
            removed,
        })
    }

    /// Re-project the roster at another level. Pending changes and edits not
    /// yet accepted are dropped.
    pub fn switch_view(&mut self, view: ViewLevel) -> Result<(), SessionError> {
        self.ensure_direct_mutation()?;
        let discarded = self.changes.clear();
        if !discarded.is_empty() {
            tracing::warn!(discarded = discarded.len(), view = view.as_str(), "view switch dropped pending changes");
        }
        self.store.switch_view(view);
        self.audit.log_action(
            "switch_view",
            json!({ "view": view.as_str(), "discardedChanges": discarded.len() }),
            None,
        );
        self.bump_epoch();
        Ok(())
    }

    // Reads

    pub fn search(&self, query: &str) -> BTreeSet<String> {
        compute_matches(self.store.nodes(), query)
    }

    pub fn generate_ddl(&self) -> String {
        generate_ddl_with(self.store.nodes(), self.store.edges(), &self.config.ddl_options())
    }

    /// DDL text with its download file name.
    pub fn export_ddl(&self) -> (String, String) {
        (ddl_file_name(Utc::now()), self.generate_ddl())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            nodes: self.store.nodes().to_vec(),
            edges: self.store.edges().to_vec(),
            transformations: self.transformations.clone(),
            result_logs: self.result_logs.clone(),
            chat_messages: self.chat_messages.clone(),
            pending_changes: self.changes.pending().to_vec(),
            timestamp: Utc::now(),
        }
    }

    pub fn export_audit(&self) -> Result<String, SessionError> {
        Ok(self.audit.to_json()?)
    }

    // Collaborators

    pub fn issue_ticket(&mut self) -> RequestTicket {
        self.next_request += 1;
        RequestTicket {
            epoch: self.epoch,
            sequence: self.next_request,
        }
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.epoch == self.epoch
    }

    pub fn begin_query(&mut self, question: &str) -> Result<QueryRequest, SessionError> {
        crate::editor::require("Question", question)?;
        Ok(QueryRequest {
            ticket: self.issue_ticket(),
            question: question.trim().to_string(),
        })
    }

    /// Record an answer as a chat exchange. Answers to a request issued
    /// before the user navigated away are dropped; returns whether it was kept.
    pub fn accept_answer(&mut self, request: &QueryRequest, answer: &QueryResponse) -> bool {
        if !self.is_current(request.ticket) {
            tracing::warn!(
                epoch = request.ticket.epoch,
                current = self.epoch,
                "discarding stale query response"
            );
            return false;
        }
        self.chat_messages.push(ChatMessage::new(ChatRole::User, request.question.clone()));
        self.chat_messages.push(ChatMessage::new(ChatRole::Assistant, answer.analysis.clone()));
        true
    }

    /// Ask and record in one step. `None` when the answer went stale.
    pub fn ask(&mut self, service: &dyn QueryService, question: &str) -> Result<Option<QueryResponse>, SessionError> {
        let request = self.begin_query(question)?;
        let answer = service.query(&request.question)?;
        Ok(self.accept_answer(&request, &answer).then_some(answer))
    }

    pub fn analyze_impact(&self, service: &dyn ImpactService, entity_name: &str) -> Result<ImpactResponse, SessionError> {
        crate::editor::require("Entity name", entity_name)?;
        Ok(service.analyze(entity_name.trim())?)
    }

    /// Ontology matches, highest confidence first.
    pub fn match_ontology(&self, matcher: &dyn OntologyMatcher, query: &str) -> Result<Vec<OntologyMatch>, SessionError> {
        Ok(ranked_matches(matcher, query)?)
    }

    // Internals

    fn record(&mut self, kind: ChangeKind, payload: Value, context_id: &str) -> Result<(), SessionError> {
        self.audit.log_action(kind.as_str(), payload.clone(), Some(context_id));
        self.changes.record(kind, payload)?;
        Ok(())
    }

    fn ensure_direct_mutation(&self) -> Result<(), SessionError> {
        self.changes.ensure_recording()?;
        if self.editor.is_some() {
            return Err(SessionError::EditorBusy);
        }
        Ok(())
    }

    fn ensure_can_open(&self, required: ViewLevel) -> Result<(), SessionError> {
        self.ensure_direct_mutation()?;
        if self.store.view() != required {
            return Err(SessionError::ViewMismatch {
                required: required.as_str(),
                active: self.store.view().as_str(),
            });
        }
        Ok(())
    }

    fn lease(&mut self, editor: OpenEditor) -> EditorLease {
        self.next_lease += 1;
        let lease = EditorLease(self.next_lease);
        self.editor = Some(EditorSlot { lease, editor });
        self.bump_epoch();
        lease
    }

    fn slot(&mut self, lease: EditorLease) -> Result<&mut EditorSlot, SessionError> {
        match self.editor.as_mut() {
            Some(slot) if slot.lease == lease => Ok(slot),
            Some(_) => Err(SessionError::StaleLease),
            None => Err(SessionError::NoEditor),
        }
    }

    fn bump_epoch(&mut self) {
        self.epoch += 1;
    }
}
