use schemagraph::changes::{ChangeKind, ReviewOutcome};
use schemagraph::config::EditorConfig;
use schemagraph::ddl::{generate_ddl, parse_sql, Dialect};
use schemagraph::editor::{AttributeEditor, Confirmation, EditorError, RelationshipDraft, TableEditor};
use schemagraph::model::{Cardinality, Column, KeyConflict, Node, TableNode};
use schemagraph::roster::{SourceModel, SourceRelationship, SourceTable};
use schemagraph::session::{DeleteOutcome, SaveOutcome, Session, SessionError};
use schemagraph::store::StoreError;
use schemagraph::view::ViewLevel;

fn shop() -> SourceModel {
    SourceModel {
        tables: vec![
            SourceTable::new(
                "Customer",
                vec![
                    Column::new("id", "BIGINT").primary_key(),
                    Column::new("email", "VARCHAR").with_length(255).not_null(),
                ],
            ),
            SourceTable::new(
                "Order",
                vec![
                    Column::new("id", "BIGINT").primary_key(),
                    Column::new("customer_id", "BIGINT").references("Customer", "id"),
                    Column::new("total", "DECIMAL"),
                ],
            ),
        ],
        relationships: vec![SourceRelationship::new("Customer", "Order", Cardinality::OneToMany)],
    }
}

fn view_session(view: ViewLevel) -> Session {
    let config = EditorConfig {
        initial_view: view,
        ..EditorConfig::default()
    };
    Session::new(shop(), config)
}

/// Add `Payment(payment_id BIGINT PK)` with an `Order -> Payment` edge.
fn add_payment(session: &mut Session) {
    let lease = session.create_table_editor().unwrap();
    {
        let editor = session.table_editor(lease).unwrap();
        editor.table_name = "Payment".into();
        editor.add_column(Column::new("payment_id", "BIGINT").primary_key()).unwrap();
        editor.add_relationship(RelationshipDraft::new("tbl:Order", Cardinality::OneToMany).incoming());
    }
    let outcome = session.save_table_editor(lease, Confirmation::Unconfirmed).unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { .. }));
}

/// Add `Payment(payment_id BIGINT PK)`, then connect `Order -> Payment` on
/// the canvas.
fn add_and_connect_payment(session: &mut Session) {
    let lease = session.create_table_editor().unwrap();
    {
        let editor = session.table_editor(lease).unwrap();
        editor.table_name = "Payment".into();
        editor.add_column(Column::new("payment_id", "BIGINT").primary_key()).unwrap();
    }
    let SaveOutcome::Saved { node_id } = session.save_table_editor(lease, Confirmation::Unconfirmed).unwrap() else {
        panic!("payment should save");
    };
    let edge = session.connect("tbl:Order", &node_id).unwrap();
    assert_eq!(edge.cardinality, Cardinality::OneToMany);
    assert!(edge.is_user_added);
}

fn save_attribute(session: &mut Session, id: Option<&str>, edit: impl FnOnce(&mut AttributeEditor)) {
    let lease = match id {
        Some(id) => session.edit_attribute(id).unwrap(),
        None => session.create_attribute_editor("Customer").unwrap(),
    };
    edit(session.attribute_editor(lease).unwrap());
    let outcome = session.save_attribute_editor(lease, Confirmation::Confirmed).unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { .. }));
}

/// Every reference edge leaves a foreign-key attribute for the attribute its
/// key names, and every such key whose target is on the canvas has one.
fn assert_references_agree(session: &Session) {
    let store = session.store();
    let attributes: Vec<_> = store.nodes().iter().filter_map(Node::as_attribute).collect();
    for attr in &attributes {
        let targets: Vec<&str> = store
            .edges()
            .iter()
            .filter(|e| e.is_reference_from(&attr.id))
            .map(|e| e.target_node_id.as_str())
            .collect();
        let expected: Vec<&str> = attr
            .key
            .reference()
            .and_then(|(t, c)| attributes.iter().find(|a| a.table_name == t && a.attribute_name == c))
            .map(|a| a.id.as_str())
            .into_iter()
            .collect();
        assert_eq!(targets, expected, "reference edges of {}", attr.id);
    }
}

fn table_count(session: &Session) -> usize {
    session.store().tables().count()
}

#[test]
fn test_decline_restores_baseline() {
    let mut session = view_session(ViewLevel::Table);
    add_payment(&mut session);
    assert_eq!(session.pending().len(), 2);
    assert_eq!(table_count(&session), 3);
    assert_eq!(session.store().edges().len(), 2);

    let summary = session.commit().unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.by_kind[&ChangeKind::AddTable], 1);
    assert_eq!(summary.by_kind[&ChangeKind::AddRelationship], 1);

    let resolution = session.resolve_review(ReviewOutcome::Decline).unwrap();
    assert_eq!(resolution.cleared.len(), 2);
    assert_eq!(table_count(&session), 2);
    assert_eq!(session.store().edges().len(), 1);
    assert!(session.pending().is_empty());
    session.store().check_integrity().unwrap();
}

#[test]
fn test_decline_strips_added_columns_but_keeps_edits() {
    let mut session = view_session(ViewLevel::Table);
    session
        .add_column("tbl:Customer", Column::new("nickname", "TEXT"))
        .unwrap();
    session.delete_column("tbl:Order", "total").unwrap();
    session.commit().unwrap();
    session.resolve_review(ReviewOutcome::Decline).unwrap();

    assert!(session.store().table_by_name("Customer").unwrap().column("nickname").is_none());
    // in-place edits to baseline tables stay
    assert!(session.store().table_by_name("Order").unwrap().column("total").is_none());
}

#[test]
fn test_accept_keeps_changes() {
    let mut session = view_session(ViewLevel::Table);
    add_payment(&mut session);
    session.commit().unwrap();
    session.resolve_review(ReviewOutcome::Accept).unwrap();

    assert_eq!(table_count(&session), 3);
    assert_eq!(session.store().edges().len(), 2);
    assert!(session.pending().is_empty());
    assert!(session.store().nodes().iter().all(|n| !n.is_user_added()));
    assert!(session.store().edges().iter().all(|e| !e.is_user_added));

    // accepted state survives a view switch
    session.switch_view(ViewLevel::Attribute).unwrap();
    assert!(session.store().node("attr:Payment.payment_id").is_some());
}

#[test]
fn test_modify_keeps_pending() {
    let mut session = view_session(ViewLevel::Table);
    add_payment(&mut session);
    session.commit().unwrap();
    session.resolve_review(ReviewOutcome::Modify).unwrap();
    assert_eq!(session.pending().len(), 2);
    assert_eq!(table_count(&session), 3);
}

#[test]
fn test_foreign_key_on_primary_key_rejected() {
    let session = view_session(ViewLevel::Table);
    let mut editor = TableEditor::open(session.store(), "tbl:Order").unwrap();
    let err = editor.set_column_foreign_key("id", "Customer", "id").unwrap_err();
    assert!(matches!(err, EditorError::KeyConflict(KeyConflict::AlreadyPrimary(_))));
    let id = editor.columns().iter().find(|c| c.name == "id").unwrap();
    assert!(id.is_primary_key() && !id.is_foreign_key());
}

#[test]
fn test_zero_column_table_gets_identity() {
    let nodes = vec![Node::Table(TableNode::new("t1", "Audit"))];
    let ddl = generate_ddl(&nodes, &[]);
    assert_eq!(ddl, "CREATE TABLE Audit (\n  id INTEGER PRIMARY KEY\n);\n");
}

#[test]
fn test_foreign_key_column_delete_rejected() {
    let mut session = view_session(ViewLevel::Table);
    let err = session.delete_column("tbl:Order", "customer_id").unwrap_err();
    assert!(matches!(err, SessionError::Store(StoreError::ProtectedKey { .. })));
    assert!(session.store().table_by_name("Order").unwrap().column("customer_id").is_some());
    assert!(session.pending().is_empty());
    assert!(session.audit().entries().is_empty());
}

#[test]
fn test_attribute_cascade_is_complete() {
    let mut session = view_session(ViewLevel::Attribute);
    let outcome = session.delete_node("tbl:Order", Confirmation::Confirmed).unwrap();
    let DeleteOutcome::Deleted(removal) = outcome else {
        panic!("confirmed delete should apply");
    };
    assert_eq!(removal.nodes.len(), 4);
    assert!(session.store().nodes().iter().all(|n| n.table_name() != "Order"));
    assert!(session.store().edges().is_empty());
    session.store().check_integrity().unwrap();
    assert_eq!(session.pending().len(), 1);
    assert_eq!(session.audit().entries().len(), 1);
}

#[test]
fn test_ddl_is_deterministic() {
    let mut a = view_session(ViewLevel::Table);
    let mut b = view_session(ViewLevel::Table);
    add_payment(&mut a);
    add_payment(&mut b);

    let first = a.generate_ddl();
    assert_eq!(first, a.generate_ddl());
    // node ids differ between sessions; the text does not
    assert_eq!(first, b.generate_ddl());
    assert!(first.contains("CREATE TABLE Payment"));
}

#[test]
fn test_connected_payment_decline_and_accept() {
    let mut declined = view_session(ViewLevel::Table);
    add_and_connect_payment(&mut declined);
    let kinds: Vec<ChangeKind> = declined.pending().iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![ChangeKind::AddTable, ChangeKind::AddRelationship]);
    declined.commit().unwrap();
    declined.resolve_review(ReviewOutcome::Decline).unwrap();
    assert_eq!(table_count(&declined), 2);
    assert_eq!(declined.store().edges().len(), 1);
    assert!(declined.pending().is_empty());

    let mut accepted = view_session(ViewLevel::Table);
    add_and_connect_payment(&mut accepted);
    accepted.commit().unwrap();
    accepted.resolve_review(ReviewOutcome::Accept).unwrap();
    assert_eq!(table_count(&accepted), 3);
    assert_eq!(accepted.store().edges().len(), 2);
    assert!(accepted.pending().is_empty());
    // one-to-many puts the key on Payment
    assert!(accepted.generate_ddl().contains("FOREIGN KEY (order_id) REFERENCES \"Order\" (id);"));
}

#[test]
fn test_attribute_edits_keep_edges_and_ddl_in_step() {
    let mut session = view_session(ViewLevel::Attribute);
    assert_references_agree(&session);

    save_attribute(&mut session, Some("attr:Order.customer_id"), |e| {
        e.set_foreign_key(false).unwrap();
    });
    assert_references_agree(&session);

    save_attribute(&mut session, Some("attr:Order.customer_id"), |e| {
        e.set_foreign_key(true).unwrap();
        e.referenced_table = "Customer".into();
        e.referenced_column = "email".into();
    });
    assert_references_agree(&session);

    save_attribute(&mut session, Some("attr:Order.customer_id"), |e| {
        e.referenced_column = "id".into();
    });
    assert_references_agree(&session);

    save_attribute(&mut session, None, |e| {
        e.attribute_name = "referrer_id".into();
        e.data_type = "BIGINT".into();
        e.set_foreign_key(true).unwrap();
        e.referenced_table = "Customer".into();
        e.referenced_column = "id".into();
    });
    assert_references_agree(&session);

    let ddl = session.generate_ddl();
    assert_eq!(ddl.matches("FOREIGN KEY").count(), 2);

    // the DDL reads back to the same key roles
    let roster = parse_sql(&ddl, Dialect::Generic).unwrap();
    for attr in session.store().nodes().iter().filter_map(Node::as_attribute) {
        let column = roster
            .table(&attr.table_name)
            .and_then(|t| t.columns.iter().find(|c| c.name == attr.attribute_name))
            .unwrap();
        assert_eq!(column.key, attr.key, "{}.{}", attr.table_name, attr.attribute_name);
    }

    let snapshot = session.snapshot();
    assert_eq!(snapshot.edges, session.store().edges());
}
