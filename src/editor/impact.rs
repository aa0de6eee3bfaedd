//! Impact preview for deletes and key edits.
//!
//! Informational only. A preview never blocks; it tells the caller what a
//! confirmed retry will break.

use crate::model::{Column, KeyRole, Node, NodeKind};
use crate::store::GraphStore;
use crate::view::ViewLevel;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactScope {
    Delete,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedPeer {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactPreview {
    pub target_id: String,
    pub target_label: String,
    pub scope: ImpactScope,
    pub columns_removed: usize,
    pub primary_keys_broken: usize,
    pub foreign_keys_broken: usize,
    pub peers: Vec<AffectedPeer>,
}

impl ImpactPreview {
    /// What deleting `id` would take with it.
    pub fn for_delete(store: &GraphStore, id: &str) -> Option<Self> {
        let target = store.node(id)?;

        let members: Vec<&Node> = match (target, store.view()) {
            (Node::Table(t), ViewLevel::Attribute) => store
                .nodes()
                .iter()
                .filter(|n| matches!(n, Node::Attribute(a) if a.table_name == t.table_name))
                .collect(),
            _ => Vec::new(),
        };

        let mut roles: Vec<&KeyRole> = Vec::new();
        let columns_removed = match target {
            Node::Table(t) => {
                roles.extend(t.columns.iter().map(|c| &c.key));
                roles.extend(members.iter().filter_map(|n| n.as_attribute()).map(|a| &a.key));
                t.columns.len() + members.len()
            }
            Node::Attribute(a) => {
                roles.push(&a.key);
                1
            }
        };

        let primary_keys_broken = roles.iter().filter(|r| r.is_primary()).count();
        let own_foreign = roles.iter().filter(|r| r.is_foreign()).count();
        let inbound = match target {
            Node::Table(t) => count_references(store, |table, _| table == t.table_name),
            Node::Attribute(a) => {
                count_references(store, |table, column| table == a.table_name && column == a.attribute_name)
            }
        };

        let mut sources: Vec<&str> = vec![id];
        sources.extend(members.iter().map(|n| n.id()));
        Some(Self {
            target_id: id.to_string(),
            target_label: target.label().to_string(),
            scope: ImpactScope::Delete,
            columns_removed,
            primary_keys_broken,
            foreign_keys_broken: own_foreign + inbound,
            peers: neighbours(store, &sources),
        })
    }

    /// What saving an edit that drops the key role of `dropped` would break.
    pub fn for_edit(store: &GraphStore, id: &str, dropped: &[Column]) -> Option<Self> {
        let target = store.node(id)?;
        let table = target.table_name();

        let primary_keys_broken = dropped.iter().filter(|c| c.is_primary_key()).count();
        let inbound: usize = dropped
            .iter()
            .filter(|c| c.is_primary_key())
            .map(|c| count_references(store, |t, col| t == table && col == c.name))
            .sum();
        Some(Self {
            target_id: id.to_string(),
            target_label: target.label().to_string(),
            scope: ImpactScope::Edit,
            columns_removed: 0,
            primary_keys_broken,
            foreign_keys_broken: dropped.iter().filter(|c| c.is_foreign_key()).count() + inbound,
            peers: neighbours(store, &[id]),
        })
    }

    pub fn breaks_keys(&self) -> bool {
        self.primary_keys_broken > 0 || self.foreign_keys_broken > 0
    }

    pub fn summary(&self) -> String {
        let verb = match self.scope {
            ImpactScope::Delete => "Deleting",
            ImpactScope::Edit => "Editing",
        };
        let mut text = format!(
            "{} {} removes {} column(s), breaks {} primary key(s) and {} foreign key(s)",
            verb, self.target_label, self.columns_removed, self.primary_keys_broken, self.foreign_keys_broken
        );
        if !self.peers.is_empty() {
            let names: Vec<&str> = self.peers.iter().map(|p| p.label.as_str()).collect();
            text.push_str(&format!("; affects {}", names.join(", ")));
        }
        text
    }
}

/// Foreign keys elsewhere in the graph whose reference matches.
fn count_references(store: &GraphStore, matches: impl Fn(&str, &str) -> bool) -> usize {
    let is_hit = |role: &KeyRole| role.reference().is_some_and(|(t, c)| matches(t, c));
    store
        .nodes()
        .iter()
        .map(|n| match n {
            Node::Table(t) => t.columns.iter().filter(|c| is_hit(&c.key)).count(),
            Node::Attribute(a) => usize::from(is_hit(&a.key)),
        })
        .sum()
}

/// Nodes one edge away from any of `sources`, excluding the sources.
fn neighbours(store: &GraphStore, sources: &[&str]) -> Vec<AffectedPeer> {
    let own: HashSet<&str> = sources.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut peers = Vec::new();
    for edge in store.edges() {
        for source in sources {
            let Some(other) = edge.other_end(source) else {
                continue;
            };
            if own.contains(other) || !seen.insert(other.to_string()) {
                continue;
            }
            if let Some(node) = store.node(other) {
                peers.push(AffectedPeer {
                    id: other.to_string(),
                    label: node.label().to_string(),
                    kind: node.kind(),
                });
            }
        }
    }
    peers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cardinality;
    use crate::roster::{SourceModel, SourceRelationship, SourceTable};

    fn shop() -> SourceModel {
        SourceModel {
            tables: vec![
                SourceTable::new("Customer", vec![Column::new("id", "BIGINT").primary_key()]),
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
    fn test_delete_table_preview() {
        let store = GraphStore::materialize(shop(), ViewLevel::Table);
        let preview = ImpactPreview::for_delete(&store, "tbl:Customer").unwrap();
        assert_eq!(preview.columns_removed, 1);
        assert_eq!(preview.primary_keys_broken, 1);
        assert_eq!(preview.foreign_keys_broken, 1);
        assert_eq!(preview.peers.len(), 1);
        assert_eq!(preview.peers[0].label, "Order");
        assert!(preview.breaks_keys());
    }

    #[test]
    fn test_delete_attribute_view_table() {
        let store = GraphStore::materialize(shop(), ViewLevel::Attribute);
        let preview = ImpactPreview::for_delete(&store, "tbl:Order").unwrap();
        assert_eq!(preview.columns_removed, 2);
        assert_eq!(preview.primary_keys_broken, 1);
        assert_eq!(preview.foreign_keys_broken, 1);
        // Order.customer_id -> Customer.id
        assert_eq!(preview.peers[0].id, "attr:Customer.id");
    }

    #[test]
    fn test_edit_preview() {
        let store = GraphStore::materialize(shop(), ViewLevel::Table);
        let dropped = vec![Column::new("id", "BIGINT").primary_key()];
        let preview = ImpactPreview::for_edit(&store, "tbl:Customer", &dropped).unwrap();
        assert_eq!(preview.scope, ImpactScope::Edit);
        assert_eq!(preview.primary_keys_broken, 1);
        assert_eq!(preview.foreign_keys_broken, 1);
        assert!(preview.summary().starts_with("Editing Customer"));
    }

    #[test]
    fn test_missing_target() {
        let store = GraphStore::materialize(shop(), ViewLevel::Table);
        assert!(ImpactPreview::for_delete(&store, "nope").is_none());
    }
}
