//! Search over node labels and table column names.
//!
//! Presentation only: the result marks which nodes to highlight. Nothing
//! here touches the store or the change log.

use crate::model::Node;
use std::collections::BTreeSet;

/// Ids of nodes whose label, or any table column name, contains `query`
/// ignoring case. A blank query matches nothing: the filter is off.
pub fn compute_matches(nodes: &[Node], query: &str) -> BTreeSet<String> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return BTreeSet::new();
    }

    nodes
        .iter()
        .filter(|node| {
            let hit = |s: &str| s.to_lowercase().contains(&needle);
            hit(node.label())
                || match node {
                    Node::Table(t) => t.columns.iter().any(|c| hit(&c.name)),
                    Node::Attribute(_) => false,
                }
        })
        .map(|node| node.id().to_string())
        .collect()
}
