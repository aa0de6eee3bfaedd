//! Relationship recommendations.

use serde::Serialize;
use std::cmp::Ordering;

/// A table as seen by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub table_id: String,
    pub table_name: String,
    pub score: f64,
    pub reason: String,
}

pub trait RelationshipStrategy {
    /// Candidates related to `subject`, best first.
    fn suggest(&self, subject: &str, tables: &[TableRef<'_>]) -> Vec<Suggestion>;
}

const CONTAINMENT_SCORE: f64 = 0.9;
const AFFINITY_SCORE: f64 = 0.75;

const AFFINITY_RULES: &[(&str, &[&str])] = &[
    ("order", &["customer", "product", "payment", "shipment", "invoice"]),
    ("customer", &["order", "address", "account"]),
    ("product", &["order", "category", "inventory", "supplier"]),
    ("payment", &["order", "invoice", "customer"]),
    ("invoice", &["order", "customer", "payment"]),
    ("employee", &["department", "manager"]),
    ("user", &["role", "account", "session", "profile"]),
];

/// Substring affinity over table names: a name containing the other, or a
/// known pairing such as `order` with `customer`.
#[derive(Debug, Clone)]
pub struct SubstringAffinity {
    rules: &'static [(&'static str, &'static [&'static str])],
}

impl Default for SubstringAffinity {
    fn default() -> Self {
        Self { rules: AFFINITY_RULES }
    }
}

impl SubstringAffinity {
    fn score(&self, subject: &str, candidate: &str) -> Option<(f64, String)> {
        if subject.contains(candidate) || candidate.contains(subject) {
            return Some((CONTAINMENT_SCORE, format!("names share '{}'", shorter(subject, candidate))));
        }
        self.rules.iter().find_map(|(stem, related)| {
            let hit = related.iter().find(|r| candidate.contains(**r))?;
            subject
                .contains(stem)
                .then(|| (AFFINITY_SCORE, format!("{} usually relates to {}", stem, hit)))
        })
    }
}

impl RelationshipStrategy for SubstringAffinity {
    fn suggest(&self, subject: &str, tables: &[TableRef<'_>]) -> Vec<Suggestion> {
        let subject = subject.trim().to_lowercase();
        if subject.is_empty() {
            return Vec::new();
        }

        let mut out: Vec<Suggestion> = tables
            .iter()
            .filter(|t| t.name.to_lowercase() != subject)
            .filter_map(|t| {
                let (score, reason) = self.score(&subject, &t.name.to_lowercase())?;
                Some(Suggestion {
                    table_id: t.id.to_string(),
                    table_name: t.name.to_string(),
                    score,
                    reason,
                })
            })
            .collect();
        rank(&mut out);
        out
    }
}

/// Sort by score descending, then by name.
pub fn rank(suggestions: &mut [Suggestion]) {
    suggestions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.table_name.cmp(&b.table_name))
    });
}

fn shorter<'a>(a: &'a str, b: &'a str) -> &'a str {
    if a.len() <= b.len() { a } else { b }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> Vec<TableRef<'static>> {
        vec![
            TableRef { id: "t1", name: "Customer" },
            TableRef { id: "t2", name: "Product" },
            TableRef { id: "t3", name: "OrderItem" },
            TableRef { id: "t4", name: "Warehouse" },
            TableRef { id: "t5", name: "Order" },
        ]
    }

    #[test]
    fn test_order_suggestions() {
        let sugs = SubstringAffinity::default().suggest("Order", &tables());
        let names: Vec<&str> = sugs.iter().map(|s| s.table_name.as_str()).collect();
        assert_eq!(names, vec!["OrderItem", "Customer", "Product"]);
        assert_eq!(sugs[0].score, CONTAINMENT_SCORE);
    }

    #[test]
    fn test_subject_excluded_and_blank() {
        let strategy = SubstringAffinity::default();
        assert!(strategy
            .suggest("order", &tables())
            .iter()
            .all(|s| s.table_name != "Order"));
        assert!(strategy.suggest("  ", &tables()).is_empty());
    }

    #[test]
    fn test_no_affinity() {
        assert!(SubstringAffinity::default().suggest("Audit", &tables()).is_empty());
    }
}
