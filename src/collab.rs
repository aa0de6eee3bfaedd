//! Contracts for the external services the editor talks to.
//!
//! Implementations live outside this crate. Calls are plain
//! request/response; timeouts and retries belong to the implementation.
//! The session pairs each request with a [`RequestTicket`] so an answer
//! that arrives after the user has moved on can be recognized and dropped.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Identifies one outstanding request and the context it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestTicket {
    pub epoch: u64,
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub name: String,
    pub column: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub description: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub tables: Vec<QueryMatch>,
    pub analysis: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub impact: ImpactLevel,
    pub dependent_count: usize,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub total_affected: usize,
    pub high_impact: usize,
    pub medium_impact: usize,
    pub low_impact: usize,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactResponse {
    pub affected_entities: Vec<AffectedEntity>,
    pub summary: ImpactSummary,
}

impl ImpactResponse {
    /// Build a response whose summary counts agree with its entities.
    pub fn from_entities(affected_entities: Vec<AffectedEntity>, recommendations: Vec<String>) -> Self {
        let count = |level| affected_entities.iter().filter(|e| e.impact == level).count();
        let summary = ImpactSummary {
            total_affected: affected_entities.len(),
            high_impact: count(ImpactLevel::High),
            medium_impact: count(ImpactLevel::Medium),
            low_impact: count(ImpactLevel::Low),
            recommendations,
        };
        Self {
            affected_entities,
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyMatch {
    pub term: String,
    pub category: String,
    pub confidence: f64,
    #[serde(default)]
    pub description: String,
}

/// Natural-language questions about the model.
pub trait QueryService {
    fn query(&self, query: &str) -> Result<QueryResponse, CollaboratorError>;
}

/// Downstream impact of changing an entity.
pub trait ImpactService {
    fn analyze(&self, entity_name: &str) -> Result<ImpactResponse, CollaboratorError>;
}

/// Maps a model term to ontology terms.
pub trait OntologyMatcher {
    fn match_terms(&self, query: &str) -> Result<Vec<OntologyMatch>, CollaboratorError>;
}

/// Highest confidence first; NaN sorts last.
pub fn rank_ontology(matches: &mut [OntologyMatch]) {
    matches.sort_by(|a, b| match (a.confidence.is_nan(), b.confidence.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal),
    });
}

/// Matcher results, ranked.
pub fn ranked_matches(matcher: &dyn OntologyMatcher, query: &str) -> Result<Vec<OntologyMatch>, CollaboratorError> {
    let mut matches = matcher.match_terms(query)?;
    rank_ontology(&mut matches);
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedMatcher;

    impl OntologyMatcher for FixedMatcher {
        fn match_terms(&self, query: &str) -> Result<Vec<OntologyMatch>, CollaboratorError> {
            if query.is_empty() {
                return Err(CollaboratorError::Rejected("empty query".into()));
            }
            let entry = |term: &str, confidence| OntologyMatch {
                term: term.into(),
                category: "entity".into(),
                confidence,
                description: String::new(),
            };
            Ok(vec![entry("Party", 0.4), entry("Unknown", f64::NAN), entry("Customer", 0.95)])
        }
    }

    #[test]
    fn test_ranked_descending() {
        let ranked = ranked_matches(&FixedMatcher, "client").unwrap();
        let terms: Vec<&str> = ranked.iter().map(|m| m.term.as_str()).collect();
        assert_eq!(terms, vec!["Customer", "Party", "Unknown"]);
    }

    #[test]
    fn test_failure_passes_through() {
        assert!(matches!(ranked_matches(&FixedMatcher, ""), Err(CollaboratorError::Rejected(_))));
    }

    #[test]
    fn test_impact_summary_counts() {
        let entity = |name: &str, impact| AffectedEntity {
            name: name.into(),
            entity_type: "table".into(),
            impact,
            dependent_count: 1,
            description: String::new(),
        };
        let response = ImpactResponse::from_entities(
            vec![entity("Order", ImpactLevel::High), entity("Payment", ImpactLevel::Low)],
            vec!["Migrate Order first".into()],
        );
        assert_eq!(response.summary.total_affected, 2);
        assert_eq!(response.summary.high_impact, 1);
        assert_eq!(response.summary.medium_impact, 0);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["affectedEntities"][0]["type"], "table");
        assert_eq!(json["affectedEntities"][0]["dependentCount"], 1);
        assert_eq!(json["summary"]["highImpact"], 1);
    }

    #[test]
    fn test_query_response_wire_shape() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"tables": [{"name": "Order", "column": "total", "type": "DECIMAL", "confidence": 0.8}],
                "analysis": "Totals live on Order"}"#,
        )
        .unwrap();
        assert_eq!(response.tables[0].data_type, "DECIMAL");
        assert_eq!(response.analysis, "Totals live on Order");
    }
}
