//! Reasoning-service judgements
//!
//! The external reasoning service makes three kinds of judgement for this
//! system: whether a candidate concept semantically duplicates an existing
//! one, whether a prerequisite relation between two concepts is pedagogically
//! sound, and how many study hours a set of concepts needs.
//!
//! `ReasoningService` is the seam: callers (catalog, validation engine,
//! effort estimator) depend on the trait and apply their own fallback policy
//! when a call fails. `LlmReasoner` is the production implementation, built
//! on the `llm` chat client with prompt construction and JSON verdict
//! extraction.

mod llm;

pub use llm::LlmReasoner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A concept as presented to the reasoning service
#[derive(Debug, Clone, Serialize)]
pub struct ConceptBrief {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ConceptBrief {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }
}

/// A node submitted for effort estimation
#[derive(Debug, Clone, Serialize)]
pub struct EstimateInput {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Verdict of a semantic duplicate check
#[derive(Debug, Clone, Deserialize)]
pub struct DuplicateVerdict {
    #[serde(alias = "isDuplicate")]
    pub is_duplicate: bool,
    #[serde(default)]
    pub reason: String,
    /// Title of the matched existing concept, when a duplicate was found
    #[serde(default, alias = "matchedTitle")]
    pub matched_title: Option<String>,
}

/// Verdict on one prerequisite relation
#[derive(Debug, Clone, Deserialize)]
pub struct PathVerdict {
    #[serde(alias = "isValid")]
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// Per-node hour estimate returned by the service
#[derive(Debug, Clone, Deserialize)]
pub struct NodeEffort {
    pub id: String,
    #[serde(alias = "estimatedHours", alias = "hours")]
    pub estimated_hours: f64,
}

/// Effort estimates for a node set
#[derive(Debug, Clone, Deserialize)]
pub struct EffortEstimates {
    pub nodes: Vec<NodeEffort>,
    #[serde(default, alias = "suggestedDailyHours")]
    pub suggested_daily_hours: Option<f64>,
}

/// The three judgements this system delegates to the reasoning service.
///
/// Implementations must be cheap to share (`Arc<dyn ReasoningService>`) and
/// every method must resolve within a bounded time; callers never wait
/// indefinitely.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Is the candidate a semantic duplicate of any existing concept?
    async fn check_duplicate(
        &self,
        candidate: &ConceptBrief,
        existing: &[ConceptBrief],
    ) -> Result<DuplicateVerdict>;

    /// Is "learn `from` before `to`" pedagogically sound?
    async fn judge_path(&self, from: &str, to: &str) -> Result<PathVerdict>;

    /// Estimate study hours per node
    async fn estimate_effort(&self, nodes: &[EstimateInput]) -> Result<EffortEstimates>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_verdict_aliases() {
        let camel: DuplicateVerdict =
            serde_json::from_str(r#"{"isDuplicate": true, "reason": "same", "matchedTitle": "Algebra"}"#)
                .unwrap();
        assert!(camel.is_duplicate);
        assert_eq!(camel.matched_title.as_deref(), Some("Algebra"));

        let snake: DuplicateVerdict =
            serde_json::from_str(r#"{"is_duplicate": false}"#).unwrap();
        assert!(!snake.is_duplicate);
        assert!(snake.reason.is_empty());
    }

    #[test]
    fn test_path_verdict_aliases() {
        let verdict: PathVerdict = serde_json::from_str(
            r#"{"isValid": false, "reason": "reversed", "recommendation": "swap the edge"}"#,
        )
        .unwrap();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.recommendation.as_deref(), Some("swap the edge"));
    }

    #[test]
    fn test_effort_estimates_aliases() {
        let estimates: EffortEstimates = serde_json::from_str(
            r#"{"nodes": [{"id": "1", "estimatedHours": 3.5}], "suggestedDailyHours": 2}"#,
        )
        .unwrap();
        assert_eq!(estimates.nodes[0].estimated_hours, 3.5);
        assert_eq!(estimates.suggested_daily_hours, Some(2.0));
    }
}
