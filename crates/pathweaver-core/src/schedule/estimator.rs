//! Effort estimation
//!
//! Asks the reasoning service for per-concept study hours. Estimation is a
//! convenience, not a gate: if the service is down or returns garbage for a
//! node, that node gets the configured flat fallback and scheduling carries
//! on.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::reasoning::{EstimateInput, ReasoningService};

/// Hours estimate for one placed concept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEstimate {
    pub node_id: String,
    pub node_title: String,
    pub estimated_hours: f64,
    pub description: Option<String>,
}

/// Effort estimate for a set of placed concepts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimate {
    pub nodes: Vec<NodeEstimate>,
    pub total_hours: f64,
    /// Daily pace suggested by the reasoning service, if it offered one
    pub suggested_daily_hours: Option<f64>,
    /// True when the service was unavailable and flat fallbacks were used
    pub degraded: bool,
}

impl Estimate {
    /// Hours for a node, if it was part of this estimate
    pub fn hours_for(&self, node_id: &str) -> Option<f64> {
        self.nodes
            .iter()
            .find(|n| n.node_id == node_id)
            .map(|n| n.estimated_hours)
    }
}

/// Reasoning-backed estimator with a flat fallback
#[derive(Clone)]
pub struct EffortEstimator {
    reasoner: Arc<dyn ReasoningService>,
    fallback_hours: f64,
}

impl EffortEstimator {
    pub fn new(reasoner: Arc<dyn ReasoningService>, config: &ScheduleConfig) -> Self {
        Self {
            reasoner,
            fallback_hours: config.fallback_hours_per_node,
        }
    }

    /// Estimate hours for each input concept.
    ///
    /// The result always contains exactly one entry per input, in input
    /// order. Nodes the service skipped or answered nonsense for get the
    /// fallback.
    pub async fn estimate(&self, inputs: &[EstimateInput]) -> Result<Estimate> {
        if inputs.is_empty() {
            return Ok(Estimate {
                nodes: Vec::new(),
                total_hours: 0.0,
                suggested_daily_hours: None,
                degraded: false,
            });
        }

        let (by_id, suggested, degraded) = match self.reasoner.estimate_effort(inputs).await {
            Ok(estimates) => {
                let by_id: HashMap<String, f64> = estimates
                    .nodes
                    .into_iter()
                    .map(|n| (n.id, n.estimated_hours))
                    .collect();
                (by_id, estimates.suggested_daily_hours, false)
            }
            Err(e) => {
                warn!(error = %e, "Estimation unavailable, using flat fallback");
                (HashMap::new(), None, true)
            }
        };

        let nodes: Vec<NodeEstimate> = inputs
            .iter()
            .map(|input| {
                let hours = by_id
                    .get(&input.id)
                    .copied()
                    .filter(|h| h.is_finite() && *h > 0.0)
                    .unwrap_or(self.fallback_hours);
                NodeEstimate {
                    node_id: input.id.clone(),
                    node_title: input.title.clone(),
                    estimated_hours: hours,
                    description: input.description.clone(),
                }
            })
            .collect();

        let total_hours = nodes.iter().map(|n| n.estimated_hours).sum();
        info!(
            nodes = nodes.len(),
            total_hours, degraded, "Effort estimated"
        );

        Ok(Estimate {
            nodes,
            total_hours,
            suggested_daily_hours: suggested,
            degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reasoning::{ConceptBrief, DuplicateVerdict, EffortEstimates, NodeEffort, PathVerdict};
    use async_trait::async_trait;

    struct StubReasoner {
        response: Option<EffortEstimates>,
    }

    #[async_trait]
    impl ReasoningService for StubReasoner {
        async fn check_duplicate(
            &self,
            _candidate: &ConceptBrief,
            _existing: &[ConceptBrief],
        ) -> Result<DuplicateVerdict> {
            unimplemented!("not used in estimator tests")
        }

        async fn judge_path(&self, _from: &str, _to: &str) -> Result<PathVerdict> {
            unimplemented!("not used in estimator tests")
        }

        async fn estimate_effort(&self, _nodes: &[EstimateInput]) -> Result<EffortEstimates> {
            match &self.response {
                Some(r) => Ok(r.clone()),
                None => Err(Error::ReasonerError("stub failure".into())),
            }
        }
    }

    fn estimator(response: Option<EffortEstimates>) -> EffortEstimator {
        EffortEstimator::new(
            Arc::new(StubReasoner { response }),
            &ScheduleConfig {
                default_daily_hours: 2.0,
                fallback_hours_per_node: 2.0,
            },
        )
    }

    fn inputs(titles: &[&str]) -> Vec<EstimateInput> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| EstimateInput {
                id: format!("n{}", i),
                title: t.to_string(),
                description: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_estimates_applied_in_input_order() {
        let estimator = estimator(Some(EffortEstimates {
            nodes: vec![
                NodeEffort {
                    id: "n1".into(),
                    estimated_hours: 5.0,
                },
                NodeEffort {
                    id: "n0".into(),
                    estimated_hours: 3.0,
                },
            ],
            suggested_daily_hours: Some(4.0),
        }));

        let estimate = estimator.estimate(&inputs(&["Algebra", "Calculus"])).await.unwrap();
        assert_eq!(estimate.nodes[0].node_id, "n0");
        assert_eq!(estimate.nodes[0].estimated_hours, 3.0);
        assert_eq!(estimate.nodes[1].estimated_hours, 5.0);
        assert_eq!(estimate.total_hours, 8.0);
        assert_eq!(estimate.suggested_daily_hours, Some(4.0));
        assert!(!estimate.degraded);
    }

    #[tokio::test]
    async fn test_unavailable_service_uses_flat_fallback() {
        let estimator = estimator(None);
        let estimate = estimator.estimate(&inputs(&["A", "B", "C"])).await.unwrap();

        assert!(estimate.degraded);
        assert!(estimate.nodes.iter().all(|n| n.estimated_hours == 2.0));
        assert_eq!(estimate.total_hours, 6.0);
        assert!(estimate.suggested_daily_hours.is_none());
    }

    #[tokio::test]
    async fn test_skipped_and_nonsense_nodes_get_fallback() {
        let estimator = estimator(Some(EffortEstimates {
            nodes: vec![
                NodeEffort {
                    id: "n0".into(),
                    estimated_hours: -1.0,
                },
                // n1 missing entirely
            ],
            suggested_daily_hours: None,
        }));

        let estimate = estimator.estimate(&inputs(&["A", "B"])).await.unwrap();
        assert_eq!(estimate.nodes[0].estimated_hours, 2.0);
        assert_eq!(estimate.nodes[1].estimated_hours, 2.0);
        assert!(!estimate.degraded);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let estimator = estimator(None);
        let estimate = estimator.estimate(&[]).await.unwrap();
        assert!(estimate.nodes.is_empty());
        assert_eq!(estimate.total_hours, 0.0);
        assert!(!estimate.degraded);
    }
}
