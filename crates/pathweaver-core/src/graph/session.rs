//! Editing session over a path graph
//!
//! Wraps the graph in a shared lock and runs edge validation out of band:
//! every add or reconnect returns immediately with the edge pending, and a
//! detached task fetches the verdict and applies it afterwards. The edge's
//! generation at spawn time travels with the task, so a verdict computed for
//! endpoints that have since changed is silently dropped.
//!
//! This is the seam for interactive editing front ends that mutate a live
//! graph. The shipped HTTP surface and CLI validate synchronously through
//! [`EdgeValidationEngine`] instead, so neither constructs a session.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Result;
use crate::validation::EdgeValidationEngine;

use super::model::PathGraph;
use super::types::{GraphEdge, Position};

/// Shared, concurrently-validated graph
#[derive(Clone)]
pub struct GraphSession {
    graph: Arc<Mutex<PathGraph>>,
    engine: Arc<EdgeValidationEngine>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl GraphSession {
    pub fn new(graph: PathGraph, engine: Arc<EdgeValidationEngine>) -> Self {
        Self {
            graph: Arc::new(Mutex::new(graph)),
            engine,
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Place a concept. Returns whether a new node was added.
    pub async fn add_node(
        &self,
        concept_id: impl Into<String>,
        title: impl Into<String>,
        position: Position,
    ) -> bool {
        self.graph.lock().await.add_node(concept_id, title, position)
    }

    /// Move a placed node
    pub async fn set_position(&self, concept_id: &str, position: Position) -> Result<()> {
        self.graph.lock().await.set_position(concept_id, position)
    }

    /// Add an edge and kick off its validation. Returns the pending edge.
    pub async fn add_edge(&self, source: &str, target: &str) -> Result<GraphEdge> {
        let mut graph = self.graph.lock().await;
        let edge = graph.add_edge(source, target)?.clone();
        let (from_title, to_title) = self.edge_titles(&graph, &edge);
        drop(graph);

        self.spawn_validation(edge.id.clone(), edge.generation, from_title, to_title)
            .await;
        Ok(edge)
    }

    /// Reconnect an edge and kick off validation of the new pair
    pub async fn reconnect_edge(
        &self,
        edge_id: &str,
        source: &str,
        target: &str,
    ) -> Result<GraphEdge> {
        let mut graph = self.graph.lock().await;
        let edge = graph.update_edge_endpoints(edge_id, source, target)?.clone();
        let (from_title, to_title) = self.edge_titles(&graph, &edge);
        drop(graph);

        self.spawn_validation(edge.id.clone(), edge.generation, from_title, to_title)
            .await;
        Ok(edge)
    }

    /// Remove an edge
    pub async fn remove_edge(&self, edge_id: &str) -> bool {
        self.graph.lock().await.remove_edge(edge_id)
    }

    /// Remove a node and its edges
    pub async fn remove_node(&self, concept_id: &str) -> bool {
        self.graph.lock().await.remove_node(concept_id)
    }

    /// Snapshot of the current graph state
    pub async fn snapshot(&self) -> PathGraph {
        self.graph.lock().await.clone()
    }

    /// Wait for every validation task spawned so far to finish
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for handle in handles {
            if handle.await.is_err() {
                debug!("Validation task panicked");
            }
        }
    }

    fn edge_titles(&self, graph: &PathGraph, edge: &GraphEdge) -> (String, String) {
        let title_of = |id: &str| {
            graph
                .node(id)
                .map(|n| n.title.clone())
                .unwrap_or_else(|| id.to_string())
        };
        (title_of(&edge.source), title_of(&edge.target))
    }

    async fn spawn_validation(
        &self,
        edge_id: String,
        generation: u64,
        from_title: String,
        to_title: String,
    ) {
        let graph = self.graph.clone();
        let engine = self.engine.clone();

        let handle = tokio::spawn(async move {
            match engine.validate(&from_title, &to_title).await {
                Ok(outcome) => {
                    let applied = graph
                        .lock()
                        .await
                        .apply_verdict(&edge_id, generation, outcome.validation);
                    debug!(edge_id = %edge_id, applied, from_cache = outcome.from_cache, "Verdict processed");
                }
                Err(e) => {
                    // Cache I/O failure; the edge simply stays pending
                    debug!(edge_id = %edge_id, error = %e, "Validation task failed");
                }
            }
        });
        self.tasks.lock().await.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::error::Error;
    use crate::graph::EdgeStatus;
    use crate::reasoning::{
        ConceptBrief, DuplicateVerdict, EffortEstimates, EstimateInput, PathVerdict,
        ReasoningService,
    };
    use crate::storage::Database;
    use crate::validation::ValidationCache;
    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    /// Scripted path judge; optionally holds every call until released
    struct StubReasoner {
        is_valid: bool,
        fail: bool,
        gate: Option<Arc<Semaphore>>,
    }

    impl StubReasoner {
        fn valid() -> Self {
            Self {
                is_valid: true,
                fail: false,
                gate: None,
            }
        }

        fn invalid() -> Self {
            Self {
                is_valid: false,
                fail: false,
                gate: None,
            }
        }

        fn failing() -> Self {
            Self {
                is_valid: false,
                fail: true,
                gate: None,
            }
        }

        fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                is_valid: false,
                fail: false,
                gate: Some(gate),
            }
        }
    }

    #[async_trait]
    impl ReasoningService for StubReasoner {
        async fn check_duplicate(
            &self,
            _candidate: &ConceptBrief,
            _existing: &[ConceptBrief],
        ) -> Result<DuplicateVerdict> {
            unimplemented!("not used in session tests")
        }

        async fn judge_path(&self, from: &str, _to: &str) -> Result<PathVerdict> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            if self.fail {
                return Err(Error::ReasonerError("stub failure".into()));
            }
            Ok(PathVerdict {
                is_valid: self.is_valid,
                reason: format!("judged from {}", from),
                recommendation: None,
            })
        }

        async fn estimate_effort(&self, _nodes: &[EstimateInput]) -> Result<EffortEstimates> {
            unimplemented!("not used in session tests")
        }
    }

    async fn session(reasoner: StubReasoner) -> GraphSession {
        let db = Database::in_memory().await.expect("in-memory db");
        let engine = EdgeValidationEngine::new(
            ValidationCache::new(db.pool().clone()),
            Arc::new(reasoner),
            &ValidationConfig { fail_open: true },
        );
        let mut graph = PathGraph::new();
        graph.add_node("a", "Algebra", Position::default());
        graph.add_node("b", "Calculus", Position::default());
        graph.add_node("c", "Topology", Position::default());
        GraphSession::new(graph, Arc::new(engine))
    }

    #[tokio::test]
    async fn test_edge_returns_pending_then_settles_valid() {
        let session = session(StubReasoner::valid()).await;

        let edge = session.add_edge("a", "b").await.unwrap();
        assert_eq!(edge.validation.status, EdgeStatus::Pending);

        session.flush().await;
        let graph = session.snapshot().await;
        assert_eq!(
            graph.edge(&edge.id).unwrap().validation.status,
            EdgeStatus::Valid
        );
    }

    #[tokio::test]
    async fn test_invalid_edge_stays_in_graph() {
        let session = session(StubReasoner::invalid()).await;

        let edge = session.add_edge("b", "a").await.unwrap();
        session.flush().await;

        let graph = session.snapshot().await;
        let edge = graph.edge(&edge.id).unwrap();
        assert_eq!(edge.validation.status, EdgeStatus::Invalid);
        // Advisory: the edge was not removed
        assert_eq!(graph.edges().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_service_fails_open() {
        let session = session(StubReasoner::failing()).await;

        let edge = session.add_edge("a", "b").await.unwrap();
        session.flush().await;

        let graph = session.snapshot().await;
        let validation = &graph.edge(&edge.id).unwrap().validation;
        assert_eq!(validation.status, EdgeStatus::Valid);
        assert_eq!(
            validation.reason.as_deref(),
            Some(crate::validation::UNAVAILABLE_REASON)
        );
    }

    #[tokio::test]
    async fn test_reconnect_during_flight_drops_stale_verdict() {
        let gate = Arc::new(Semaphore::new(0));
        let session = session(StubReasoner::gated(gate.clone())).await;

        let edge = session.add_edge("a", "b").await.unwrap();
        // Reconnect while the first verdict is still in flight
        session.reconnect_edge(&edge.id, "a", "c").await.unwrap();

        // Release both in-flight judgements
        gate.add_permits(2);
        session.flush().await;

        let graph = session.snapshot().await;
        let edge = graph.edge(&edge.id).unwrap();
        assert_eq!(edge.generation, 1);
        assert_eq!(edge.target, "c");
        // The second verdict (generation 1) applied; had the stale one won,
        // the status would reflect the old pair's judgement order
        assert_eq!(edge.validation.status, EdgeStatus::Invalid);
    }

    #[tokio::test]
    async fn test_verdict_for_removed_edge_is_dropped() {
        let gate = Arc::new(Semaphore::new(0));
        let session = session(StubReasoner::gated(gate.clone())).await;

        let edge = session.add_edge("a", "b").await.unwrap();
        session.remove_edge(&edge.id).await;

        gate.add_permits(1);
        session.flush().await;

        let graph = session.snapshot().await;
        assert!(graph.edge(&edge.id).is_none());
        assert!(graph.edges().is_empty());
    }
}
