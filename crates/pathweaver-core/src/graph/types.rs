//! Graph node and edge types
//!
//! A `GraphNode` is a placement of a concept inside one workflow graph,
//! carrying layout position. A `GraphEdge` is a directed prerequisite
//! relation between two placed concepts, carrying its validation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 2-D layout position of a node in the editor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Validation status of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    /// Awaiting a verdict
    #[default]
    Pending,
    /// Judged pedagogically sound (or fail-open)
    Valid,
    /// Judged unsound; advisory, the edge stays in the graph
    Invalid,
}

impl EdgeStatus {
    /// Convert to string for storage/serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeStatus::Pending => "pending",
            EdgeStatus::Valid => "valid",
            EdgeStatus::Invalid => "invalid",
        }
    }

    /// Parse from a stored string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EdgeStatus::Pending),
            "valid" => Some(EdgeStatus::Valid),
            "invalid" => Some(EdgeStatus::Invalid),
            _ => None,
        }
    }
}

/// Validation state carried by an edge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeValidation {
    pub status: EdgeStatus,
    pub reason: Option<String>,
    pub recommendation: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl EdgeValidation {
    /// Reset to pending, clearing any previous verdict
    pub fn reset(&mut self) {
        *self = EdgeValidation::default();
    }
}

/// A concept placed in a workflow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// The referenced concept
    pub concept_id: String,
    /// Concept title at placement time (used as the validation cache key)
    pub title: String,
    /// Layout position
    pub position: Position,
}

/// A directed prerequisite edge: source must be learned before target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    /// Concept id of the prerequisite
    pub source: String,
    /// Concept id of the dependent concept
    pub target: String,
    pub validation: EdgeValidation,
    /// Bumped on reconnection; stale async verdicts carry the old value
    /// and are discarded.
    pub generation: u64,
}

impl GraphEdge {
    /// Create a new pending edge
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            target: target.into(),
            validation: EdgeValidation::default(),
            generation: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_status_roundtrip() {
        for status in [EdgeStatus::Pending, EdgeStatus::Valid, EdgeStatus::Invalid] {
            assert_eq!(EdgeStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EdgeStatus::parse("bogus"), None);
    }

    #[test]
    fn test_new_edge_is_pending() {
        let edge = GraphEdge::new("a", "b");
        assert_eq!(edge.validation.status, EdgeStatus::Pending);
        assert_eq!(edge.generation, 0);
        assert!(edge.validation.validated_at.is_none());
    }

    #[test]
    fn test_validation_reset() {
        let mut validation = EdgeValidation {
            status: EdgeStatus::Invalid,
            reason: Some("reversed".into()),
            recommendation: Some("swap".into()),
            validated_at: Some(Utc::now()),
        };
        validation.reset();
        assert_eq!(validation.status, EdgeStatus::Pending);
        assert!(validation.reason.is_none());
    }
}
