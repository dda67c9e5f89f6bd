//! Workflow data model
//!
//! A workflow is a named, persisted path graph for a topic. The graph's
//! nodes and edges are embedded in the workflow row as JSON; concepts
//! themselves stay in the catalog and are referenced by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::PathGraph;

/// A saved learning-path workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub topic_id: String,
    pub title: String,
    pub graph: PathGraph,
    /// Drafts are hidden from default listings
    pub is_draft: bool,
    /// Set once the workflow has been published to the calendar
    pub implemented_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Create a new draft workflow with an empty graph
    pub fn new(topic_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            topic_id: topic_id.into(),
            title: title.into(),
            graph: PathGraph::new(),
            is_draft: true,
            implemented_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a graph
    pub fn with_graph(mut self, graph: PathGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Mark as ready (not a draft)
    pub fn published(mut self) -> Self {
        self.is_draft = false;
        self
    }

    /// Whether this workflow has already been pushed to the calendar
    pub fn is_implemented(&self) -> bool {
        self.implemented_at.is_some()
    }
}
