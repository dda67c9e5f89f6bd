//! Wire types for the JSON surface
//!
//! Field names here are part of the external contract and mix snake_case
//! and camelCase; the renames are deliberate, do not tidy them.

use serde::{Deserialize, Serialize};

use crate::catalog::Concept;
use crate::graph::Position;
use crate::schedule::{Estimate, Schedule};
use crate::workflow::Workflow;

fn default_true() -> bool {
    true
}

/// `POST /nodes` request
#[derive(Debug, Deserialize)]
pub struct CreateNodeRequest {
    pub topic_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `POST /nodes` response: the created concept, or the duplicate it clashed
/// with
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CreateNodeResponse {
    Duplicate {
        #[serde(rename = "isDuplicate")]
        is_duplicate: bool,
        reason: String,
        #[serde(rename = "similarNode")]
        similar_node: Concept,
    },
    Created(Concept),
}

/// `POST /validate-path` request; node fields carry concept titles
#[derive(Debug, Deserialize)]
pub struct ValidatePathRequest {
    pub from_node: String,
    pub to_node: String,
}

/// `POST /validate-path` response
#[derive(Debug, Serialize)]
pub struct ValidatePathResponse {
    pub success: bool,
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(rename = "fromDatabase")]
    pub from_database: bool,
}

/// One node submitted to `POST /estimate-nodes`
#[derive(Debug, Deserialize)]
pub struct EstimateNodeRequest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// `POST /estimate-nodes` request
#[derive(Debug, Deserialize)]
pub struct EstimateNodesRequest {
    pub nodes: Vec<EstimateNodeRequest>,
}

/// Per-node entry in an estimate response
#[derive(Debug, Serialize)]
pub struct EstimatedNodeResponse {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "nodeTitle")]
    pub node_title: String,
    #[serde(rename = "estimatedHours")]
    pub estimated_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Schedule-shaped estimate, shared by both estimate endpoints
#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    #[serde(rename = "totalHours")]
    pub total_hours: f64,
    #[serde(rename = "suggestedDailyHours")]
    pub suggested_daily_hours: f64,
    #[serde(rename = "totalDays")]
    pub total_days: u32,
    #[serde(rename = "perNode")]
    pub per_node: Vec<EstimatedNodeResponse>,
}

impl EstimateResponse {
    /// Shape an estimate for the wire, filling in the configured daily pace
    /// when the service did not suggest one
    pub fn from_estimate(estimate: Estimate, default_daily_hours: f64) -> Self {
        let daily = estimate
            .suggested_daily_hours
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(default_daily_hours);
        let total_days = if estimate.total_hours > 0.0 {
            (estimate.total_hours / daily).ceil() as u32
        } else {
            0
        };
        Self {
            total_hours: estimate.total_hours,
            suggested_daily_hours: daily,
            total_days,
            per_node: estimate
                .nodes
                .into_iter()
                .map(|n| EstimatedNodeResponse {
                    node_id: n.node_id,
                    node_title: n.node_title,
                    estimated_hours: n.estimated_hours,
                    description: n.description,
                })
                .collect(),
        }
    }
}

/// `POST /workflows/{id}/implement` request
#[derive(Debug, Deserialize)]
pub struct ImplementWorkflowRequest {
    pub supabase_token: String,
    /// `YYYY-MM-DD`; defaults to today
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub daily_hours: Option<f64>,
}

/// `POST /workflows/{id}/implement` response
#[derive(Debug, Serialize)]
pub struct ImplementWorkflowResponse {
    pub success: bool,
    pub created_count: usize,
    pub total_days: u32,
    /// Set when scheduling fell back to placement order on a cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ImplementWorkflowResponse {
    pub fn new(created_count: usize, schedule: &Schedule) -> Self {
        Self {
            success: true,
            created_count,
            total_days: schedule.total_days,
            warning: schedule
                .cycle
                .as_ref()
                .map(|titles| crate::error::Error::CyclicGraph(titles.clone()).to_string()),
        }
    }
}

/// Node entry in `POST /workflows`
#[derive(Debug, Deserialize)]
pub struct WorkflowNodeRequest {
    pub concept_id: String,
    pub title: String,
    #[serde(default)]
    pub position: Position,
}

/// Edge entry in `POST /workflows`
#[derive(Debug, Deserialize)]
pub struct WorkflowEdgeRequest {
    pub source: String,
    pub target: String,
}

/// `POST /workflows` request
#[derive(Debug, Deserialize)]
pub struct SaveWorkflowRequest {
    /// Updates the existing workflow when present
    #[serde(default)]
    pub id: Option<String>,
    pub topic_id: String,
    pub title: String,
    #[serde(default)]
    pub nodes: Vec<WorkflowNodeRequest>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdgeRequest>,
    #[serde(default = "default_true")]
    pub is_draft: bool,
}

/// Workflow as returned by the workflow endpoints
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub topic_id: String,
    pub title: String,
    pub is_draft: bool,
    pub implemented_at: Option<String>,
    pub nodes: Vec<serde_json::Value>,
    pub edges: Vec<serde_json::Value>,
}

impl WorkflowResponse {
    pub fn from_workflow(workflow: &Workflow) -> crate::error::Result<Self> {
        let serialize_all = |items: Vec<serde_json::Result<serde_json::Value>>| {
            items
                .into_iter()
                .collect::<serde_json::Result<Vec<_>>>()
                .map_err(|e| crate::error::Error::Other(format!("Serialization failed: {}", e)))
        };
        let nodes = serialize_all(
            workflow.graph.nodes().iter().map(serde_json::to_value).collect(),
        )?;
        let edges = serialize_all(
            workflow.graph.edges().iter().map(serde_json::to_value).collect(),
        )?;
        Ok(Self {
            id: workflow.id.clone(),
            topic_id: workflow.topic_id.clone(),
            title: workflow.title.clone(),
            is_draft: workflow.is_draft,
            implemented_at: workflow.implemented_at.map(|t| t.to_rfc3339()),
            nodes,
            edges,
        })
    }
}
