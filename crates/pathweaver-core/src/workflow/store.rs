//! Workflow persistence
//!
//! Workflows upsert whole: the graph's nodes and edges are serialized into
//! JSON columns on the row. Saving also bumps the usage counter of every
//! concept newly placed since the previous save.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::graph::{GraphEdge, GraphNode, PathGraph};

use super::types::Workflow;

/// Store for persisting and retrieving workflows
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    pool: SqlitePool,
}

impl WorkflowStore {
    /// Create a new workflow store with the given database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or update a workflow.
    ///
    /// Concepts placed since the last save get their usage counter bumped;
    /// removed placements do not decrement it.
    pub async fn save(&self, workflow: &Workflow) -> Result<()> {
        let previous: HashSet<String> = match self.get(&workflow.id).await? {
            Some(existing) => existing
                .graph
                .nodes()
                .iter()
                .map(|n| n.concept_id.clone())
                .collect(),
            None => HashSet::new(),
        };

        let nodes_json = serde_json::to_string(workflow.graph.nodes())
            .map_err(|e| Error::Other(format!("Failed to serialize nodes: {}", e)))?;
        let edges_json = serde_json::to_string(workflow.graph.edges())
            .map_err(|e| Error::Other(format!("Failed to serialize edges: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO workflows (
                id, topic_id, title, edges, node_positions, is_draft,
                implemented_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                edges = excluded.edges,
                node_positions = excluded.node_positions,
                is_draft = excluded.is_draft,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&workflow.id)
        .bind(&workflow.topic_id)
        .bind(&workflow.title)
        .bind(&edges_json)
        .bind(&nodes_json)
        .bind(workflow.is_draft)
        .bind(workflow.implemented_at.map(|t| t.to_rfc3339()))
        .bind(workflow.created_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        for node in workflow.graph.nodes() {
            if !previous.contains(&node.concept_id) {
                self.bump_usage(&node.concept_id).await?;
            }
        }

        info!(workflow_id = %workflow.id, title = %workflow.title, "Workflow saved");
        Ok(())
    }

    /// Get a workflow by ID
    pub async fn get(&self, id: &str) -> Result<Option<Workflow>> {
        let row: Option<WorkflowRow> = sqlx::query_as("SELECT * FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_workflow()).transpose()
    }

    /// List workflows for a topic, newest first. Drafts are excluded unless
    /// asked for.
    pub async fn list_for_topic(&self, topic_id: &str, include_drafts: bool) -> Result<Vec<Workflow>> {
        let query = if include_drafts {
            r#"
            SELECT * FROM workflows
            WHERE topic_id = ?
            ORDER BY updated_at DESC
            "#
        } else {
            r#"
            SELECT * FROM workflows
            WHERE topic_id = ? AND is_draft = 0
            ORDER BY updated_at DESC
            "#
        };

        let rows: Vec<WorkflowRow> = sqlx::query_as(query)
            .bind(topic_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_workflow()).collect()
    }

    /// Record that the workflow was published to the calendar.
    ///
    /// Fails with `AlreadyImplemented` if it has been published before.
    pub async fn mark_implemented(&self, id: &str) -> Result<DateTime<Utc>> {
        let workflow = self
            .get(id)
            .await?
            .ok_or_else(|| Error::WorkflowNotFound(id.to_string()))?;

        if workflow.implemented_at.is_some() {
            return Err(Error::AlreadyImplemented(workflow.title));
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE workflows
            SET implemented_at = ?, is_draft = 0, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        info!(workflow_id = %id, "Workflow marked implemented");
        Ok(now)
    }

    /// Delete a workflow. Returns false if no such workflow exists.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn bump_usage(&self, concept_id: &str) -> Result<()> {
        // Placements of since-deleted concepts are tolerated
        sqlx::query(
            r#"
            UPDATE concepts
            SET usage_count = usage_count + 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(concept_id)
        .execute(&self.pool)
        .await?;
        debug!(concept_id = %concept_id, "Usage bumped for new placement");
        Ok(())
    }
}

/// Raw database row for a workflow
#[derive(Debug, FromRow)]
struct WorkflowRow {
    id: String,
    topic_id: String,
    title: String,
    edges: String,
    node_positions: String,
    is_draft: bool,
    implemented_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl WorkflowRow {
    fn into_workflow(self) -> Result<Workflow> {
        let nodes: Vec<GraphNode> = serde_json::from_str(&self.node_positions)
            .map_err(|e| Error::Other(format!("Corrupt node data: {}", e)))?;
        let edges: Vec<GraphEdge> = serde_json::from_str(&self.edges)
            .map_err(|e| Error::Other(format!("Corrupt edge data: {}", e)))?;

        let mut graph = PathGraph::new();
        for node in nodes {
            graph.add_node(node.concept_id, node.title, node.position);
        }
        graph.restore_edges(edges);

        Ok(Workflow {
            id: self.id,
            topic_id: self.topic_id,
            title: self.title,
            graph,
            is_draft: self.is_draft,
            implemented_at: self
                .implemented_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("Invalid timestamp '{}': {}", s, e)))
}
