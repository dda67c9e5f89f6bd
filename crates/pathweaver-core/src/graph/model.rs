//! Path graph model
//!
//! In-memory directed graph of placed concepts and prerequisite edges.
//! Mutations are synchronous and optimistic: an added or reconnected edge
//! lands immediately in `Pending` state, and a verdict is applied later by
//! the session (if its generation still matches).
//!
//! Cycles are tolerated: the graph is advisory during editing, and the
//! scheduler degrades gracefully when ordering is impossible.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{EdgeStatus, EdgeValidation, GraphEdge, GraphNode, Position};

/// Directed prerequisite graph for one workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathGraph {
    /// Nodes in insertion order
    nodes: Vec<GraphNode>,
    /// Edges in insertion order
    edges: Vec<GraphEdge>,
}

impl PathGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Edges in insertion order
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Look up a node by concept id
    pub fn node(&self, concept_id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.concept_id == concept_id)
    }

    /// Look up an edge by id
    pub fn edge(&self, edge_id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == edge_id)
    }

    /// Place a concept in the graph. Placing an already-present concept is
    /// a no-op that keeps the existing placement.
    pub fn add_node(
        &mut self,
        concept_id: impl Into<String>,
        title: impl Into<String>,
        position: Position,
    ) -> bool {
        let concept_id = concept_id.into();
        if self.node(&concept_id).is_some() {
            debug!(concept_id = %concept_id, "Node already placed, ignoring");
            return false;
        }
        self.nodes.push(GraphNode {
            concept_id,
            title: title.into(),
            position,
        });
        true
    }

    /// Move a placed node
    pub fn set_position(&mut self, concept_id: &str, position: Position) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.concept_id == concept_id)
            .ok_or_else(|| Error::ConceptNotFound(concept_id.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// Add a directed edge between two placed concepts.
    ///
    /// Self-loops and duplicate ordered pairs are rejected. The reverse of
    /// an existing edge is a distinct pair and is allowed. The new edge
    /// starts pending; the caller is responsible for kicking off validation.
    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<&GraphEdge> {
        self.check_endpoints(source, target, None)?;
        self.edges.push(GraphEdge::new(source, target));
        debug!(source = %source, target = %target, "Edge added, pending validation");
        Ok(self.edges.last().expect("edge just pushed"))
    }

    /// Reconnect an existing edge to new endpoints.
    ///
    /// Any previous verdict is discarded: the edge returns to pending and
    /// its generation is bumped so an in-flight verdict for the old
    /// endpoints cannot land on it.
    pub fn update_edge_endpoints(
        &mut self,
        edge_id: &str,
        source: &str,
        target: &str,
    ) -> Result<&GraphEdge> {
        self.check_endpoints(source, target, Some(edge_id))?;
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.id == edge_id)
            .ok_or_else(|| Error::InvalidInput(format!("No edge with id '{}'", edge_id)))?;

        edge.source = source.to_string();
        edge.target = target.to_string();
        edge.validation.reset();
        edge.generation += 1;
        debug!(edge_id = %edge_id, generation = edge.generation, "Edge reconnected, re-pending");
        Ok(&*edge)
    }

    /// Remove an edge. Returns false if no such edge exists.
    pub fn remove_edge(&mut self, edge_id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != edge_id);
        self.edges.len() != before
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, concept_id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.concept_id != concept_id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges
            .retain(|e| e.source != concept_id && e.target != concept_id);
        true
    }

    /// Restore previously serialized edges verbatim, keeping their ids,
    /// validation state, and generation
    pub fn restore_edges(&mut self, edges: Vec<GraphEdge>) {
        self.edges = edges;
    }

    /// Apply an async verdict to an edge, if the edge still exists and its
    /// generation matches the one the verdict was computed for. Returns
    /// whether the verdict was applied.
    pub fn apply_verdict(
        &mut self,
        edge_id: &str,
        generation: u64,
        validation: EdgeValidation,
    ) -> bool {
        let Some(edge) = self.edges.iter_mut().find(|e| e.id == edge_id) else {
            debug!(edge_id = %edge_id, "Verdict for removed edge, discarding");
            return false;
        };
        if edge.generation != generation {
            debug!(
                edge_id = %edge_id,
                expected = edge.generation,
                got = generation,
                "Stale verdict, discarding"
            );
            return false;
        }
        edge.validation = validation;
        true
    }

    /// Count edges by status
    pub fn count_status(&self, status: EdgeStatus) -> usize {
        self.edges
            .iter()
            .filter(|e| e.validation.status == status)
            .count()
    }

    fn check_endpoints(&self, source: &str, target: &str, exclude: Option<&str>) -> Result<()> {
        if source == target {
            return Err(Error::InvalidInput(
                "An edge cannot connect a concept to itself".to_string(),
            ));
        }
        if self.node(source).is_none() {
            return Err(Error::ConceptNotFound(source.to_string()));
        }
        if self.node(target).is_none() {
            return Err(Error::ConceptNotFound(target.to_string()));
        }
        let duplicate = self.edges.iter().any(|e| {
            e.source == source && e.target == target && Some(e.id.as_str()) != exclude
        });
        if duplicate {
            return Err(Error::InvalidInput(format!(
                "An edge from '{}' to '{}' already exists",
                source, target
            )));
        }
        Ok(())
    }

    /// Topological order of node concept ids, prerequisites first.
    ///
    /// Kahn's algorithm with insertion order as the tie-break, so unrelated
    /// nodes keep the order they were placed in and the result is stable.
    /// If the graph is cyclic, the unorderable remainder is appended in
    /// insertion order and the cycle is reported alongside.
    pub fn topological_order(&self) -> (Vec<String>, Option<Vec<String>>) {
        let mut in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|n| (n.concept_id.as_str(), 0))
            .collect();
        for edge in &self.edges {
            if let Some(d) = in_degree.get_mut(edge.target.as_str()) {
                *d += 1;
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut placed: HashMap<&str, bool> =
            self.nodes.iter().map(|n| (n.concept_id.as_str(), false)).collect();

        // Scan the insertion-ordered node list each round; graphs here are
        // editor-sized, so the quadratic scan is fine and keeps ties stable.
        loop {
            let next = self.nodes.iter().find(|n| {
                !placed[n.concept_id.as_str()] && in_degree[n.concept_id.as_str()] == 0
            });
            let Some(node) = next else { break };

            placed.insert(node.concept_id.as_str(), true);
            order.push(node.concept_id.clone());
            for edge in &self.edges {
                if edge.source == node.concept_id
                    && let Some(d) = in_degree.get_mut(edge.target.as_str())
                {
                    *d -= 1;
                }
            }
        }

        if order.len() == self.nodes.len() {
            return (order, None);
        }

        // Remainder is cyclic: fall back to insertion order for those nodes
        for node in &self.nodes {
            if !placed[node.concept_id.as_str()] {
                order.push(node.concept_id.clone());
            }
        }
        (order, self.find_cycle())
    }

    /// Find one cycle, as the titles of the nodes along it.
    ///
    /// DFS with three-color marking; the cycle is recovered from the stack
    /// slice between the revisited node and the top.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }

        let mut marks: HashMap<&str, Mark> = self
            .nodes
            .iter()
            .map(|n| (n.concept_id.as_str(), Mark::White))
            .collect();
        let mut stack: Vec<&str> = Vec::new();

        fn visit<'a>(
            graph: &'a PathGraph,
            id: &'a str,
            marks: &mut HashMap<&'a str, Mark>,
            stack: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            marks.insert(id, Mark::Gray);
            stack.push(id);

            for edge in &graph.edges {
                if edge.source != id {
                    continue;
                }
                let next = edge.target.as_str();
                match marks.get(next).copied() {
                    Some(Mark::White) => {
                        if let Some(cycle) = visit(graph, next, marks, stack) {
                            return Some(cycle);
                        }
                    }
                    Some(Mark::Gray) => {
                        let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                        let titles = stack[start..]
                            .iter()
                            .map(|&cid| {
                                graph
                                    .node(cid)
                                    .map(|n| n.title.clone())
                                    .unwrap_or_else(|| cid.to_string())
                            })
                            .collect();
                        return Some(titles);
                    }
                    _ => {}
                }
            }

            stack.pop();
            marks.insert(id, Mark::Black);
            None
        }

        for node in &self.nodes {
            let id = node.concept_id.as_str();
            if marks[id] == Mark::White
                && let Some(cycle) = visit(self, id, &mut marks, &mut stack)
            {
                return Some(cycle);
            }
        }
        None
    }
}
