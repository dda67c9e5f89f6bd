//! Day-packing scheduler
//!
//! Pure function from a graph, per-node estimates, a start date, and a daily
//! study budget to a sequence of study blocks. Nodes are laid out in
//! topological order and packed greedily: a node is atomic (one block,
//! never split), and a node larger than the remaining capacity of a day
//! simply starts on that day and spills into the next ones. The block's
//! date is the day the node starts.
//!
//! The total hours across blocks always equals the total estimated hours;
//! packing never stretches or drops work.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::graph::PathGraph;

use super::estimator::Estimate;

/// One study block: a node placed on its starting day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledBlock {
    pub date: NaiveDate,
    pub node_id: String,
    pub node_title: String,
    pub hours: f64,
}

/// A packed study plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub start_date: NaiveDate,
    pub daily_hours: f64,
    pub blocks: Vec<ScheduledBlock>,
    pub total_hours: f64,
    /// Calendar days the plan spans, counting partially filled ones
    pub total_days: u32,
    /// Titles along a prerequisite cycle, when ordering was impossible and
    /// insertion order was used instead
    pub cycle: Option<Vec<String>>,
}

/// Pack the graph's nodes into daily study blocks
pub fn build_schedule(
    graph: &PathGraph,
    estimate: &Estimate,
    start_date: NaiveDate,
    daily_hours: f64,
) -> Result<Schedule> {
    if !daily_hours.is_finite() || daily_hours <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "Daily hours must be positive, got {}",
            daily_hours
        )));
    }

    let (order, cycle) = graph.topological_order();
    if let Some(titles) = &cycle {
        warn!(cycle = %titles.join(" -> "), "Prerequisite cycle, scheduling in placement order");
    }

    let mut blocks = Vec::with_capacity(order.len());
    // Cumulative hours consumed; a node starts on the day this lands in
    let mut consumed = 0.0_f64;

    for node_id in &order {
        let Some(node) = graph.node(node_id) else {
            continue;
        };
        let hours = match estimate.hours_for(node_id) {
            Some(h) => h,
            None => {
                debug!(node_id = %node_id, "Node missing from estimate, skipping");
                continue;
            }
        };

        let day_offset = (consumed / daily_hours).floor() as i64;
        blocks.push(ScheduledBlock {
            date: start_date + Duration::days(day_offset),
            node_id: node.concept_id.clone(),
            node_title: node.title.clone(),
            hours,
        });
        consumed += hours;
    }

    let total_hours: f64 = blocks.iter().map(|b| b.hours).sum();
    let total_days = (total_hours / daily_hours).ceil() as u32;

    Ok(Schedule {
        start_date,
        daily_hours,
        blocks,
        total_hours,
        total_days,
        cycle,
    })
}
