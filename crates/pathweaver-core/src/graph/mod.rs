//! Prerequisite graph - model, ordering, and the concurrently-validated session

mod model;
mod session;
mod types;

pub use model::PathGraph;
pub use session::GraphSession;
pub use types::{EdgeStatus, EdgeValidation, GraphEdge, GraphNode, Position};
