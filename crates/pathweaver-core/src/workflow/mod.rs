//! Saved workflows - named path graphs persisted per topic

mod store;
mod types;

pub use store::WorkflowStore;
pub use types::Workflow;
