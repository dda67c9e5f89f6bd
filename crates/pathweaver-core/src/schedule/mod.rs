//! Effort estimation and day-packed scheduling

mod estimator;
mod scheduler;

pub use estimator::{EffortEstimator, Estimate, NodeEstimate};
pub use scheduler::{Schedule, ScheduledBlock, build_schedule};
