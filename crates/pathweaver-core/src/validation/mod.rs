//! Prerequisite validation - durable cache plus the cache-first engine

mod cache;
mod engine;

pub use cache::{CachedVerdict, ValidationCache};
pub use engine::{EdgeValidationEngine, UNAVAILABLE_REASON, ValidationOutcome};
