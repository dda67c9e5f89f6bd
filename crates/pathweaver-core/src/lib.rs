//! Pathweaver Core Library
//!
//! This crate provides the core functionality for Pathweaver, including:
//! - Concept catalog with semantic duplicate detection
//! - Prerequisite graphs with async per-edge validation
//! - Durable validation verdict cache
//! - Effort estimation and day-packed scheduling
//! - Calendar publishing
//! - Reasoning service integration (OpenRouter API)
//! - Saved workflows (SQLite persistence)

pub mod api;
pub mod calendar;
pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod reasoning;
pub mod schedule;
pub mod storage;
pub mod validation;
pub mod workflow;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::storage::Database;
}
