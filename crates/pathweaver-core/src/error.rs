//! Error types for Pathweaver

use thiserror::Error;

use crate::catalog::Concept;

/// Result type alias using Pathweaver's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Pathweaver error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Concept errors (E001-E099)
    #[error("Concept '{0}' not found. Run `pathweaver concepts list <topic>` to see all concepts.")]
    ConceptNotFound(String),

    #[error("Duplicate concept: {reason}. Reuse '{}' instead of creating a new concept.", existing.title)]
    DuplicateConcept {
        reason: String,
        existing: Box<Concept>,
    },

    // Workflow errors (E100-E199)
    #[error("Workflow '{0}' not found. Run `pathweaver workflows list` to see all workflows.")]
    WorkflowNotFound(String),

    #[error("Workflow '{0}' has already been implemented to the calendar.")]
    AlreadyImplemented(String),

    // Network errors (E200-E299)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Reasoning service error: {0}. Check your API key with `pathweaver config get llm.api_key`.")]
    ReasonerError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    // Scheduling errors (E400-E499)
    #[error("Prerequisite cycle detected involving: {}", .0.join(" -> "))]
    CyclicGraph(Vec<String>),

    // Calendar errors (E500-E599)
    #[error("Calendar authorization required or expired. Re-authenticate with calendar-write scope.")]
    AuthRequired,

    #[error("Partial publish: {created_count} events created before failing at {failed_at}.")]
    PartialPublish {
        created_count: usize,
        failed_at: String,
    },

    // Database errors (E600-E699)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Config errors (E700-E799)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConceptNotFound(_) => "E001",
            Self::DuplicateConcept { .. } => "E002",
            Self::WorkflowNotFound(_) => "E100",
            Self::AlreadyImplemented(_) => "E101",
            Self::NetworkError(_) => "E200",
            Self::ReasonerError(_) => "E201",
            Self::RateLimited(_) => "E202",
            Self::CyclicGraph(_) => "E400",
            Self::AuthRequired => "E500",
            Self::PartialPublish { .. } => "E501",
            Self::DatabaseError(_) => "E600",
            Self::ConfigError(_) => "E700",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ConceptNotFound(_) => Some("pathweaver concepts list <topic>".to_string()),
            Self::DuplicateConcept { existing, .. } => {
                Some(format!("Reuse existing concept '{}'", existing.title))
            }
            Self::WorkflowNotFound(_) => Some("pathweaver workflows list".to_string()),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::ReasonerError(_) => Some("pathweaver config get llm.api_key".to_string()),
            Self::AuthRequired => {
                Some("Re-run the calendar consent flow to obtain a fresh token".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Concept;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::ConceptNotFound("x".into()).code(), "E001");
        assert_eq!(Error::AuthRequired.code(), "E500");
        assert_eq!(
            Error::PartialPublish {
                created_count: 2,
                failed_at: "2026-01-03".into()
            }
            .code(),
            "E501"
        );
        assert_eq!(Error::InvalidInput("bad".into()).code(), "E800");
    }

    #[test]
    fn test_duplicate_concept_message_names_existing() {
        let existing = Concept::new("topic-1", "Linear Algebra");
        let err = Error::DuplicateConcept {
            reason: "semantically identical".into(),
            existing: Box::new(existing),
        };
        let msg = err.to_string();
        assert!(msg.contains("Linear Algebra"));
        assert!(err.suggestion().unwrap().contains("Linear Algebra"));
    }

    #[test]
    fn test_partial_publish_message() {
        let err = Error::PartialPublish {
            created_count: 3,
            failed_at: "2026-02-10".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 events created"));
        assert!(msg.contains("2026-02-10"));
    }

    #[test]
    fn test_cyclic_graph_message() {
        let err = Error::CyclicGraph(vec!["Algebra".into(), "Calculus".into(), "Algebra".into()]);
        assert!(err.to_string().contains("Algebra -> Calculus -> Algebra"));
    }
}
