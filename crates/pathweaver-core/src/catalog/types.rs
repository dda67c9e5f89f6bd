//! Concept data model
//!
//! A concept is a named learning topic or skill, the vertex type of every
//! path graph. Concepts are owned by the catalog, scoped to a topic, and
//! referenced (never duplicated) by workflows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named learning concept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// Unique identifier
    pub id: String,
    /// Topic this concept belongs to
    pub topic_id: String,
    /// Display title (original casing preserved)
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Icon name for rendering
    pub icon: String,
    /// Display color
    pub color: String,
    /// Number of saved workflows this concept has been placed into
    pub usage_count: i64,
    /// When the concept was created
    pub created_at: DateTime<Utc>,
    /// When the concept was last updated
    pub updated_at: DateTime<Utc>,
}

impl Concept {
    /// Create a new concept with zero usage
    pub fn new(topic_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            topic_id: topic_id.into(),
            title: title.into(),
            description: None,
            icon: String::new(),
            color: String::new(),
            usage_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the icon
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Set the color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Normalized form of this concept's title
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Normalize a title for comparison: trim and casefold.
///
/// Comparison only; the stored title keeps its original casing.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
