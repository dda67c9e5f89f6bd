//! Concept catalog - creation with semantic duplicate gate
//!
//! The catalog owns concepts per topic and guards creation: a candidate is
//! first compared by normalized title against the existing set (cheap, local,
//! always caught), then submitted to the reasoning service for a semantic
//! duplicate check. A duplicate verdict blocks creation and names the
//! existing concept to reuse.
//!
//! Reasoning-service failures during the duplicate check propagate: creation
//! is blocked rather than guessed. This is the one call site where the
//! service failure is not recovered locally.

mod store;
mod types;

pub use store::ConceptStore;
pub use types::{Concept, normalize_title};

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::reasoning::{ConceptBrief, ReasoningService};

/// Catalog service: duplicate-gated concept creation plus lookups
#[derive(Clone)]
pub struct ConceptCatalog {
    store: ConceptStore,
    reasoner: Arc<dyn ReasoningService>,
}

/// What to create when the gate clears
#[derive(Debug, Clone)]
pub struct ConceptDraft {
    pub topic_id: String,
    pub title: String,
    pub description: Option<String>,
    pub icon: String,
    pub color: String,
}

impl ConceptCatalog {
    /// Create a catalog over a store and a reasoning service
    pub fn new(store: ConceptStore, reasoner: Arc<dyn ReasoningService>) -> Self {
        Self { store, reasoner }
    }

    /// Access the underlying store
    pub fn store(&self) -> &ConceptStore {
        &self.store
    }

    /// Create a concept, rejecting semantic duplicates.
    ///
    /// Exact normalized-title matches are rejected locally without a
    /// reasoning call, so round-trip identity is always caught regardless of
    /// the semantic model's fuzziness.
    pub async fn create(&self, draft: ConceptDraft) -> Result<Concept> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Concept title is empty".to_string()));
        }

        let existing = self.store.list_for_topic(&draft.topic_id).await?;

        let normalized = normalize_title(title);
        if let Some(same) = existing
            .iter()
            .find(|c| c.normalized_title() == normalized)
        {
            info!(title = %title, existing = %same.title, "Exact title match, creation blocked");
            return Err(Error::DuplicateConcept {
                reason: format!("A concept titled '{}' already exists", same.title),
                existing: Box::new(same.clone()),
            });
        }

        if !existing.is_empty() {
            let candidate = ConceptBrief::new(title, draft.description.clone());
            let briefs: Vec<ConceptBrief> = existing
                .iter()
                .map(|c| ConceptBrief::new(&c.title, c.description.clone()))
                .collect();

            let verdict = self.reasoner.check_duplicate(&candidate, &briefs).await?;

            if verdict.is_duplicate {
                let matched = verdict
                    .matched_title
                    .as_deref()
                    .and_then(|m| {
                        let norm = normalize_title(m);
                        existing.iter().find(|c| c.normalized_title() == norm)
                    })
                    .or_else(|| {
                        warn!("Duplicate verdict without a resolvable match, using first concept");
                        existing.first()
                    });

                if let Some(matched) = matched {
                    return Err(Error::DuplicateConcept {
                        reason: verdict.reason,
                        existing: Box::new(matched.clone()),
                    });
                }
            }
        }

        let mut concept = Concept::new(draft.topic_id, title);
        concept.description = draft.description;
        concept.icon = draft.icon;
        concept.color = draft.color;

        self.store.insert(&concept).await?;
        Ok(concept)
    }

    /// List concepts for a topic
    pub async fn list(&self, topic_id: &str) -> Result<Vec<Concept>> {
        self.store.list_for_topic(topic_id).await
    }

    /// Get a concept by id
    pub async fn get(&self, id: &str) -> Result<Option<Concept>> {
        self.store.get(id).await
    }
}
