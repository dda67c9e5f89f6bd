//! Edge validation engine
//!
//! Answers "is A a sound prerequisite for B" for a pair of concept titles:
//! cache first, then the reasoning service, caching fresh verdicts. When the
//! service is unreachable the engine degrades instead of erroring - by
//! default it fails open (the edge is accepted with an explanatory reason)
//! and never caches the degraded verdict, so the pair is re-judged once the
//! service is back.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::ValidationConfig;
use crate::error::Result;
use crate::graph::{EdgeStatus, EdgeValidation};
use crate::reasoning::ReasoningService;

use super::cache::ValidationCache;

/// Reason attached to degraded verdicts
pub const UNAVAILABLE_REASON: &str = "Validation unavailable";

/// Result of validating one title pair
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub validation: EdgeValidation,
    /// Whether the verdict came from the durable cache
    pub from_cache: bool,
}

/// Cache-first validator over the reasoning service
#[derive(Clone)]
pub struct EdgeValidationEngine {
    cache: ValidationCache,
    reasoner: Arc<dyn ReasoningService>,
    fail_open: bool,
}

impl EdgeValidationEngine {
    pub fn new(
        cache: ValidationCache,
        reasoner: Arc<dyn ReasoningService>,
        config: &ValidationConfig,
    ) -> Self {
        Self {
            cache,
            reasoner,
            fail_open: config.fail_open,
        }
    }

    /// Validate the ordered pair "learn `from` before `to`"
    pub async fn validate(&self, from_title: &str, to_title: &str) -> Result<ValidationOutcome> {
        if let Some(cached) = self.cache.get(from_title, to_title).await? {
            return Ok(ValidationOutcome {
                validation: EdgeValidation {
                    status: if cached.is_valid {
                        EdgeStatus::Valid
                    } else {
                        EdgeStatus::Invalid
                    },
                    reason: Some(cached.reason),
                    recommendation: cached.recommendation,
                    validated_at: Some(Utc::now()),
                },
                from_cache: true,
            });
        }

        match self.reasoner.judge_path(from_title, to_title).await {
            Ok(verdict) => {
                self.cache
                    .put(
                        from_title,
                        to_title,
                        verdict.is_valid,
                        &verdict.reason,
                        verdict.recommendation.as_deref(),
                    )
                    .await?;

                info!(from = %from_title, to = %to_title, is_valid = verdict.is_valid, "Path judged");
                Ok(ValidationOutcome {
                    validation: EdgeValidation {
                        status: if verdict.is_valid {
                            EdgeStatus::Valid
                        } else {
                            EdgeStatus::Invalid
                        },
                        reason: Some(verdict.reason),
                        recommendation: verdict.recommendation,
                        validated_at: Some(Utc::now()),
                    },
                    from_cache: false,
                })
            }
            Err(e) => {
                warn!(from = %from_title, to = %to_title, error = %e, "Reasoning service unavailable, degrading");
                // Degraded verdicts are never cached
                Ok(ValidationOutcome {
                    validation: EdgeValidation {
                        status: if self.fail_open {
                            EdgeStatus::Valid
                        } else {
                            EdgeStatus::Invalid
                        },
                        reason: Some(UNAVAILABLE_REASON.to_string()),
                        recommendation: None,
                        validated_at: Some(Utc::now()),
                    },
                    from_cache: false,
                })
            }
        }
    }
}
