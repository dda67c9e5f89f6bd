//! JSON surface handlers
//!
//! Async functions over an `ApiContext`, one per endpoint, speaking the
//! wire types in `types`. Transport-agnostic: the CLI's HTTP adapter and
//! the CLI subcommands both call straight into these.

mod types;

pub use types::*;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::calendar::CalendarPublisher;
use crate::catalog::{ConceptCatalog, ConceptDraft, ConceptStore};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::graph::{EdgeStatus, PathGraph};
use crate::reasoning::{EstimateInput, ReasoningService};
use crate::schedule::{EffortEstimator, build_schedule};
use crate::storage::Database;
use crate::validation::{EdgeValidationEngine, ValidationCache};
use crate::workflow::{Workflow, WorkflowStore};

/// Everything the handlers need, wired once at startup
#[derive(Clone)]
pub struct ApiContext {
    catalog: ConceptCatalog,
    workflows: WorkflowStore,
    engine: Arc<EdgeValidationEngine>,
    estimator: EffortEstimator,
    publisher: CalendarPublisher,
    config: Config,
}

impl ApiContext {
    pub fn new(db: &Database, reasoner: Arc<dyn ReasoningService>, config: Config) -> Result<Self> {
        let pool = db.pool().clone();
        Ok(Self {
            catalog: ConceptCatalog::new(ConceptStore::new(pool.clone()), reasoner.clone()),
            workflows: WorkflowStore::new(pool.clone()),
            engine: Arc::new(EdgeValidationEngine::new(
                ValidationCache::new(pool),
                reasoner.clone(),
                &config.validation,
            )),
            estimator: EffortEstimator::new(reasoner, &config.schedule),
            publisher: CalendarPublisher::new(&config.calendar)?,
            config,
        })
    }

    pub fn catalog(&self) -> &ConceptCatalog {
        &self.catalog
    }

    pub fn workflows(&self) -> &WorkflowStore {
        &self.workflows
    }

    pub fn engine(&self) -> &Arc<EdgeValidationEngine> {
        &self.engine
    }
}

/// `POST /nodes`
pub async fn create_node(ctx: &ApiContext, request: CreateNodeRequest) -> Result<CreateNodeResponse> {
    let draft = ConceptDraft {
        topic_id: request.topic_id,
        title: request.title,
        description: request.description,
        icon: request.icon.unwrap_or_default(),
        color: request.color.unwrap_or_default(),
    };

    match ctx.catalog.create(draft).await {
        Ok(concept) => Ok(CreateNodeResponse::Created(concept)),
        Err(Error::DuplicateConcept { reason, existing }) => Ok(CreateNodeResponse::Duplicate {
            is_duplicate: true,
            reason,
            similar_node: *existing,
        }),
        Err(e) => Err(e),
    }
}

/// `GET /nodes/{topicId}`
pub async fn list_nodes(ctx: &ApiContext, topic_id: &str) -> Result<Vec<crate::catalog::Concept>> {
    ctx.catalog.list(topic_id).await
}

/// `POST /validate-path`
pub async fn validate_path(
    ctx: &ApiContext,
    request: ValidatePathRequest,
) -> Result<ValidatePathResponse> {
    let outcome = ctx
        .engine
        .validate(&request.from_node, &request.to_node)
        .await?;

    Ok(ValidatePathResponse {
        success: true,
        is_valid: outcome.validation.status == EdgeStatus::Valid,
        reason: outcome.validation.reason.unwrap_or_default(),
        recommendation: outcome.validation.recommendation,
        from_database: outcome.from_cache,
    })
}

/// `POST /estimate-nodes`
pub async fn estimate_nodes(
    ctx: &ApiContext,
    request: EstimateNodesRequest,
) -> Result<EstimateResponse> {
    let inputs: Vec<EstimateInput> = request
        .nodes
        .into_iter()
        .map(|n| EstimateInput {
            id: n.id,
            title: n.title,
            description: n.description,
        })
        .collect();

    let estimate = ctx.estimator.estimate(&inputs).await?;
    Ok(EstimateResponse::from_estimate(
        estimate,
        ctx.config.schedule.default_daily_hours,
    ))
}

/// `POST /workflows/{id}/estimate`
pub async fn estimate_workflow(ctx: &ApiContext, workflow_id: &str) -> Result<EstimateResponse> {
    let workflow = ctx
        .workflows
        .get(workflow_id)
        .await?
        .ok_or_else(|| Error::WorkflowNotFound(workflow_id.to_string()))?;

    let inputs = workflow_inputs(ctx, &workflow).await?;
    let estimate = ctx.estimator.estimate(&inputs).await?;
    Ok(EstimateResponse::from_estimate(
        estimate,
        ctx.config.schedule.default_daily_hours,
    ))
}

/// `POST /workflows/{id}/implement`
pub async fn implement_workflow(
    ctx: &ApiContext,
    workflow_id: &str,
    request: ImplementWorkflowRequest,
) -> Result<ImplementWorkflowResponse> {
    let workflow = ctx
        .workflows
        .get(workflow_id)
        .await?
        .ok_or_else(|| Error::WorkflowNotFound(workflow_id.to_string()))?;

    if workflow.is_implemented() {
        return Err(Error::AlreadyImplemented(workflow.title));
    }

    let inputs = workflow_inputs(ctx, &workflow).await?;
    let estimate = ctx.estimator.estimate(&inputs).await?;

    let daily_hours = request
        .daily_hours
        .or(estimate.suggested_daily_hours)
        .filter(|h| h.is_finite() && *h > 0.0)
        .unwrap_or(ctx.config.schedule.default_daily_hours);

    let start_date = match &request.start_date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| Error::InvalidInput(format!("Invalid start_date '{}'", s)))?,
        None => Utc::now().date_naive(),
    };

    let schedule = build_schedule(&workflow.graph, &estimate, start_date, daily_hours)?;
    let report = ctx
        .publisher
        .publish(&schedule, &request.supabase_token)
        .await?;
    ctx.workflows.mark_implemented(workflow_id).await?;

    info!(workflow_id = %workflow_id, events = report.created_count, "Workflow implemented");
    Ok(ImplementWorkflowResponse::new(
        report.created_count,
        &schedule,
    ))
}

/// `POST /workflows`
pub async fn save_workflow(
    ctx: &ApiContext,
    request: SaveWorkflowRequest,
) -> Result<WorkflowResponse> {
    let mut graph = PathGraph::new();
    for node in &request.nodes {
        graph.add_node(&node.concept_id, &node.title, node.position);
    }
    for edge in &request.edges {
        graph.add_edge(&edge.source, &edge.target)?;
    }

    let mut workflow = match &request.id {
        Some(id) => match ctx.workflows.get(id).await? {
            Some(existing) => existing,
            None => {
                let mut fresh = Workflow::new(&request.topic_id, &request.title);
                fresh.id = id.clone();
                fresh
            }
        },
        None => Workflow::new(&request.topic_id, &request.title),
    };
    workflow.title = request.title;
    workflow.graph = graph;
    workflow.is_draft = request.is_draft;

    ctx.workflows.save(&workflow).await?;
    WorkflowResponse::from_workflow(&workflow)
}

/// `GET /workflows/{id}`
pub async fn get_workflow(ctx: &ApiContext, workflow_id: &str) -> Result<WorkflowResponse> {
    let workflow = ctx
        .workflows
        .get(workflow_id)
        .await?
        .ok_or_else(|| Error::WorkflowNotFound(workflow_id.to_string()))?;
    WorkflowResponse::from_workflow(&workflow)
}

/// `GET /workflows?topic_id=`
pub async fn list_workflows(
    ctx: &ApiContext,
    topic_id: &str,
    include_drafts: bool,
) -> Result<Vec<WorkflowResponse>> {
    let workflows = ctx.workflows.list_for_topic(topic_id, include_drafts).await?;
    workflows
        .iter()
        .map(WorkflowResponse::from_workflow)
        .collect()
}

async fn workflow_inputs(ctx: &ApiContext, workflow: &Workflow) -> Result<Vec<EstimateInput>> {
    let mut inputs = Vec::with_capacity(workflow.graph.nodes().len());
    for node in workflow.graph.nodes() {
        let description = ctx
            .catalog
            .get(&node.concept_id)
            .await?
            .and_then(|c| c.description);
        inputs.push(EstimateInput {
            id: node.concept_id.clone(),
            title: node.title.clone(),
            description,
        });
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Position;
    use crate::reasoning::{
        ConceptBrief, DuplicateVerdict, EffortEstimates, NodeEffort, PathVerdict,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One reasoner for all endpoints: never finds duplicates, judges every
    /// path valid, estimates a fixed 3 hours per node
    struct StubReasoner {
        path_calls: AtomicUsize,
    }

    impl StubReasoner {
        fn new() -> Self {
            Self {
                path_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReasoningService for StubReasoner {
        async fn check_duplicate(
            &self,
            candidate: &ConceptBrief,
            existing: &[ConceptBrief],
        ) -> crate::error::Result<DuplicateVerdict> {
            let dup = existing.iter().find(|c| c.title == candidate.title);
            Ok(DuplicateVerdict {
                is_duplicate: dup.is_some(),
                reason: "same title".into(),
                matched_title: dup.map(|c| c.title.clone()),
            })
        }

        async fn judge_path(&self, _from: &str, _to: &str) -> crate::error::Result<PathVerdict> {
            self.path_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PathVerdict {
                is_valid: true,
                reason: "sound".into(),
                recommendation: None,
            })
        }

        async fn estimate_effort(
            &self,
            nodes: &[EstimateInput],
        ) -> crate::error::Result<EffortEstimates> {
            Ok(EffortEstimates {
                nodes: nodes
                    .iter()
                    .map(|n| NodeEffort {
                        id: n.id.clone(),
                        estimated_hours: 3.0,
                    })
                    .collect(),
                suggested_daily_hours: Some(3.0),
            })
        }
    }

    async fn context() -> ApiContext {
        context_with_calendar("http://127.0.0.1:1".into()).await
    }

    async fn context_with_calendar(base_url: String) -> ApiContext {
        let db = Database::in_memory().await.expect("in-memory db");
        let mut config = Config::default();
        config.calendar.base_url = base_url;
        ApiContext::new(&db, Arc::new(StubReasoner::new()), config).expect("context")
    }

    fn node_request(topic: &str, title: &str) -> CreateNodeRequest {
        CreateNodeRequest {
            topic_id: topic.into(),
            title: title.into(),
            description: None,
            icon: None,
            color: None,
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_duplicate() {
        let ctx = context().await;

        let first = create_node(&ctx, node_request("t", "Algebra")).await.unwrap();
        assert!(matches!(first, CreateNodeResponse::Created(_)));

        let second = create_node(&ctx, node_request("t", "Algebra")).await.unwrap();
        match second {
            CreateNodeResponse::Duplicate { similar_node, .. } => {
                assert_eq!(similar_node.title, "Algebra");
            }
            CreateNodeResponse::Created(_) => panic!("expected duplicate"),
        }

        assert_eq!(list_nodes(&ctx, "t").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_validate_comes_from_database() {
        let ctx = context().await;
        let request = || ValidatePathRequest {
            from_node: "Algebra".into(),
            to_node: "Calculus".into(),
        };

        let first = validate_path(&ctx, request()).await.unwrap();
        assert!(first.is_valid);
        assert!(!first.from_database);

        let second = validate_path(&ctx, request()).await.unwrap();
        assert!(second.is_valid);
        assert!(second.from_database);
    }

    #[tokio::test]
    async fn test_estimate_nodes() {
        let ctx = context().await;
        let response = estimate_nodes(
            &ctx,
            EstimateNodesRequest {
                nodes: vec![
                    EstimateNodeRequest {
                        id: "a".into(),
                        title: "Algebra".into(),
                        description: None,
                    },
                    EstimateNodeRequest {
                        id: "b".into(),
                        title: "Calculus".into(),
                        description: None,
                    },
                ],
            },
        )
        .await
        .unwrap();

        assert_eq!(response.total_hours, 6.0);
        assert_eq!(response.suggested_daily_hours, 3.0);
        assert_eq!(response.total_days, 2);
        assert_eq!(response.per_node.len(), 2);
    }

    #[tokio::test]
    async fn test_save_and_list_workflows() {
        let ctx = context().await;

        let saved = save_workflow(
            &ctx,
            SaveWorkflowRequest {
                id: None,
                topic_id: "t".into(),
                title: "Math path".into(),
                nodes: vec![
                    WorkflowNodeRequest {
                        concept_id: "a".into(),
                        title: "Algebra".into(),
                        position: Position::default(),
                    },
                    WorkflowNodeRequest {
                        concept_id: "b".into(),
                        title: "Calculus".into(),
                        position: Position::new(1.0, 0.0),
                    },
                ],
                edges: vec![WorkflowEdgeRequest {
                    source: "a".into(),
                    target: "b".into(),
                }],
                is_draft: true,
            },
        )
        .await
        .unwrap();

        assert_eq!(saved.nodes.len(), 2);
        assert_eq!(saved.edges.len(), 1);

        // Drafts hidden by default
        assert!(list_workflows(&ctx, "t", false).await.unwrap().is_empty());
        assert_eq!(list_workflows(&ctx, "t", true).await.unwrap().len(), 1);

        let loaded = get_workflow(&ctx, &saved.id).await.unwrap();
        assert_eq!(loaded.title, "Math path");
    }

    #[tokio::test]
    async fn test_estimate_missing_workflow() {
        let ctx = context().await;
        let result = estimate_workflow(&ctx, "no-such-id").await;
        assert!(matches!(result, Err(Error::WorkflowNotFound(_))));
    }

    #[tokio::test]
    async fn test_implement_workflow_once() {
        // Calendar accepting every event
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind mock server");
        let port = server.server_addr().to_ip().expect("ip addr").port();
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let _ = request.respond(tiny_http::Response::from_string("{}"));
            }
        });

        let ctx = context_with_calendar(format!("http://127.0.0.1:{}", port)).await;

        let saved = save_workflow(
            &ctx,
            SaveWorkflowRequest {
                id: None,
                topic_id: "t".into(),
                title: "Math path".into(),
                nodes: vec![WorkflowNodeRequest {
                    concept_id: "a".into(),
                    title: "Algebra".into(),
                    position: Position::default(),
                }],
                edges: vec![],
                is_draft: false,
            },
        )
        .await
        .unwrap();

        let response = implement_workflow(
            &ctx,
            &saved.id,
            ImplementWorkflowRequest {
                supabase_token: "token".into(),
                start_date: Some("2026-09-01".into()),
                daily_hours: Some(3.0),
            },
        )
        .await
        .unwrap();

        assert!(response.success);
        assert_eq!(response.created_count, 1);
        assert_eq!(response.total_days, 1);
        assert!(response.warning.is_none());

        // The implemented_at guard rejects a second publish
        let again = implement_workflow(
            &ctx,
            &saved.id,
            ImplementWorkflowRequest {
                supabase_token: "token".into(),
                start_date: None,
                daily_hours: None,
            },
        )
        .await;
        assert!(matches!(again, Err(Error::AlreadyImplemented(_))));
    }

    #[tokio::test]
    async fn test_implement_bad_start_date() {
        let ctx = context().await;
        let saved = save_workflow(
            &ctx,
            SaveWorkflowRequest {
                id: None,
                topic_id: "t".into(),
                title: "path".into(),
                nodes: vec![],
                edges: vec![],
                is_draft: false,
            },
        )
        .await
        .unwrap();

        let result = implement_workflow(
            &ctx,
            &saved.id,
            ImplementWorkflowRequest {
                supabase_token: "token".into(),
                start_date: Some("tomorrow".into()),
                daily_hours: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
