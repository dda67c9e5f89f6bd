//! Pathweaver CLI - learning-path graphs and study schedules

mod server;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pathweaver_core::api::{
    self, ApiContext, CreateNodeRequest, CreateNodeResponse, ImplementWorkflowRequest,
    ValidatePathRequest,
};
use pathweaver_core::catalog::ConceptStore;
use pathweaver_core::config::Config;
use pathweaver_core::llm::LlmClient;
use pathweaver_core::reasoning::LlmReasoner;
use pathweaver_core::storage::Database;
use pathweaver_core::workflow::WorkflowStore;
use tracing::info;

#[derive(Parser)]
#[command(name = "pathweaver")]
#[command(author, version, about = "Learning-path graphs and study schedules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage learning concepts
    Concepts {
        #[command(subcommand)]
        action: ConceptAction,
    },

    /// Judge one prerequisite relation
    Validate {
        /// Title of the prerequisite concept
        from: String,
        /// Title of the dependent concept
        to: String,
    },

    /// Estimate study hours for a saved workflow
    Estimate {
        /// Workflow ID
        workflow_id: String,
    },

    /// Publish a workflow's schedule to the calendar
    Implement {
        /// Workflow ID
        workflow_id: String,
        /// Calendar OAuth token (or PATHWEAVER_CALENDAR_TOKEN)
        #[arg(long)]
        token: Option<String>,
        /// First study day, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        start_date: Option<String>,
        /// Daily study budget in hours
        #[arg(long)]
        daily_hours: Option<f64>,
    },

    /// Manage saved workflows
    Workflows {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Serve the JSON API over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConceptAction {
    /// Add a concept (runs the duplicate gate)
    Add {
        /// Topic the concept belongs to
        topic: String,
        /// Concept title
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// List concepts in a topic
    List { topic: String },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// List workflows in a topic
    List {
        topic: String,
        /// Include drafts
        #[arg(long)]
        drafts: bool,
    },
    /// Show one workflow
    Show { id: String },
    /// Delete a workflow
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pathweaver=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Concepts { action } => cmd_concepts(action, cli.quiet).await,

        Commands::Validate { from, to } => cmd_validate(&from, &to, cli.quiet).await,

        Commands::Estimate { workflow_id } => cmd_estimate(&workflow_id).await,

        Commands::Implement {
            workflow_id,
            token,
            start_date,
            daily_hours,
        } => cmd_implement(&workflow_id, token, start_date, daily_hours, cli.quiet).await,

        Commands::Workflows { action } => cmd_workflows(action, cli.quiet).await,

        Commands::Config { action } => cmd_config(action, cli.quiet),

        Commands::Serve { port } => {
            let ctx = build_context().await?;
            server::serve(ctx, port).await
        }

        Commands::Doctor => cmd_doctor().await,
    }
}

/// Wire the full API context: config, database, reasoning service
async fn build_context() -> anyhow::Result<ApiContext> {
    let config = Config::load()?;
    config.validate()?;

    let api_key = config
        .llm
        .resolved_api_key()?
        .context("No API key set. Export PATHWEAVER_API_KEY or OPENROUTER_API_KEY")?;
    let client = LlmClient::builder()
        .config(config.llm.clone())
        .api_key(api_key)
        .build()?;
    let reasoner = Arc::new(LlmReasoner::new(client));

    let db = Database::open_default().await?;
    info!(path = %db.path().display(), "Database opened");
    Ok(ApiContext::new(&db, reasoner, config)?)
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_concepts(action: ConceptAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConceptAction::Add {
            topic,
            title,
            description,
            icon,
            color,
        } => {
            let ctx = build_context().await?;
            let response = api::create_node(
                &ctx,
                CreateNodeRequest {
                    topic_id: topic,
                    title,
                    description,
                    icon,
                    color,
                    user_id: None,
                },
            )
            .await?;

            match response {
                CreateNodeResponse::Created(concept) => {
                    if !quiet {
                        println!("Concept created");
                        println!("  ID: {}", concept.id);
                        println!("  Title: {}", concept.title);
                    }
                }
                CreateNodeResponse::Duplicate {
                    reason,
                    similar_node,
                    ..
                } => {
                    println!("Not created: duplicate of '{}'", similar_node.title);
                    println!("  Reason: {}", reason);
                }
            }
        }
        ConceptAction::List { topic } => {
            // Listing needs no reasoning service
            let db = Database::open_default().await?;
            let store = ConceptStore::new(db.pool().clone());
            let concepts = store.list_for_topic(&topic).await?;

            if concepts.is_empty() {
                println!("No concepts in topic '{}'", topic);
            }
            for concept in concepts {
                println!(
                    "{}  {} (used {}x)",
                    concept.id, concept.title, concept.usage_count
                );
            }
        }
    }
    Ok(())
}

async fn cmd_validate(from: &str, to: &str, quiet: bool) -> anyhow::Result<()> {
    let ctx = build_context().await?;
    let response = api::validate_path(
        &ctx,
        ValidatePathRequest {
            from_node: from.to_string(),
            to_node: to.to_string(),
        },
    )
    .await?;

    println!(
        "{} -> {}: {}",
        from,
        to,
        if response.is_valid { "valid" } else { "invalid" }
    );
    if !quiet {
        println!("  Reason: {}", response.reason);
        if let Some(recommendation) = response.recommendation {
            println!("  Recommendation: {}", recommendation);
        }
        if response.from_database {
            println!("  (cached verdict)");
        }
    }
    Ok(())
}

async fn cmd_estimate(workflow_id: &str) -> anyhow::Result<()> {
    let ctx = build_context().await?;
    let estimate = api::estimate_workflow(&ctx, workflow_id).await?;

    for node in &estimate.per_node {
        println!("{:>6.1}h  {}", node.estimated_hours, node.node_title);
    }
    println!(
        "Total: {:.1}h over {} day(s) at {:.1}h/day",
        estimate.total_hours, estimate.total_days, estimate.suggested_daily_hours
    );
    Ok(())
}

async fn cmd_implement(
    workflow_id: &str,
    token: Option<String>,
    start_date: Option<String>,
    daily_hours: Option<f64>,
    quiet: bool,
) -> anyhow::Result<()> {
    let token = token
        .or_else(|| std::env::var("PATHWEAVER_CALENDAR_TOKEN").ok())
        .context("No calendar token. Pass --token or set PATHWEAVER_CALENDAR_TOKEN")?;

    let ctx = build_context().await?;
    let response = api::implement_workflow(
        &ctx,
        workflow_id,
        ImplementWorkflowRequest {
            supabase_token: token,
            start_date,
            daily_hours,
        },
    )
    .await?;

    if !quiet {
        println!(
            "Published {} event(s) spanning {} day(s)",
            response.created_count, response.total_days
        );
    }
    if let Some(warning) = response.warning {
        println!("Warning: {}", warning);
    }
    Ok(())
}

async fn cmd_workflows(action: WorkflowAction, quiet: bool) -> anyhow::Result<()> {
    let db = Database::open_default().await?;
    let store = WorkflowStore::new(db.pool().clone());

    match action {
        WorkflowAction::List { topic, drafts } => {
            let workflows = store.list_for_topic(&topic, drafts).await?;
            if workflows.is_empty() {
                println!("No workflows in topic '{}'", topic);
            }
            for workflow in workflows {
                let marker = if workflow.is_draft { " (draft)" } else { "" };
                println!("{}  {}{}", workflow.id, workflow.title, marker);
            }
        }
        WorkflowAction::Show { id } => {
            let workflow = store
                .get(&id)
                .await?
                .with_context(|| format!("No workflow with id '{}'", id))?;
            println!("Title: {}", workflow.title);
            println!("Topic: {}", workflow.topic_id);
            println!("Draft: {}", workflow.is_draft);
            if let Some(implemented_at) = workflow.implemented_at {
                println!("Implemented: {}", implemented_at.to_rfc3339());
            }
            println!("Nodes:");
            for node in workflow.graph.nodes() {
                println!("  {}  {}", node.concept_id, node.title);
            }
            println!("Edges:");
            for edge in workflow.graph.edges() {
                println!(
                    "  {} -> {}  [{}]",
                    edge.source,
                    edge.target,
                    edge.validation.status.as_str()
                );
            }
        }
        WorkflowAction::Delete { id } => {
            if store.delete(&id).await? {
                if !quiet {
                    println!("Deleted workflow {}", id);
                }
            } else {
                println!("No workflow with id '{}'", id);
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Config reset to defaults");
            }
        }
    }
    Ok(())
}

async fn cmd_doctor() -> anyhow::Result<()> {
    match Config::load().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => {
            println!("[ok] Config loaded");
            match config.llm.resolved_api_key() {
                Ok(Some(_)) => println!("[ok] API key set"),
                Ok(None) => {
                    println!("[!!] No API key (export PATHWEAVER_API_KEY or OPENROUTER_API_KEY)")
                }
                Err(e) => println!("[!!] API key: {}", e),
            }
        }
        Err(e) => println!("[!!] Config: {}", e),
    }

    match Database::open_default().await {
        Ok(db) => {
            println!("[ok] Database: {}", db.path().display());
            match db.migration_status().await {
                Ok(status) => println!(
                    "[ok] Migrations: version {} of {}",
                    status.current_version, status.target_version
                ),
                Err(e) => println!("[!!] Migrations: {}", e),
            }
            match db.health_check().await {
                Ok(()) => println!("[ok] Database healthy"),
                Err(e) => println!("[!!] Database health: {}", e),
            }
        }
        Err(e) => println!("[!!] Database: Failed to initialize - {}", e),
    }

    Ok(())
}
