//! Database migrations
//!
//! This module manages SQLite schema migrations for pathweaver.
//! Migrations are versioned and applied automatically on database connection.

use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: Initial schema
const MIGRATION_V1: &str = r#"
    -- Concepts table: one row per named learning concept, scoped to a topic.
    -- Concepts are never deleted; only their usage count changes.
    CREATE TABLE IF NOT EXISTS concepts (
        id TEXT PRIMARY KEY NOT NULL,
        topic_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        icon TEXT NOT NULL DEFAULT '',
        color TEXT NOT NULL DEFAULT '',
        usage_count INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_concepts_topic_id ON concepts(topic_id);
    CREATE INDEX IF NOT EXISTS idx_concepts_title ON concepts(title);

    -- Workflows table: a saved concept graph. Edge list and node positions
    -- are stored as JSON columns; concepts are referenced, not duplicated.
    CREATE TABLE IF NOT EXISTS workflows (
        id TEXT PRIMARY KEY NOT NULL,
        topic_id TEXT NOT NULL,
        title TEXT NOT NULL,
        edges TEXT NOT NULL DEFAULT '[]',
        node_positions TEXT NOT NULL DEFAULT '{}',
        is_draft INTEGER NOT NULL DEFAULT 0,
        implemented_at TIMESTAMP,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_workflows_topic_id ON workflows(topic_id);
    CREATE INDEX IF NOT EXISTS idx_workflows_is_draft ON workflows(is_draft);

    -- Validation verdict cache, keyed by the ordered concept-title pair.
    -- Append-only; a rewrite of the same pair is last-write-wins.
    CREATE TABLE IF NOT EXISTS validation_records (
        from_title TEXT NOT NULL,
        to_title TEXT NOT NULL,
        is_valid INTEGER NOT NULL,
        reason TEXT NOT NULL DEFAULT '',
        recommendation TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (from_title, to_title)
    );
"#;

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: Initial schema");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Status of database migrations
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}

/// Check the migration status of a database
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    let row: (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;

    Ok(row.0.unwrap_or(0))
}

async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let db = Database::in_memory().await.expect("Failed to create database");

        // Running again must be a no-op
        run_migrations(db.pool()).await.expect("Second run failed");

        let status = migration_status(db.pool()).await.expect("Status failed");
        assert_eq!(status.current_version, CURRENT_VERSION);
        assert!(!status.needs_migration);
    }

    #[tokio::test]
    async fn test_all_tables_exist() {
        let db = Database::in_memory().await.expect("Failed to create database");

        for table in ["concepts", "workflows", "validation_records"] {
            let row: Option<(String,)> = sqlx::query_as(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_optional(db.pool())
            .await
            .expect("Failed to query sqlite_master");
            assert!(row.is_some(), "missing table {table}");
        }
    }
}
