//! Concept persistence
//!
//! SQLite-backed storage for concepts. Concepts are never deleted; only
//! their usage count changes after creation.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::Concept;

/// Store for persisting and retrieving concepts
#[derive(Debug, Clone)]
pub struct ConceptStore {
    pool: SqlitePool,
}

impl ConceptStore {
    /// Create a new concept store with the given database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new concept
    pub async fn insert(&self, concept: &Concept) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO concepts (
                id, topic_id, title, description, icon, color,
                usage_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&concept.id)
        .bind(&concept.topic_id)
        .bind(&concept.title)
        .bind(&concept.description)
        .bind(&concept.icon)
        .bind(&concept.color)
        .bind(concept.usage_count)
        .bind(concept.created_at.to_rfc3339())
        .bind(concept.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(concept_id = %concept.id, title = %concept.title, "Concept created");
        Ok(())
    }

    /// Get a concept by ID
    pub async fn get(&self, id: &str) -> Result<Option<Concept>> {
        let row: Option<ConceptRow> = sqlx::query_as("SELECT * FROM concepts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_concept()).transpose()
    }

    /// List all concepts for a topic, most used first
    pub async fn list_for_topic(&self, topic_id: &str) -> Result<Vec<Concept>> {
        let rows: Vec<ConceptRow> = sqlx::query_as(
            r#"
            SELECT * FROM concepts
            WHERE topic_id = ?
            ORDER BY usage_count DESC, title
            "#,
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_concept()).collect()
    }

    /// Increment the usage counter for a concept
    pub async fn increment_usage(&self, id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE concepts
            SET usage_count = usage_count + 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ConceptNotFound(id.to_string()));
        }

        debug!(concept_id = %id, "Usage count incremented");
        Ok(())
    }
}

/// Raw database row for a concept
#[derive(Debug, FromRow)]
struct ConceptRow {
    id: String,
    topic_id: String,
    title: String,
    description: Option<String>,
    icon: String,
    color: String,
    usage_count: i64,
    created_at: String,
    updated_at: String,
}

impl ConceptRow {
    fn into_concept(self) -> Result<Concept> {
        Ok(Concept {
            id: self.id,
            topic_id: self.topic_id,
            title: self.title,
            description: self.description,
            icon: self.icon,
            color: self.color,
            usage_count: self.usage_count,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("Invalid timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn store() -> ConceptStore {
        let db = Database::in_memory().await.expect("in-memory db");
        ConceptStore::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = store().await;
        let concept = Concept::new("topic-1", "Linear Algebra").with_icon("book");

        store.insert(&concept).await.expect("insert failed");

        let loaded = store.get(&concept.id).await.expect("get failed").unwrap();
        assert_eq!(loaded.title, "Linear Algebra");
        assert_eq!(loaded.icon, "book");
        assert_eq!(loaded.usage_count, 0);
    }

    #[tokio::test]
    async fn test_list_scoped_to_topic() {
        let store = store().await;
        store
            .insert(&Concept::new("topic-1", "Algebra"))
            .await
            .unwrap();
        store
            .insert(&Concept::new("topic-2", "Anatomy"))
            .await
            .unwrap();

        let listed = store.list_for_topic("topic-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Algebra");
    }

    #[tokio::test]
    async fn test_increment_usage() {
        let store = store().await;
        let concept = Concept::new("topic-1", "Algebra");
        store.insert(&concept).await.unwrap();

        store.increment_usage(&concept.id).await.unwrap();
        store.increment_usage(&concept.id).await.unwrap();

        let loaded = store.get(&concept.id).await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 2);
    }

    #[tokio::test]
    async fn test_increment_usage_missing_concept() {
        let store = store().await;
        let result = store.increment_usage("no-such-id").await;
        assert!(matches!(result, Err(Error::ConceptNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_orders_by_usage() {
        let store = store().await;
        let a = Concept::new("t", "Rarely Used");
        let b = Concept::new("t", "Often Used");
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();
        store.increment_usage(&b.id).await.unwrap();

        let listed = store.list_for_topic("t").await.unwrap();
        assert_eq!(listed[0].title, "Often Used");
    }
}
