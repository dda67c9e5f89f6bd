//! Durable verdict cache
//!
//! Verdicts are keyed by the ordered pair of normalized concept titles, not
//! by node or edge ids, so a judgement survives graph edits and is shared
//! across workflows. The reverse direction is a different question and gets
//! its own entry. Writes are last-write-wins upserts.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::catalog::normalize_title;
use crate::error::{Error, Result};

/// A cached prerequisite judgement
#[derive(Debug, Clone)]
pub struct CachedVerdict {
    pub is_valid: bool,
    pub reason: String,
    pub recommendation: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed cache of path judgements
#[derive(Debug, Clone)]
pub struct ValidationCache {
    pool: SqlitePool,
}

impl ValidationCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a verdict for the ordered title pair
    pub async fn get(&self, from_title: &str, to_title: &str) -> Result<Option<CachedVerdict>> {
        let row: Option<VerdictRow> = sqlx::query_as(
            r#"
            SELECT is_valid, reason, recommendation, created_at
            FROM validation_records
            WHERE from_title = ? AND to_title = ?
            "#,
        )
        .bind(normalize_title(from_title))
        .bind(normalize_title(to_title))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_verdict()).transpose()
    }

    /// Store a verdict, replacing any previous one for the same pair
    pub async fn put(
        &self,
        from_title: &str,
        to_title: &str,
        is_valid: bool,
        reason: &str,
        recommendation: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO validation_records (
                from_title, to_title, is_valid, reason, recommendation, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(from_title, to_title) DO UPDATE SET
                is_valid = excluded.is_valid,
                reason = excluded.reason,
                recommendation = excluded.recommendation,
                created_at = excluded.created_at
            "#,
        )
        .bind(normalize_title(from_title))
        .bind(normalize_title(to_title))
        .bind(is_valid)
        .bind(reason)
        .bind(recommendation)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(from = %from_title, to = %to_title, is_valid, "Verdict cached");
        Ok(())
    }

    /// Number of cached verdicts
    pub async fn len(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM validation_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }
}

#[derive(Debug, FromRow)]
struct VerdictRow {
    is_valid: bool,
    reason: String,
    recommendation: Option<String>,
    created_at: String,
}

impl VerdictRow {
    fn into_verdict(self) -> Result<CachedVerdict> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Other(format!("Invalid timestamp '{}': {}", self.created_at, e)))?;
        Ok(CachedVerdict {
            is_valid: self.is_valid,
            reason: self.reason,
            recommendation: self.recommendation,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn cache() -> ValidationCache {
        let db = Database::in_memory().await.expect("in-memory db");
        ValidationCache::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = cache().await;
        assert!(cache.get("Algebra", "Calculus").await.unwrap().is_none());

        cache
            .put("Algebra", "Calculus", true, "sound", None)
            .await
            .unwrap();

        let hit = cache.get("Algebra", "Calculus").await.unwrap().unwrap();
        assert!(hit.is_valid);
        assert_eq!(hit.reason, "sound");
    }

    #[tokio::test]
    async fn test_direction_matters() {
        let cache = cache().await;
        cache
            .put("Algebra", "Calculus", true, "sound", None)
            .await
            .unwrap();

        // Reverse pair is a distinct question
        assert!(cache.get("Calculus", "Algebra").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_is_normalized() {
        let cache = cache().await;
        cache
            .put("Algebra", "Calculus", true, "sound", None)
            .await
            .unwrap();

        let hit = cache.get("  ALGEBRA ", "calculus").await.unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = cache().await;
        cache
            .put("A", "B", true, "first", None)
            .await
            .unwrap();
        cache
            .put("A", "B", false, "second", Some("swap them"))
            .await
            .unwrap();

        let hit = cache.get("A", "B").await.unwrap().unwrap();
        assert!(!hit.is_valid);
        assert_eq!(hit.reason, "second");
        assert_eq!(hit.recommendation.as_deref(), Some("swap them"));
        assert_eq!(cache.len().await.unwrap(), 1);
    }
}
