//! Upload record persistence
//!
//! One SQLite row per successful upload; rows are created once and never
//! mutated. In-memory databases are supported for tests.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

/// Metadata row created per successful upload
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoRecord {
    /// Generated unique identifier
    pub id: String,
    /// Original filename as sent by the client (not sanitized)
    pub name: String,
    /// Absolute filesystem path of the stored audio file
    pub path: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Connect to the upload record database and ensure the schema exists
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL: {}", database_url))?
        .create_if_missing(true);

    // SQLite in-memory databases exist per connection; a larger pool would
    // hand out empty databases
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    init_schema(&pool).await?;

    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            path TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to initialize videos table")?;

    Ok(())
}

/// Repository over the `videos` table
#[derive(Debug, Clone)]
pub struct VideoRepository {
    pool: SqlitePool,
}

impl VideoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a record for a fully stored upload, generating its id
    pub async fn insert(&self, name: &str, path: &str) -> Result<VideoRecord> {
        let record = VideoRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            path: path.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO videos (id, name, path, created_at) VALUES (?, ?, ?, ?)")
            .bind(&record.id)
            .bind(&record.name)
            .bind(&record.path)
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .context("Failed to insert video record")?;

        Ok(record)
    }

    /// Fetch a record by id
    pub async fn get(&self, id: &str) -> Result<Option<VideoRecord>> {
        let record = sqlx::query_as::<_, VideoRecord>(
            "SELECT id, name, path, created_at FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch video record")?;

        Ok(record)
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count video records")?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repository() -> VideoRepository {
        let pool = connect("sqlite::memory:").await.unwrap();
        VideoRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_and_get_record() {
        let repo = test_repository().await;

        let record = repo
            .insert("lecture.mp3", "/srv/uploads/lecture - abc.mp3")
            .await
            .unwrap();

        assert_eq!(record.name, "lecture.mp3");

        let fetched = repo.get(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.path, "/srv/uploads/lecture - abc.mp3");
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_none() {
        let repo = test_repository().await;
        assert!(repo.get("no-such-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique_per_insert() {
        let repo = test_repository().await;

        let a = repo.insert("a.mp3", "/srv/a.mp3").await.unwrap();
        let b = repo.insert("a.mp3", "/srv/a.mp3").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
