use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::normalize::parse_timestamp;

/// Admin-curated article pinned to a feed source (keyed by `source_url`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomArticle {
    pub id: i64,
    pub source_url: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub thumbnail: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Admin-curated video pinned to a page section (keyed by `section_type`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomVideo {
    pub id: i64,
    pub section_type: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub thumbnail: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Read side of the external record store. Results come back flat, most recent first;
/// grouping is done by the merge layer.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    async fn custom_articles(&self) -> Result<Vec<CustomArticle>>;
    async fn custom_videos(&self) -> Result<Vec<CustomVideo>>;

    fn backend_name(&self) -> &'static str;
}

/// Used when no store is configured: every query is empty.
pub struct NullStore;

#[async_trait::async_trait]
impl ContentStore for NullStore {
    async fn custom_articles(&self) -> Result<Vec<CustomArticle>> {
        Ok(Vec::new())
    }

    async fn custom_videos(&self) -> Result<Vec<CustomVideo>> {
        Ok(Vec::new())
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}

/// SQLite-backed record store. The pool is created once at startup and shared.
///
/// Rows are returned newest insert first (`id DESC`). `created_at` is free text and is
/// only parsed, never sorted on.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl ContentStore for SqliteStore {
    async fn custom_articles(&self) -> Result<Vec<CustomArticle>> {
        let rows = sqlx::query_as::<_, CustomArticleRow>(
            r#"
            SELECT id, source_url, title, link, thumbnail, created_at, updated_at
            FROM custom_articles
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list custom articles")?;

        Ok(rows
            .into_iter()
            .map(|row| CustomArticle {
                id: row.id,
                source_url: row.source_url,
                title: row.title,
                link: row.link,
                thumbnail: row.thumbnail,
                created_at: row.created_at.as_deref().and_then(parse_timestamp),
                updated_at: row.updated_at.as_deref().and_then(parse_timestamp),
            })
            .collect())
    }

    async fn custom_videos(&self) -> Result<Vec<CustomVideo>> {
        let rows = sqlx::query_as::<_, CustomVideoRow>(
            r#"
            SELECT id, section_type, title, link, thumbnail, created_at, updated_at
            FROM custom_videos
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list custom videos")?;

        Ok(rows
            .into_iter()
            .map(|row| CustomVideo {
                id: row.id,
                section_type: row.section_type,
                title: row.title,
                link: row.link,
                thumbnail: row.thumbnail,
                created_at: row.created_at.as_deref().and_then(parse_timestamp),
                updated_at: row.updated_at.as_deref().and_then(parse_timestamp),
            })
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

/// Create the custom content tables if they are missing.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS custom_articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_url TEXT NOT NULL,
            title TEXT,
            link TEXT,
            thumbnail TEXT,
            created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT,
            UNIQUE (source_url, title)
        );
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create custom_articles table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS custom_videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            section_type TEXT NOT NULL,
            title TEXT,
            link TEXT,
            thumbnail TEXT,
            created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT,
            UNIQUE (section_type, title)
        );
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create custom_videos table")?;

    tracing::info!("store: DB schema ensured");
    Ok(())
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct CustomArticleRow {
    id: i64,
    source_url: String,
    title: Option<String>,
    link: Option<String>,
    thumbnail: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(sqlx::FromRow)]
struct CustomVideoRow {
    id: i64,
    section_type: String,
    title: Option<String>,
    link: Option<String>,
    thumbnail: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}
