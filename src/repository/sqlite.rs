//! SQLite candidate store / SQLite 存储
//!
//! Schema:
//! - contents: one row per content, `created_at` as RFC3339 text with nanoseconds
//! - content_tags: (content_id, position, tag), tag order preserved
//! - authors: public author profiles used for enrichment
//! - search_history / tag_usage: persisted analytics
//!
//! Features:
//! - WAL mode + busy_timeout
//! - Batch insert inside one transaction, retried when the database is locked

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};

use super::authors::AuthorDirectory;
use super::CandidateStore;
use crate::analytics::SearchRecord;
use crate::search::{AuthorProfile, Candidate, Counters, SearchError};

const BACKEND: &str = "sqlite";

fn backend_err(e: impl ToString) -> SearchError {
    SearchError::backend(BACKEND, e)
}

/// SQLite store / SQLite 存储
pub struct SqliteStore {
    db: Pool<Sqlite>,
}

impl SqliteStore {
    /// Connect to `url` and create tables / 连接数据库并建表
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SearchError> {
        Self::connect_with(SqlitePoolOptions::new().max_connections(max_connections), url).await
    }

    async fn connect_with(options: SqlitePoolOptions, url: &str) -> Result<Self, SearchError> {
        let db = options.connect(url).await.map_err(backend_err)?;

        // 启用WAL模式，提高并发性能
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&db)
            .await
            .map_err(backend_err)?;
        sqlx::query("PRAGMA busy_timeout=5000")
            .execute(&db)
            .await
            .map_err(backend_err)?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&db)
            .await
            .map_err(backend_err)?;

        let store = Self { db };
        store.init().await?;
        tracing::info!("SQLite store opened: {}", url);
        Ok(store)
    }

    /// Private in-memory database, single connection / 内存数据库
    ///
    /// The connection is never recycled, otherwise the data would vanish with it.
    pub async fn in_memory() -> Result<Self, SearchError> {
        let options = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
        Self::connect_with(options, "sqlite::memory:").await
    }

    /// Create tables if missing / 初始化表结构
    async fn init(&self) -> Result<(), SearchError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS contents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                short_description TEXT,
                content_type TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT '',
                price REAL NOT NULL DEFAULT 0,
                currency TEXT NOT NULL DEFAULT 'USD',
                author_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                likes INTEGER NOT NULL DEFAULT 0,
                views INTEGER NOT NULL DEFAULT 0,
                downloads INTEGER NOT NULL DEFAULT 0,
                published INTEGER NOT NULL DEFAULT 1
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS content_tags (
                content_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                tag TEXT NOT NULL,
                PRIMARY KEY(content_id, position)
            ) WITHOUT ROWID
            "#,
            "CREATE INDEX IF NOT EXISTS idx_contents_published ON contents(published)",
            r#"
            CREATE TABLE IF NOT EXISTS authors (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                avatar TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS search_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                total_results INTEGER NOT NULL,
                searched_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tag_usage (
                tag TEXT PRIMARY KEY,
                count INTEGER NOT NULL DEFAULT 0
            )
            "#,
        ];
        for sql in statements {
            sqlx::query(sql).execute(&self.db).await.map_err(backend_err)?;
        }
        Ok(())
    }

    async fn do_insert_batch(&self, items: &[Candidate]) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin().await?;

        for c in items {
            sqlx::query(
                r#"INSERT OR REPLACE INTO contents
                   (id, title, description, short_description, content_type, category,
                    price, currency, author_id, created_at, likes, views, downloads, published)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&c.id)
            .bind(&c.title)
            .bind(&c.description)
            .bind(&c.short_description)
            .bind(&c.content_type)
            .bind(&c.category)
            .bind(c.price)
            .bind(&c.currency)
            .bind(&c.author_id)
            .bind(to_timestamp(&c.created_at))
            .bind(to_i64(c.counters.likes))
            .bind(to_i64(c.counters.views))
            .bind(to_i64(c.counters.downloads))
            .bind(c.published)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM content_tags WHERE content_id = ?")
                .bind(&c.id)
                .execute(&mut *tx)
                .await?;

            for (position, tag) in c.tags.iter().enumerate() {
                sqlx::query("INSERT INTO content_tags (content_id, position, tag) VALUES (?, ?, ?)")
                    .bind(&c.id)
                    .bind(position as i64)
                    .bind(tag)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Persisted usage count of a tag / 已持久化的标签使用次数
    pub async fn tag_usage_count(&self, tag: &str) -> Result<u64, SearchError> {
        let count: Option<i64> = sqlx::query_scalar("SELECT count FROM tag_usage WHERE tag = ?")
            .bind(tag)
            .fetch_optional(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(count.map(from_i64).unwrap_or(0))
    }

    /// Persisted search history size / 搜索历史条数
    pub async fn history_len(&self) -> Result<u64, SearchError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_history")
            .fetch_one(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(from_i64(count))
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn from_i64(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

/// Full-precision timestamp, date ordering must match the other stores / 纳秒精度时间
fn to_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn from_timestamp(raw: &str) -> Result<DateTime<Utc>, SearchError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| backend_err(format!("bad created_at {:?}: {}", raw, e)))
}

#[async_trait]
impl CandidateStore for SqliteStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn fetch_candidates(&self) -> Result<Vec<Candidate>, SearchError> {
        let rows = sqlx::query(
            r#"SELECT id, title, description, short_description, content_type, category,
                      price, currency, author_id, created_at, likes, views, downloads
               FROM contents WHERE published = 1"#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(backend_err)?;

        let tag_rows = sqlx::query(
            r#"SELECT t.content_id, t.tag FROM content_tags t
               JOIN contents c ON c.id = t.content_id
               WHERE c.published = 1
               ORDER BY t.content_id, t.position"#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(backend_err)?;

        let mut tags: HashMap<String, Vec<String>> = HashMap::new();
        for row in tag_rows {
            let id: String = row.try_get("content_id").map_err(backend_err)?;
            let tag: String = row.try_get("tag").map_err(backend_err)?;
            tags.entry(id).or_default().push(tag);
        }

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(backend_err)?;
            let created_at: String = row.try_get("created_at").map_err(backend_err)?;
            candidates.push(Candidate {
                tags: tags.remove(&id).unwrap_or_default(),
                title: row.try_get("title").map_err(backend_err)?,
                description: row.try_get("description").map_err(backend_err)?,
                short_description: row.try_get("short_description").map_err(backend_err)?,
                content_type: row.try_get("content_type").map_err(backend_err)?,
                category: row.try_get("category").map_err(backend_err)?,
                price: row.try_get("price").map_err(backend_err)?,
                currency: row.try_get("currency").map_err(backend_err)?,
                author_id: row.try_get("author_id").map_err(backend_err)?,
                created_at: from_timestamp(&created_at)?,
                counters: Counters {
                    likes: from_i64(row.try_get("likes").map_err(backend_err)?),
                    views: from_i64(row.try_get("views").map_err(backend_err)?),
                    downloads: from_i64(row.try_get("downloads").map_err(backend_err)?),
                },
                published: true,
                id,
            });
        }

        tracing::debug!("sqlite: fetched {} published candidates", candidates.len());
        Ok(candidates)
    }

    async fn insert_batch(&self, items: &[Candidate]) -> Result<usize, SearchError> {
        if items.is_empty() {
            return Ok(0);
        }

        // 重试机制：最多重试3次
        let max_retries = 3;
        let mut last_error = String::new();
        for attempt in 0..max_retries {
            match self.do_insert_batch(items).await {
                Ok(()) => return Ok(items.len()),
                Err(e) => {
                    last_error = e.to_string();
                    if last_error.contains("database is locked") || last_error.contains("SQLITE_BUSY") {
                        let delay = 100 * (attempt + 1) as u64;
                        tracing::debug!(
                            "Database locked, retrying in {}ms (attempt {}/{})",
                            delay,
                            attempt + 1,
                            max_retries
                        );
                        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                        continue;
                    }
                    return Err(backend_err(last_error));
                }
            }
        }

        Err(backend_err(format!(
            "batch insert failed after {} retries: {}",
            max_retries, last_error
        )))
    }

    async fn persist_search(&self, record: &SearchRecord) -> Result<(), SearchError> {
        sqlx::query("INSERT INTO search_history (query, total_results, searched_at) VALUES (?, ?, ?)")
            .bind(&record.query)
            .bind(record.total_results as i64)
            .bind(record.at.timestamp_micros())
            .execute(&self.db)
            .await
            .map_err(|e| SearchError::Analytics(e.to_string()))?;
        Ok(())
    }

    async fn persist_tag_usage(&self, tag: &str) -> Result<(), SearchError> {
        sqlx::query(
            "INSERT INTO tag_usage (tag, count) VALUES (?, 1) ON CONFLICT(tag) DO UPDATE SET count = count + 1",
        )
        .bind(tag)
        .execute(&self.db)
        .await
        .map_err(|e| SearchError::Analytics(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl AuthorDirectory for SqliteStore {
    async fn lookup(&self, author_id: &str) -> Result<Option<AuthorProfile>, SearchError> {
        let row = sqlx::query("SELECT id, username, avatar FROM authors WHERE id = ?")
            .bind(author_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| SearchError::Enrichment {
                author_id: author_id.to_string(),
                reason: e.to_string(),
            })?;

        let Some(row) = row else {
            return Ok(None);
        };
        let profile = AuthorProfile {
            id: row.try_get("id").map_err(backend_err)?,
            username: row.try_get("username").map_err(backend_err)?,
            avatar: row.try_get("avatar").map_err(backend_err)?,
        };
        Ok(Some(profile))
    }

    async fn insert_authors(&self, authors: &[AuthorProfile]) -> Result<usize, SearchError> {
        let mut tx = self.db.begin().await.map_err(backend_err)?;
        for a in authors {
            sqlx::query("INSERT OR REPLACE INTO authors (id, username, avatar) VALUES (?, ?, ?)")
                .bind(&a.id)
                .bind(&a.username)
                .bind(&a.avatar)
                .execute(&mut *tx)
                .await
                .map_err(backend_err)?;
        }
        tx.commit().await.map_err(backend_err)?;
        Ok(authors.len())
    }
}
