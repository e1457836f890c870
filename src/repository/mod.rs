//! Search repository - backends and the operations built on them / 搜索仓库
//!
//! A backend only knows how to hand back the published candidates it holds.
//! `SearchRepository` runs the shared pipeline over them, so every backend
//! yields the same ordered results for the same data.

pub mod authors;
pub mod document;
pub mod memory;
pub mod sqlite;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;

use crate::analytics::{AnalyticsSnapshot, SearchAnalytics, SearchRecord};
use crate::config::{BackendConfig, SearchConfig};
use crate::search::pipeline;
use crate::search::result::assemble;
use crate::search::sorter::Scored;
use crate::search::suggest::{self, MIN_PARTIAL_LEN};
use crate::search::{AuthorProfile, Candidate, SearchError, SearchQuery, SearchResponse, SuggestionSet};

pub use authors::{AuthorDirectory, MemoryAuthorDirectory};
pub use document::DocumentStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Candidate retrieval primitive implemented by every backend / 候选数据源
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Backend name used in logs and stats / 后端名称
    fn name(&self) -> &'static str;

    /// All published candidates, in any order / 获取全部已发布内容
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>, SearchError>;

    /// Insert or replace candidates by id / 批量写入
    async fn insert_batch(&self, items: &[Candidate]) -> Result<usize, SearchError>;

    /// Persist a search record; stores without analytics tables ignore it / 持久化搜索记录
    async fn persist_search(&self, _record: &SearchRecord) -> Result<(), SearchError> {
        Ok(())
    }

    /// Persist one tag usage / 持久化标签使用
    async fn persist_tag_usage(&self, _tag: &str) -> Result<(), SearchError> {
        Ok(())
    }
}

/// Supported backend kinds / 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Document,
    Sqlite,
}

impl BackendKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "memory" => Some(BackendKind::Memory),
            "document" => Some(BackendKind::Document),
            "sqlite" => Some(BackendKind::Sqlite),
            _ => None,
        }
    }
}

/// Store plus the author directory that goes with it / 存储与作者目录
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn CandidateStore>,
    pub authors: Arc<dyn AuthorDirectory>,
}

impl Backend {
    pub fn new(store: Arc<dyn CandidateStore>, authors: Arc<dyn AuthorDirectory>) -> Self {
        Self { store, authors }
    }

    /// Memory store with a memory author directory / 内存后端
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryAuthorDirectory::new()))
    }
}

/// Build the backend selected by configuration / 根据配置创建后端
pub async fn create_store(config: &BackendConfig) -> Result<Backend, SearchError> {
    let kind = BackendKind::parse(&config.kind).ok_or_else(|| {
        SearchError::backend("config", format!("unknown backend kind {:?}", config.kind))
    })?;

    let backend = match kind {
        BackendKind::Memory => Backend::memory(),
        BackendKind::Document => Backend::new(
            Arc::new(DocumentStore::open(config.get_document_path())?),
            Arc::new(MemoryAuthorDirectory::new()),
        ),
        BackendKind::Sqlite => {
            let url = config.get_sqlite_url();
            if url.starts_with("sqlite:") && url.contains("mode=rwc") {
                std::fs::create_dir_all(config.get_data_dir())
                    .map_err(|e| SearchError::backend("sqlite", e))?;
            }
            let store = Arc::new(SqliteStore::connect(&url, 4).await?);
            Backend::new(store.clone(), store)
        }
    };

    tracing::info!("Candidate store selected: {}", backend.store.name());
    Ok(backend)
}

/// Backend and analytics statistics / 搜索统计
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub backend: &'static str,
    pub published_count: usize,
    pub distinct_tags: usize,
    #[serde(flatten)]
    pub analytics: AnalyticsSnapshot,
}

/// Number of top searches / tags reported by stats / 统计排行数量
const STATS_TOP_N: usize = 10;

/// Search repository / 搜索仓库
pub struct SearchRepository {
    backend: Backend,
    analytics: Arc<SearchAnalytics>,
    settings: SearchConfig,
}

impl SearchRepository {
    pub fn new(backend: Backend, analytics: Arc<SearchAnalytics>, settings: SearchConfig) -> Self {
        Self {
            backend,
            analytics,
            settings,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.store.name()
    }

    pub fn analytics(&self) -> &Arc<SearchAnalytics> {
        &self.analytics
    }

    /// Full search: validate, retrieve, rank, enrich, assemble / 执行搜索
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        query.ensure_valid()?;

        let candidates = self.backend.store.fetch_candidates().await?;
        let page = pipeline::run(query, &candidates);
        let authors = self.enrich(&page.items).await;

        let suggested = suggest::suggested_tags(
            &page.filtered,
            &query.normalized_tags(),
            self.settings.suggested_tags_limit,
        );
        let related = match query.text.as_deref() {
            Some(text) if query.has_text() => {
                suggest::related_searches(&candidates, text, self.settings.related_limit)
            }
            _ => Vec::new(),
        };

        Ok(assemble(&page.items, &page.info, &authors, suggested, related))
    }

    /// Concurrent author lookups for one page / 并发查询作者
    ///
    /// Failures are logged; the affected items fall back to placeholder data.
    async fn enrich(&self, items: &[Scored<'_>]) -> HashMap<String, AuthorProfile> {
        let ids: BTreeSet<&str> = items.iter().map(|s| s.candidate.author_id.as_str()).collect();
        let directory = &self.backend.authors;
        let lookups = ids.into_iter().map(|id| async move { (id, directory.lookup(id).await) });

        let mut found = HashMap::new();
        for (id, result) in join_all(lookups).await {
            match result {
                Ok(Some(profile)) => {
                    found.insert(id.to_string(), profile);
                }
                Ok(None) => tracing::debug!("author {} not found, using placeholder", id),
                Err(e) => tracing::warn!("{}", e),
            }
        }
        found
    }

    /// Most used tags across published content / 热门标签
    pub async fn popular_tags(&self, limit: usize) -> Result<Vec<String>, SearchError> {
        let candidates = self.backend.store.fetch_candidates().await?;
        Ok(suggest::popular_tags(&candidates, limit))
    }

    /// Autocomplete / 自动补全
    pub async fn suggestions(&self, partial: &str) -> Result<SuggestionSet, SearchError> {
        if partial.trim().chars().count() < MIN_PARTIAL_LEN {
            return Ok(SuggestionSet::default());
        }
        let candidates = self.backend.store.fetch_candidates().await?;
        Ok(suggest::suggestions(&candidates, partial, self.settings.suggestion_limit))
    }

    /// Related searches for free text / 相关搜索
    pub async fn related_searches(&self, query: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let candidates = self.backend.store.fetch_candidates().await?;
        Ok(suggest::related_searches(&candidates, query, limit))
    }

    /// Related searches with the configured limit / 使用默认上限的相关搜索
    pub async fn related_searches_default(&self, query: &str) -> Result<Vec<String>, SearchError> {
        self.related_searches(query, self.settings.related_limit).await
    }

    /// Backend and analytics statistics / 搜索统计
    pub async fn search_stats(&self) -> Result<SearchStats, SearchError> {
        let candidates = self.backend.store.fetch_candidates().await?;
        Ok(SearchStats {
            backend: self.backend_name(),
            published_count: candidates.len(),
            distinct_tags: suggest::tag_counts(&candidates).len(),
            analytics: self.analytics.snapshot(STATS_TOP_N),
        })
    }

    /// Fire-and-forget tag usage / 记录标签使用（不返回错误）
    pub async fn increment_tag_usage(&self, tag: &str) {
        self.analytics.increment_tag_usage(tag);
        let tag = crate::search::tokenizer::normalize_tag(tag);
        if tag.is_empty() {
            return;
        }
        if let Err(e) = self.backend.store.persist_tag_usage(&tag).await {
            tracing::warn!("Failed to persist tag usage for {}: {}", tag, e);
        }
    }

    /// Fire-and-forget search record / 记录搜索（不返回错误）
    pub async fn record_search(&self, query: &SearchQuery, total_results: usize) {
        let record = self.analytics.record_search(query, total_results);
        if let Err(e) = self.backend.store.persist_search(&record).await {
            tracing::warn!("Failed to persist search {:?}: {}", record.query, e);
        }
    }

    /// Throttled view count, returns whether it counted / 记录浏览
    pub fn record_view(&self, content_id: &str, viewer: &str) -> bool {
        self.analytics.record_view(content_id, viewer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::query::{SortBy, TagsOperator};
    use crate::search::result::PLACEHOLDER_USERNAME;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn dataset() -> Vec<Candidate> {
        let day = |d| Utc.with_ymd_and_hms(2024, 4, d, 10, 0, 0).unwrap();
        vec![
            Candidate::new("c1", "Modelo 3D de Casa Moderna")
                .with_description("Casa moderna con piscina y jardin")
                .with_tags(&["3d", "casa", "arquitectura"])
                .with_content_type("3d")
                .with_price(15.0)
                .with_author("u1")
                .with_counters(10, 100, 5)
                .with_created_at(day(1)),
            Candidate::new("c2", "Casa de campo")
                .with_description("Escena rural")
                .with_tags(&["3d", "casa", "rural"])
                .with_content_type("3d")
                .with_author("u2")
                .with_counters(3, 20, 1)
                .with_created_at(day(2)),
            Candidate::new("c3", "Musica de Stream")
                .with_description("Pista de audio para directos")
                .with_tags(&["audio", "stream"])
                .with_content_type("audio")
                .with_price(4.99)
                .with_author("u1")
                .with_counters(8, 50, 12)
                .with_created_at(day(3)),
            Candidate::new("c4", "Texturas de piedra")
                .with_short_description("Pack de texturas")
                .with_tags(&["texture", "piedra"])
                .with_content_type("texture")
                .with_price(3.0)
                .with_author("u3")
                .with_created_at(day(4)),
            Candidate::new("c5", "Planos de arquitectura moderna")
                .with_tags(&["arquitectura", "planos"])
                .with_content_type("3d")
                .with_price(15.0)
                .with_author("u2")
                .with_counters(10, 100, 5)
                .with_created_at(day(1)),
            // 500ns apart, only full-precision timestamps keep c8 ahead
            Candidate::new("c7", "Busto de marmol")
                .with_tags(&["marmol"])
                .with_content_type("escultura")
                .with_author("u3")
                .with_created_at(day(5)),
            Candidate::new("c8", "Busto de bronce")
                .with_tags(&["bronce"])
                .with_content_type("escultura")
                .with_author("u3")
                .with_created_at(day(5) + chrono::Duration::nanoseconds(500)),
            Candidate::new("c6", "Casa en borrador")
                .with_tags(&["casa"])
                .with_content_type("3d")
                .unpublished(),
        ]
    }

    fn profiles() -> Vec<AuthorProfile> {
        vec![
            AuthorProfile {
                id: "u1".into(),
                username: "lucia".into(),
                avatar: Some("/avatars/u1.png".into()),
            },
            AuthorProfile {
                id: "u2".into(),
                username: "mateo".into(),
                avatar: None,
            },
        ]
    }

    async fn seeded(backend: Backend) -> SearchRepository {
        backend.store.insert_batch(&dataset()).await.unwrap();
        backend.authors.insert_authors(&profiles()).await.unwrap();
        SearchRepository::new(
            backend,
            Arc::new(SearchAnalytics::with_defaults()),
            SearchConfig::default(),
        )
    }

    fn queries() -> Vec<SearchQuery> {
        vec![
            SearchQuery::text("casa moderna"),
            SearchQuery::text("casa").sort_by(SortBy::PriceDesc),
            SearchQuery::default()
                .with_tags(&["3d", "audio"])
                .tags_operator(TagsOperator::Or)
                .sort_by(SortBy::Popularity),
            SearchQuery::default()
                .with_tags(&["casa", "3d"])
                .tags_operator(TagsOperator::And),
            SearchQuery::default()
                .with_categories(&["3d", "texture", "audio"])
                .sort_by(SortBy::PriceAsc)
                .limit(2)
                .page(2),
            SearchQuery::default()
                .with_categories(&["3d", "audio", "texture"])
                .sort_by(SortBy::Date),
            SearchQuery::default().with_categories(&["3D"]).free(true),
            SearchQuery::text("arquitectura").with_price_range(10.0, 20.0),
            SearchQuery::default()
                .with_categories(&["escultura"])
                .sort_by(SortBy::Date),
        ]
    }

    #[tokio::test]
    async fn test_backends_return_identical_order() {
        let dir = tempfile::tempdir().unwrap();
        let document = Backend::new(
            Arc::new(DocumentStore::open(dir.path().join("contents.jsonl")).unwrap()),
            Arc::new(MemoryAuthorDirectory::new()),
        );
        let sqlite_store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let sqlite = Backend::new(sqlite_store.clone(), sqlite_store);

        let repos = vec![
            seeded(Backend::memory()).await,
            seeded(document).await,
            seeded(sqlite).await,
        ];

        let sculptures = SearchQuery::default()
            .with_categories(&["escultura"])
            .sort_by(SortBy::Date);
        for repo in &repos {
            let resp = repo.search(&sculptures).await.unwrap();
            assert_eq!(resp.ids(), vec!["c8", "c7"], "{}", repo.backend_name());
        }

        for q in queries() {
            let mut sequences = Vec::new();
            for repo in &repos {
                let resp = repo.search(&q).await.unwrap();
                let ids: Vec<String> = resp.ids().iter().map(|s| s.to_string()).collect();
                sequences.push((repo.backend_name(), ids, resp.total));
            }
            for other in &sequences[1..] {
                assert_eq!(
                    (&sequences[0].1, sequences[0].2),
                    (&other.1, other.2),
                    "{} and {} disagree on {}",
                    sequences[0].0,
                    other.0,
                    q.encode()
                );
            }
        }
    }

    #[tokio::test]
    async fn test_search_enriches_and_annotates() {
        let repo = seeded(Backend::memory()).await;
        let resp = repo.search(&SearchQuery::text("casa")).await.unwrap();

        // unpublished c6 is never returned
        assert_eq!(resp.total, 2);
        assert_eq!(resp.ids(), vec!["c1", "c2"]);
        assert_eq!(resp.items[0].author_username, "lucia");
        assert_eq!(resp.items[0].display_price, "15.00 USD");
        assert_eq!(resp.items[1].author_username, "mateo");
        assert_eq!(resp.items[1].display_price, "Gratis");
        assert_eq!(resp.stats.showing, "1-2 de 2");
        assert_eq!(
            resp.suggested_tags.as_deref(),
            Some(&["3d".to_string(), "casa".to_string(), "arquitectura".to_string(), "rural".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_unknown_author_gets_placeholder() {
        let repo = seeded(Backend::memory()).await;
        let resp = repo
            .search(&SearchQuery::default().with_tags(&["piedra"]))
            .await
            .unwrap();
        assert_eq!(resp.ids(), vec!["c4"]);
        assert_eq!(resp.items[0].author_username, PLACEHOLDER_USERNAME);
        assert!(resp.items[0].author_avatar.is_none());
        assert!(resp.related_searches.is_none());
    }

    struct FailingAuthors;

    #[async_trait]
    impl AuthorDirectory for FailingAuthors {
        async fn lookup(&self, author_id: &str) -> Result<Option<AuthorProfile>, SearchError> {
            Err(SearchError::Enrichment {
                author_id: author_id.to_string(),
                reason: "timeout".into(),
            })
        }

        async fn insert_authors(&self, authors: &[AuthorProfile]) -> Result<usize, SearchError> {
            Ok(authors.len())
        }
    }

    #[tokio::test]
    async fn test_enrichment_failure_does_not_fail_search() {
        let backend = Backend::new(Arc::new(MemoryStore::new()), Arc::new(FailingAuthors));
        let repo = seeded(backend).await;
        let resp = repo.search(&SearchQuery::text("casa")).await.unwrap();
        assert_eq!(resp.items.len(), 2);
        assert!(resp.items.iter().all(|i| i.author_username == PLACEHOLDER_USERNAME));
    }

    /// Store that counts calls and can be switched to fail
    struct CountingStore {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CandidateStore for CountingStore {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_candidates(&self) -> Result<Vec<Candidate>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SearchError::backend("counting", "connection refused"))
            } else {
                Ok(dataset().into_iter().filter(|c| c.published).collect())
            }
        }

        async fn insert_batch(&self, items: &[Candidate]) -> Result<usize, SearchError> {
            Ok(items.len())
        }
    }

    fn counting_repo(fail: bool) -> (Arc<CountingStore>, SearchRepository) {
        let store = Arc::new(CountingStore {
            calls: AtomicUsize::new(0),
            fail,
        });
        let repo = SearchRepository::new(
            Backend::new(store.clone(), Arc::new(MemoryAuthorDirectory::new())),
            Arc::new(SearchAnalytics::with_defaults()),
            SearchConfig::default(),
        );
        (store, repo)
    }

    #[tokio::test]
    async fn test_invalid_query_never_reaches_backend() {
        let (store, repo) = counting_repo(false);
        let err = repo.search(&SearchQuery::text("a").limit(0)).await.unwrap_err();
        assert_eq!(err.violations().len(), 2);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let (_, repo) = counting_repo(true);
        let err = repo.search(&SearchQuery::text("casa")).await.unwrap_err();
        assert!(matches!(err, SearchError::BackendUnavailable { backend: "counting", .. }));
        assert!(repo.popular_tags(5).await.is_err());
    }

    #[tokio::test]
    async fn test_short_partial_skips_backend() {
        let (store, repo) = counting_repo(false);
        assert!(repo.suggestions("c").await.unwrap().is_empty());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);

        let set = repo.suggestions("ca").await.unwrap();
        assert!(set.tag_values().contains(&"casa"));
        assert!(set.tag_values().contains(&"arquitectura"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_related_and_popular() {
        let repo = seeded(Backend::memory()).await;
        let related = repo.related_searches_default("casa moderna").await.unwrap();
        // same overlap, the more popular title first
        assert_eq!(related, vec!["Planos de arquitectura moderna", "Casa de campo"]);

        let popular = repo.popular_tags(2).await.unwrap();
        assert_eq!(popular, vec!["3d", "arquitectura"]);
    }

    #[tokio::test]
    async fn test_analytics_and_stats() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let repo = seeded(Backend::new(store.clone(), store.clone())).await;

        let q = SearchQuery::text("casa").with_tags(&["3d"]);
        let resp = repo.search(&q).await.unwrap();
        repo.record_search(&q, resp.total).await;
        repo.increment_tag_usage("3D").await;
        repo.increment_tag_usage("  ").await;

        assert_eq!(store.history_len().await.unwrap(), 1);
        assert_eq!(store.tag_usage_count("3d").await.unwrap(), 1);

        let stats = repo.search_stats().await.unwrap();
        assert_eq!(stats.backend, "sqlite");
        assert_eq!(stats.published_count, 7);
        assert_eq!(stats.analytics.total_searches, 1);
        assert_eq!(stats.analytics.top_used_tags, vec![("3d".to_string(), 1)]);

        assert!(repo.record_view("c1", "10.0.0.1"));
        assert!(!repo.record_view("c1", "10.0.0.1"));
    }

    /// Memory store whose analytics persistence always fails
    struct NoAnalyticsStore(MemoryStore);

    #[async_trait]
    impl CandidateStore for NoAnalyticsStore {
        fn name(&self) -> &'static str {
            "no-analytics"
        }

        async fn fetch_candidates(&self) -> Result<Vec<Candidate>, SearchError> {
            self.0.fetch_candidates().await
        }

        async fn insert_batch(&self, items: &[Candidate]) -> Result<usize, SearchError> {
            self.0.insert_batch(items).await
        }

        async fn persist_search(&self, _record: &SearchRecord) -> Result<(), SearchError> {
            Err(SearchError::Analytics("disk full".into()))
        }

        async fn persist_tag_usage(&self, _tag: &str) -> Result<(), SearchError> {
            Err(SearchError::Analytics("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_analytics_persistence_failure_is_swallowed() {
        let backend = Backend::new(
            Arc::new(NoAnalyticsStore(MemoryStore::new())),
            Arc::new(MemoryAuthorDirectory::new()),
        );
        let repo = seeded(backend).await;

        let q = SearchQuery::text("casa").with_tags(&["3d"]);
        let resp = repo.search(&q).await.unwrap();
        repo.record_search(&q, resp.total).await;
        repo.increment_tag_usage("3d").await;
        assert!(repo.search(&q).await.is_ok());

        // in-memory analytics still see both updates
        let stats = repo.search_stats().await.unwrap();
        assert_eq!(stats.analytics.total_searches, 1);
        assert_eq!(stats.analytics.top_used_tags, vec![("3d".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_factory_rejects_unknown_kind() {
        let config = BackendConfig {
            kind: "cassandra".into(),
            ..BackendConfig::default()
        };
        assert!(create_store(&config).await.is_err());

        let dir = tempfile::tempdir().unwrap();
        let config = BackendConfig {
            kind: "Document".into(),
            data_dir: dir.path().to_string_lossy().to_string(),
            ..BackendConfig::default()
        };
        let backend = create_store(&config).await.unwrap();
        assert_eq!(backend.store.name(), "document");
    }
}
