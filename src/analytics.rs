//! Best-effort search analytics / 搜索统计（尽力而为）
//!
//! Tag usage, search history and throttled view counters. Updates never wait
//! on a contended lock: when another writer holds it the update is dropped,
//! counts are approximate by contract.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::search::tokenizer::{normalize, normalize_tag};
use crate::search::SearchQuery;

/// Time source, injectable for tests / 时间源
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock / 系统时间
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock / 手动时钟
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Entries kept before stale ones are pruned / 触发清理的条目数
const THROTTLE_PRUNE_THRESHOLD: usize = 10_000;

/// Counts a (content, viewer) view at most once per window / 浏览量节流
pub struct ViewThrottle {
    clock: Arc<dyn Clock>,
    window: Duration,
    last_counted: Mutex<HashMap<(String, String), DateTime<Utc>>>,
}

impl ViewThrottle {
    pub fn new(clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            clock,
            window,
            last_counted: Mutex::new(HashMap::new()),
        }
    }

    /// Whether this view should be counted; records it when it is / 是否计入本次浏览
    pub fn should_count(&self, content_id: &str, viewer: &str) -> bool {
        let now = self.clock.now();
        let mut seen = self.last_counted.lock();

        if seen.len() > THROTTLE_PRUNE_THRESHOLD {
            let window = self.window;
            seen.retain(|_, at| now - *at < window);
        }

        let key = (content_id.to_string(), viewer.to_string());
        match seen.get(&key) {
            Some(at) if now - *at < self.window => false,
            _ => {
                seen.insert(key, now);
                true
            }
        }
    }

    pub fn tracked(&self) -> usize {
        self.last_counted.lock().len()
    }
}

/// One recorded search / 搜索记录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub query: String,
    pub total_results: usize,
    pub at: DateTime<Utc>,
}

/// Point-in-time view of the counters / 统计快照
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub total_searches: u64,
    pub top_searches: Vec<(String, u64)>,
    pub top_used_tags: Vec<(String, u64)>,
    pub last_search_at: Option<DateTime<Utc>>,
}

/// Analytics side-channel / 统计旁路
pub struct SearchAnalytics {
    clock: Arc<dyn Clock>,
    total_searches: AtomicU64,
    query_counts: RwLock<HashMap<String, u64>>,
    tag_usage: RwLock<HashMap<String, u64>>,
    history: Mutex<VecDeque<SearchRecord>>,
    history_capacity: usize,
    views: RwLock<HashMap<String, u64>>,
    throttle: ViewThrottle,
}

impl SearchAnalytics {
    pub fn new(clock: Arc<dyn Clock>, history_capacity: usize, view_window: Duration) -> Self {
        Self {
            throttle: ViewThrottle::new(clock.clone(), view_window),
            clock,
            total_searches: AtomicU64::new(0),
            query_counts: RwLock::new(HashMap::new()),
            tag_usage: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
            history_capacity,
            views: RwLock::new(HashMap::new()),
        }
    }

    /// Wall clock, default capacity, one hour view window / 默认配置
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(SystemClock), 1000, Duration::hours(1))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record a finished search, returns the history entry / 记录一次搜索
    pub fn record_search(&self, query: &SearchQuery, total_results: usize) -> SearchRecord {
        self.total_searches.fetch_add(1, Ordering::Relaxed);

        let key = match query.text.as_deref() {
            Some(text) if !text.trim().is_empty() => normalize(text),
            _ => query.encode(),
        };
        let record = SearchRecord {
            query: key,
            total_results,
            at: self.clock.now(),
        };

        match self.query_counts.try_write() {
            Some(mut counts) => *counts.entry(record.query.clone()).or_default() += 1,
            None => tracing::debug!("analytics: query counter busy, dropping update"),
        }

        if self.history_capacity > 0 {
            if let Some(mut history) = self.history.try_lock() {
                while history.len() >= self.history_capacity {
                    history.pop_front();
                }
                history.push_back(record.clone());
            }
        }
        record
    }

    /// Bump the usage counter of a tag / 增加标签使用次数
    pub fn increment_tag_usage(&self, tag: &str) {
        let tag = normalize_tag(tag);
        if tag.is_empty() {
            return;
        }
        match self.tag_usage.try_write() {
            Some(mut usage) => *usage.entry(tag).or_default() += 1,
            None => tracing::debug!("analytics: tag counter busy, dropping update"),
        }
    }

    /// Throttled view count; returns whether the view counted / 记录浏览
    pub fn record_view(&self, content_id: &str, viewer: &str) -> bool {
        if !self.throttle.should_count(content_id, viewer) {
            return false;
        }
        if let Some(mut views) = self.views.try_write() {
            *views.entry(content_id.to_string()).or_default() += 1;
        }
        true
    }

    /// Views counted since startup / 启动以来的浏览数
    pub fn views(&self, content_id: &str) -> u64 {
        self.views.read().get(content_id).copied().unwrap_or(0)
    }

    pub fn tag_usage(&self, tag: &str) -> u64 {
        self.tag_usage
            .read()
            .get(&normalize_tag(tag))
            .copied()
            .unwrap_or(0)
    }

    pub fn recent_searches(&self) -> Vec<SearchRecord> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn snapshot(&self, top_n: usize) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            total_searches: self.total_searches.load(Ordering::Relaxed),
            top_searches: top_entries(&self.query_counts.read(), top_n),
            top_used_tags: top_entries(&self.tag_usage.read(), top_n),
            last_search_at: self.history.lock().back().map(|r| r.at),
        }
    }
}

fn top_entries(counts: &HashMap<String, u64>, top_n: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(top_n);
    entries
}
