use std::sync::Arc;

use chrono::{DateTime, Utc};
use market_search::config::AppConfig;
use market_search::repository::SearchRepository;

/// Shared handler state / 共享状态
pub struct AppState {
    pub repository: Arc<SearchRepository>,
    pub config: AppConfig,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(repository: SearchRepository, config: AppConfig) -> Self {
        Self {
            repository: Arc::new(repository),
            config,
            started_at: Utc::now(),
        }
    }
}
