use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use market_search::analytics::{SearchAnalytics, SystemClock};
use market_search::config;
use market_search::repository::{self, SearchRepository};
use market_search::seed;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_search=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config()?;
    tracing::info!(
        "Server will listen on {}:{} (backend: {})",
        app_config.server.host,
        app_config.server.port,
        app_config.backend.kind
    );

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.backend.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let backend = repository::create_store(&app_config.backend)
        .await
        .context("Failed to open candidate store")?;

    if let Some(seed_path) = app_config.backend.get_seed_path() {
        let data = seed::load_seed(&seed_path)?;
        seed::apply_seed(&data, &backend)
            .await
            .with_context(|| format!("Failed to seed store from {:?}", seed_path))?;
    }

    let analytics = SearchAnalytics::new(
        Arc::new(SystemClock),
        app_config.search.history_capacity,
        chrono::Duration::seconds(app_config.search.view_throttle_secs as i64),
    );
    let repository = SearchRepository::new(backend, Arc::new(analytics), app_config.search.clone());

    let state = Arc::new(AppState::new(repository, app_config.clone()));
    let app = api::router(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
