use axum::{
    extract::{Path, Query, RawQuery, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use market_search::repository::SearchStats;
use market_search::search::{SearchQuery, SearchResponse, SuggestionSet};

use super::types::*;
use crate::api::{ApiError, ApiResponse};
use crate::state::AppState;

/// GET /api/search - 搜索
pub async fn search(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let query = SearchQuery::decode(raw.as_deref().unwrap_or(""))?;
    let response = state.repository.search(&query).await?;

    tracing::debug!(
        "search {:?}: {} results, page {}/{}",
        query.encode(),
        response.total,
        response.page,
        response.total_pages
    );

    // 统计在响应计算完成后异步执行
    let repository = state.repository.clone();
    let total = response.total;
    tokio::spawn(async move {
        repository.record_search(&query, total).await;
        for tag in &query.tags {
            repository.increment_tag_usage(tag).await;
        }
    });

    Ok(Json(ApiResponse::success(response)))
}

/// GET /api/search/suggestions?q= - 自动补全
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<ApiResponse<SuggestionSet>>, ApiError> {
    let set = state.repository.suggestions(&params.q).await?;
    Ok(Json(ApiResponse::success(set)))
}

/// GET /api/search/popular-tags?limit= - 热门标签
pub async fn popular_tags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PopularTagsParams>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let limit = clamp_limit(params.limit, DEFAULT_POPULAR_TAGS);
    let tags = state.repository.popular_tags(limit).await?;
    Ok(Json(ApiResponse::success(tags)))
}

/// GET /api/search/related?q=&limit= - 相关搜索
pub async fn related(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RelatedParams>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let limit = clamp_limit(params.limit, state.config.search.related_limit);
    let related = state.repository.related_searches(&params.q, limit).await?;
    Ok(Json(ApiResponse::success(related)))
}

/// GET /api/search/stats - 搜索统计
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<SearchStats>>, ApiError> {
    let stats = state.repository.search_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// POST /api/content/:id/view - 记录浏览
///
/// The viewer is taken from `?viewer=`, then `x-forwarded-for`, else "anonymous".
pub async fn record_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ViewParams>,
    headers: HeaderMap,
) -> Json<ApiResponse<ViewResult>> {
    let viewer = params
        .viewer
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .unwrap_or_else(|| "anonymous".to_string());

    let counted = state.repository.record_view(&id, &viewer);
    let views = state.repository.analytics().views(&id);
    Json(ApiResponse::success(ViewResult {
        content_id: id,
        counted,
        views,
    }))
}
