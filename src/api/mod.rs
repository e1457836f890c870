pub mod search;
pub mod server;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use market_search::search::SearchError;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: None,
        }
    }
}

/// Handler error mapped to an HTTP status / 接口错误
#[derive(Debug)]
pub struct ApiError(pub SearchError);

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            SearchError::InvalidQuery(violations) => {
                let details: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                let body = ApiResponse {
                    code: 400,
                    message: "invalid query".to_string(),
                    data: Some(details),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            SearchError::BackendUnavailable { .. } => {
                tracing::error!("{}", self.0);
                let body = ApiResponse::<()>::error(503, "search backend unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
            // 作者与统计错误不会传到这里，兜底为 500
            _ => {
                tracing::error!("{}", self.0);
                let body = ApiResponse::<()>::error(500, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

/// Build the HTTP router / 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(server::health_check))
        .route("/api/search", get(search::search))
        .route("/api/search/suggestions", get(search::suggestions))
        .route("/api/search/popular-tags", get(search::popular_tags))
        .route("/api/search/related", get(search::related))
        .route("/api/search/stats", get(search::stats))
        .route("/api/content/:id/view", post(search::record_view))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
