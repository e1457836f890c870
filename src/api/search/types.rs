use serde::{Deserialize, Serialize};

/// Default number of popular tags / 默认热门标签数量
pub const DEFAULT_POPULAR_TAGS: usize = 10;
/// Upper bound for list sizes requested over HTTP / 列表数量上限
pub const MAX_LIST_LIMIT: usize = 100;

/// GET /api/search/suggestions
#[derive(Debug, Default, Deserialize)]
pub struct SuggestionParams {
    #[serde(default)]
    pub q: String,
}

/// GET /api/search/popular-tags
#[derive(Debug, Default, Deserialize)]
pub struct PopularTagsParams {
    pub limit: Option<usize>,
}

/// GET /api/search/related
#[derive(Debug, Default, Deserialize)]
pub struct RelatedParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

/// POST /api/content/:id/view
#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub viewer: Option<String>,
}

/// View counting result / 浏览计数结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResult {
    pub content_id: String,
    pub counted: bool,
    pub views: u64,
}

/// Clamp an optional list size into 1..=100 / 限制列表数量
pub fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_LIST_LIMIT)
}
