//! Search error types / 搜索错误类型

use thiserror::Error;

/// A single reason why a query cannot be executed / 查询校验失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryViolation {
    #[error("at least one of text, tags or categories is required")]
    MissingCriteria,
    #[error("text must be at least 2 characters (got {len})")]
    TextTooShort { len: usize },
    #[error("tag #{index} is blank")]
    BlankTag { index: usize },
    #[error("price_min must not be negative")]
    NegativeMinPrice,
    #[error("price_max must be greater than or equal to price_min")]
    InvertedPriceRange,
    #[error("page must be at least 1")]
    PageOutOfRange,
    #[error("limit must be between 1 and 100 (got {limit})")]
    LimitOutOfRange { limit: u32 },
    #[error("invalid value {value:?} for parameter {param}")]
    Unparseable { param: &'static str, value: String },
}

/// Engine error / 引擎错误
#[derive(Debug, Error)]
pub enum SearchError {
    /// Validation failed; the search was not executed / 查询无效
    #[error("invalid query: {}", join_violations(.0))]
    InvalidQuery(Vec<QueryViolation>),

    /// The storage call behind a backend failed / 后端不可用
    #[error("backend {backend} unavailable: {reason}")]
    BackendUnavailable { backend: &'static str, reason: String },

    /// Author lookup failed (non-fatal) / 作者信息查询失败
    #[error("author lookup failed for {author_id}: {reason}")]
    Enrichment { author_id: String, reason: String },

    /// Analytics side-channel failed (never surfaced) / 统计失败
    #[error("analytics failure: {0}")]
    Analytics(String),
}

impl SearchError {
    pub fn backend(backend: &'static str, reason: impl ToString) -> Self {
        SearchError::BackendUnavailable {
            backend,
            reason: reason.to_string(),
        }
    }

    /// Violations carried by an `InvalidQuery`, empty otherwise
    pub fn violations(&self) -> &[QueryViolation] {
        match self {
            SearchError::InvalidQuery(v) => v,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[QueryViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
