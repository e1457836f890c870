//! Query model - canonical search request / 查询模型
//!
//! A `SearchQuery` is built once per request (from the URL form or the builder
//! methods) and only read afterwards. `validate` collects every violation
//! instead of stopping at the first one.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use super::error::{QueryViolation, SearchError};
use super::tokenizer::{normalize_tag, split_csv, tokenize_query};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;
/// Minimum text length in characters / 最短查询长度
pub const MIN_TEXT_LEN: usize = 2;

/// Multi-tag semantics / 多标签匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagsOperator {
    And,
    #[default]
    Or,
}

impl TagsOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagsOperator::And => "AND",
            TagsOperator::Or => "OR",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(TagsOperator::And),
            "OR" => Some(TagsOperator::Or),
            _ => None,
        }
    }
}

/// Sort strategy / 排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Date,
    Popularity,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::PriceAsc => "price_asc",
            SortBy::PriceDesc => "price_desc",
            SortBy::Date => "date",
            SortBy::Popularity => "popularity",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(SortBy::Relevance),
            "price_asc" => Some(SortBy::PriceAsc),
            "price_desc" => Some(SortBy::PriceDesc),
            "date" => Some(SortBy::Date),
            "popularity" => Some(SortBy::Popularity),
            _ => None,
        }
    }
}

/// Inclusive price bounds; an open upper bound is `f64::INFINITY` / 价格区间
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }
}

/// Canonical search request / 搜索请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub text: Option<String>,
    pub tags: Vec<String>,
    pub tags_operator: TagsOperator,
    pub categories: Vec<String>,
    pub price_range: Option<PriceRange>,
    pub is_free: Option<bool>,
    pub author_id: Option<String>,
    pub sort_by: SortBy,
    pub page: u32,
    pub limit: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            tags: Vec::new(),
            tags_operator: TagsOperator::default(),
            categories: Vec::new(),
            price_range: None,
            is_free: None,
            author_id: None,
            sort_by: SortBy::default(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchQuery {
    /// Text query with default options / 文本查询
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn tags_operator(mut self, op: TagsOperator) -> Self {
        self.tags_operator = op;
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_price_range(mut self, min: f64, max: f64) -> Self {
        self.price_range = Some(PriceRange::new(min, max));
        self
    }

    pub fn free(mut self, is_free: bool) -> Self {
        self.is_free = Some(is_free);
        self
    }

    pub fn by_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }

    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort_by = sort;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Lowercase whitespace-split terms of `text` / 查询词项
    pub fn terms(&self) -> Vec<String> {
        self.text.as_deref().map(tokenize_query).unwrap_or_default()
    }

    /// Whether `text` carries at least one term / 是否有文本条件
    pub fn has_text(&self) -> bool {
        self.text
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }

    /// Requested tags, trimmed and lowercased / 标准化后的标签
    pub fn normalized_tags(&self) -> Vec<String> {
        self.tags.iter().map(|t| normalize_tag(t)).collect()
    }

    /// Collect all violations (does not short-circuit) / 校验查询
    pub fn validate(&self) -> Vec<QueryViolation> {
        let mut violations = Vec::new();

        if self.text.is_none() && self.tags.is_empty() && self.categories.is_empty() {
            violations.push(QueryViolation::MissingCriteria);
        }

        if let Some(text) = &self.text {
            let len = text.trim().chars().count();
            if len < MIN_TEXT_LEN {
                violations.push(QueryViolation::TextTooShort { len });
            }
        }

        for (index, tag) in self.tags.iter().enumerate() {
            if tag.trim().is_empty() {
                violations.push(QueryViolation::BlankTag { index });
            }
        }

        if let Some(range) = &self.price_range {
            if range.min < 0.0 {
                violations.push(QueryViolation::NegativeMinPrice);
            }
            if range.max < range.min {
                violations.push(QueryViolation::InvertedPriceRange);
            }
        }

        if self.page < 1 {
            violations.push(QueryViolation::PageOutOfRange);
        }

        if self.limit < 1 || self.limit > MAX_LIMIT {
            violations.push(QueryViolation::LimitOutOfRange { limit: self.limit });
        }

        violations
    }

    /// Searchable = no violations / 是否可执行
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validate, turning violations into `InvalidQuery` / 校验并返回错误
    pub fn ensure_valid(&self) -> Result<(), SearchError> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SearchError::InvalidQuery(violations))
        }
    }

    /// Decode the URL form (`q`, `tags`, `categories`, `tags_operator`, `sort`,
    /// `page`, `limit`, `price_min`, `price_max`, `free`, `author`).
    ///
    /// Parse errors and validation violations are reported together.
    /// 解析 URL 查询串
    pub fn decode(query_string: &str) -> Result<SearchQuery, SearchError> {
        let raw = query_string.trim_start_matches('?');
        let mut query = SearchQuery::default();
        let mut violations = Vec::new();
        let mut price_min: Option<f64> = None;
        let mut price_max: Option<f64> = None;

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                "q" => {
                    query.text = if value.is_empty() { None } else { Some(value.to_string()) };
                }
                "tags" => query.tags = split_csv(value),
                "categories" => query.categories = split_csv(value),
                "tags_operator" => match TagsOperator::parse(value) {
                    Some(op) => query.tags_operator = op,
                    None => violations.push(unparseable("tags_operator", value)),
                },
                "sort" => match SortBy::parse(value) {
                    Some(sort) => query.sort_by = sort,
                    None => violations.push(unparseable("sort", value)),
                },
                "page" => match value.parse::<u32>() {
                    Ok(page) => query.page = page,
                    Err(_) => violations.push(unparseable("page", value)),
                },
                "limit" => match value.parse::<u32>() {
                    Ok(limit) => query.limit = limit,
                    Err(_) => violations.push(unparseable("limit", value)),
                },
                "price_min" => match parse_price(value) {
                    Some(p) => price_min = Some(p),
                    None => violations.push(unparseable("price_min", value)),
                },
                "price_max" => match parse_price(value) {
                    Some(p) => price_max = Some(p),
                    None => violations.push(unparseable("price_max", value)),
                },
                "free" => match value.to_ascii_lowercase().as_str() {
                    "true" => query.is_free = Some(true),
                    "false" => query.is_free = Some(false),
                    _ => violations.push(unparseable("free", value)),
                },
                "author" => {
                    query.author_id = if value.is_empty() { None } else { Some(value.to_string()) };
                }
                // 忽略未知参数
                _ => {}
            }
        }

        if price_min.is_some() || price_max.is_some() {
            query.price_range = Some(PriceRange::new(
                price_min.unwrap_or(0.0),
                price_max.unwrap_or(f64::INFINITY),
            ));
        }

        violations.extend(query.validate());
        if violations.is_empty() {
            Ok(query)
        } else {
            Err(SearchError::InvalidQuery(violations))
        }
    }

    /// Encode back to the URL form, emitting only non-default values / 编码为查询串
    pub fn encode(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());

        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            out.append_pair("q", text);
        }
        if !self.tags.is_empty() {
            out.append_pair("tags", &self.tags.join(","));
        }
        if self.tags_operator != TagsOperator::default() {
            out.append_pair("tags_operator", self.tags_operator.as_str());
        }
        if !self.categories.is_empty() {
            out.append_pair("categories", &self.categories.join(","));
        }
        if let Some(range) = &self.price_range {
            // an open range still needs one bound to decode back into a range
            if range.min != 0.0 || !range.max.is_finite() {
                out.append_pair("price_min", &range.min.to_string());
            }
            if range.max.is_finite() {
                out.append_pair("price_max", &range.max.to_string());
            }
        }
        if let Some(free) = self.is_free {
            out.append_pair("free", if free { "true" } else { "false" });
        }
        if let Some(author) = &self.author_id {
            out.append_pair("author", author);
        }
        if self.sort_by != SortBy::default() {
            out.append_pair("sort", self.sort_by.as_str());
        }
        if self.page != DEFAULT_PAGE {
            out.append_pair("page", &self.page.to_string());
        }
        if self.limit != DEFAULT_LIMIT {
            out.append_pair("limit", &self.limit.to_string());
        }

        out.finish()
    }
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|p| p.is_finite())
}

fn unparseable(param: &'static str, value: &str) -> QueryViolation {
    QueryViolation::Unparseable {
        param,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let q = SearchQuery::text("casa");
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 20);
        assert_eq!(q.sort_by, SortBy::Relevance);
        assert_eq!(q.tags_operator, TagsOperator::Or);
        assert!(q.is_valid());
    }

    #[test]
    fn test_validate_collects_every_violation() {
        let q = SearchQuery::default()
            .with_price_range(-5.0, -10.0)
            .page(0)
            .limit(101);
        let violations = q.validate();
        assert_eq!(
            violations,
            vec![
                QueryViolation::MissingCriteria,
                QueryViolation::NegativeMinPrice,
                QueryViolation::InvertedPriceRange,
                QueryViolation::PageOutOfRange,
                QueryViolation::LimitOutOfRange { limit: 101 },
            ]
        );
    }

    #[test]
    fn test_validate_text_and_tags() {
        let q = SearchQuery::text("a").with_tags(&["audio", "  "]);
        assert_eq!(
            q.validate(),
            vec![
                QueryViolation::TextTooShort { len: 1 },
                QueryViolation::BlankTag { index: 1 },
            ]
        );
    }

    #[test]
    fn test_tags_or_categories_alone_are_searchable() {
        assert!(SearchQuery::default().with_tags(&["audio"]).is_valid());
        assert!(SearchQuery::default().with_categories(&["3d"]).is_valid());
        assert!(!SearchQuery::default().is_valid());
    }

    #[test]
    fn test_limit_bounds() {
        assert!(SearchQuery::text("casa").limit(1).is_valid());
        assert!(SearchQuery::text("casa").limit(100).is_valid());
        assert!(!SearchQuery::text("casa").limit(0).is_valid());
    }

    #[test]
    fn test_decode_full() {
        let q = SearchQuery::decode(
            "?q=casa+moderna&tags=audio,%203d&tags_operator=and&categories=3d&sort=price_desc&page=2&limit=10&price_min=1.5&price_max=20&free=false&author=u1",
        )
        .unwrap();
        assert_eq!(q.text.as_deref(), Some("casa moderna"));
        assert_eq!(q.tags, vec!["audio", "3d"]);
        assert_eq!(q.tags_operator, TagsOperator::And);
        assert_eq!(q.categories, vec!["3d"]);
        assert_eq!(q.sort_by, SortBy::PriceDesc);
        assert_eq!(q.page, 2);
        assert_eq!(q.limit, 10);
        assert_eq!(q.price_range, Some(PriceRange::new(1.5, 20.0)));
        assert_eq!(q.is_free, Some(false));
        assert_eq!(q.author_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_decode_reports_parse_and_validation_errors_together() {
        let err = SearchQuery::decode("page=abc&sort=random&limit=500").unwrap_err();
        let violations = err.violations();
        assert!(violations.contains(&QueryViolation::Unparseable {
            param: "page",
            value: "abc".to_string()
        }));
        assert!(violations.contains(&QueryViolation::Unparseable {
            param: "sort",
            value: "random".to_string()
        }));
        assert!(violations.contains(&QueryViolation::MissingCriteria));
        assert!(violations.contains(&QueryViolation::LimitOutOfRange { limit: 500 }));
    }

    #[test]
    fn test_decode_open_price_bound() {
        let q = SearchQuery::decode("q=casa&price_min=5").unwrap();
        let range = q.price_range.unwrap();
        assert_eq!(range.min, 5.0);
        assert!(range.max.is_infinite());
        assert!(range.contains(1_000_000.0));
    }

    #[test]
    fn test_encode_only_non_defaults() {
        assert_eq!(SearchQuery::text("casa").encode(), "q=casa");
        let q = SearchQuery::text("casa moderna")
            .with_tags(&["audio", "3d"])
            .tags_operator(TagsOperator::And)
            .sort_by(SortBy::Date)
            .page(3);
        assert_eq!(
            q.encode(),
            "q=casa+moderna&tags=audio%2C3d&tags_operator=AND&sort=date&page=3"
        );
    }

    #[test]
    fn test_zero_min_open_range_survives_encode() {
        let q = SearchQuery::decode("q=casa&price_min=0").unwrap();
        assert_eq!(q.price_range, Some(PriceRange::new(0.0, f64::INFINITY)));
        assert_eq!(q.encode(), "q=casa&price_min=0");
        assert!(!SearchQuery::decode(&q.encode()).unwrap().price_range.unwrap().contains(-1.0));
    }

    #[test]
    fn test_decode_encode_decode_is_stable() {
        let inputs = [
            "q=casa&tags=audio,3d&tags_operator=AND&page=2&limit=5",
            "categories=3d,audio&price_min=0&price_max=10.25&free=true&sort=popularity",
            "tags=Texturas&author=u-9&price_min=3",
            "q=casa&price_min=0",
        ];
        for input in inputs {
            let first = SearchQuery::decode(input).unwrap();
            let second = SearchQuery::decode(&first.encode()).unwrap();
            assert_eq!(first, second, "input: {}", input);
            assert_eq!(first.encode(), second.encode());
        }
    }
}
