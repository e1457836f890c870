//! Result assembler - page + metadata + suggestions / 结果组装

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::paginate::PageInfo;
use super::schema::{display_price, is_free, AuthorProfile, Candidate};
use super::sorter::Scored;

/// Username shown when the author lookup fails / 作者查询失败时的占位名
pub const PLACEHOLDER_USERNAME: &str = "Desconocido";

/// One enriched result row / 搜索结果项
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    pub tags: Vec<String>,
    pub content_type: String,
    pub category: String,
    pub price: f64,
    pub currency: String,
    pub is_free: bool,
    pub display_price: String,
    pub author_id: String,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub views: u64,
    pub downloads: u64,
    pub score: u64,
}

impl SearchItem {
    pub fn new(scored: &Scored<'_>, author: Option<&AuthorProfile>) -> Self {
        let c: &Candidate = scored.candidate;
        Self {
            id: c.id.clone(),
            title: c.title.clone(),
            description: c.description.clone(),
            short_description: c.short_description.clone(),
            tags: c.tags.clone(),
            content_type: c.content_type.clone(),
            category: c.category.clone(),
            price: c.price,
            currency: c.currency.clone(),
            is_free: is_free(c),
            display_price: display_price(c),
            author_id: c.author_id.clone(),
            author_username: author
                .map(|a| a.username.clone())
                .unwrap_or_else(|| PLACEHOLDER_USERNAME.to_string()),
            author_avatar: author.and_then(|a| a.avatar.clone()),
            created_at: c.created_at,
            likes: c.counters.likes,
            views: c.counters.views,
            downloads: c.counters.downloads,
            score: scored.score,
        }
    }
}

/// Display statistics / 展示统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStats {
    pub total: usize,
    pub current_page: u32,
    pub total_pages: u32,
    pub items_per_page: u32,
    /// e.g. "1-20 de 57"
    pub showing: String,
}

impl ResultStats {
    pub fn new(info: &PageInfo, shown: usize) -> Self {
        let showing = if shown == 0 {
            format!("0 de {}", info.total)
        } else {
            let first = info.offset() + 1;
            format!("{}-{} de {}", first, first + shown - 1, info.total)
        };
        Self {
            total: info.total,
            current_page: info.page,
            total_pages: info.total_pages,
            items_per_page: info.limit,
            showing,
        }
    }
}

/// Search response / 搜索响应
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
    pub total: usize,
    pub page: u32,
    pub total_pages: u32,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_searches: Option<Vec<String>>,
    pub stats: ResultStats,
}

impl SearchResponse {
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.id.as_str()).collect()
    }
}

/// Package one page with its metadata / 组装响应
pub fn assemble(
    items: &[Scored<'_>],
    info: &PageInfo,
    authors: &HashMap<String, AuthorProfile>,
    suggested_tags: Vec<String>,
    related_searches: Vec<String>,
) -> SearchResponse {
    let items: Vec<SearchItem> = items
        .iter()
        .map(|s| SearchItem::new(s, authors.get(&s.candidate.author_id)))
        .collect();
    let stats = ResultStats::new(info, items.len());

    SearchResponse {
        total: info.total,
        page: info.page,
        total_pages: info.total_pages,
        has_more: info.has_more,
        suggested_tags: non_empty(suggested_tags),
        related_searches: non_empty(related_searches),
        stats,
        items,
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
