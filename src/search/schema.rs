//! Content snapshot visible to search / 搜索可见的内容快照

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engagement counters / 互动计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub likes: u64,
    pub views: u64,
    pub downloads: u64,
}

/// Candidate - read-only content record owned by the content store / 候选内容
///
/// `is_free`, `display_price` and `popularity` are derived on demand and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content_type: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub counters: Counters,
    /// Unpublished content is invisible to search / 未发布内容不参与搜索
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_published() -> bool {
    true
}

impl Candidate {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            short_description: None,
            tags: Vec::new(),
            content_type: "other".to_string(),
            category: String::new(),
            price: 0.0,
            currency: default_currency(),
            author_id: String::new(),
            created_at: DateTime::<Utc>::default(),
            counters: Counters::default(),
            published: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_short_description(mut self, short: impl Into<String>) -> Self {
        self.short_description = Some(short.into());
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = author_id.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_counters(mut self, likes: u64, views: u64, downloads: u64) -> Self {
        self.counters = Counters { likes, views, downloads };
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }
}

/// Whether the content costs nothing / 是否免费
pub fn is_free(candidate: &Candidate) -> bool {
    candidate.price == 0.0
}

/// Human readable price / 展示价格
pub fn display_price(candidate: &Candidate) -> String {
    if is_free(candidate) {
        "Gratis".to_string()
    } else {
        format!("{:.2} {}", candidate.price, candidate.currency)
    }
}

/// likes×2 + views + downloads / 热度
pub fn popularity(candidate: &Candidate) -> u64 {
    let c = &candidate.counters;
    c.likes
        .saturating_mul(2)
        .saturating_add(c.views)
        .saturating_add(c.downloads)
}

/// Public author profile used for enrichment / 作者资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorProfile {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_properties() {
        let free = Candidate::new("1", "Pack").with_counters(3, 10, 4);
        assert!(is_free(&free));
        assert_eq!(display_price(&free), "Gratis");
        assert_eq!(popularity(&free), 20);

        let paid = Candidate::new("2", "Modelo").with_price(12.5);
        assert!(!is_free(&paid));
        assert_eq!(display_price(&paid), "12.50 USD");
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "id": "c1",
            "title": "Casa",
            "description": "Modelo",
            "contentType": "3d",
            "price": 0,
            "authorId": "u1",
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let c: Candidate = serde_json::from_str(json).unwrap();
        assert!(c.published);
        assert!(c.tags.is_empty());
        assert_eq!(c.currency, "USD");
        assert_eq!(c.counters, Counters::default());
    }
}
