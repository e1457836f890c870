//! Filter pipeline - pure predicates over candidates / 过滤管线
//!
//! Stages run in a fixed order: text, tags, categories, price range, free flag,
//! author. Each stage is an independent predicate, so the order only matters
//! for reproducible logging.

use std::collections::HashSet;

use super::query::{SearchQuery, TagsOperator};
use super::schema::{is_free, Candidate};
use super::tokenizer::{joined_tags, normalize, normalize_tag};

/// Precomputed view of a query's filter criteria / 预处理后的过滤条件
pub struct FilterSet {
    terms: Vec<String>,
    tags: Vec<String>,
    tags_operator: TagsOperator,
    categories: HashSet<String>,
    price_range: Option<(f64, f64)>,
    is_free: Option<bool>,
    author_id: Option<String>,
}

impl FilterSet {
    pub fn from_query(query: &SearchQuery) -> Self {
        Self {
            terms: query.terms(),
            tags: query.normalized_tags(),
            tags_operator: query.tags_operator,
            categories: query.categories.iter().map(|c| normalize(c)).collect(),
            price_range: query.price_range.map(|r| (r.min, r.max)),
            is_free: query.is_free,
            author_id: query.author_id.clone(),
        }
    }

    /// Run every stage, keeping the candidates that pass all of them / 应用全部过滤
    pub fn apply<'a>(&self, candidates: &'a [Candidate]) -> Vec<&'a Candidate> {
        let mut kept: Vec<&Candidate> = candidates.iter().collect();
        kept.retain(|c| self.matches_text(c));
        kept.retain(|c| self.matches_tags(c));
        kept.retain(|c| self.matches_category(c));
        kept.retain(|c| self.matches_price(c));
        kept.retain(|c| self.matches_free(c));
        kept.retain(|c| self.matches_author(c));
        kept
    }

    /// Every term must occur in title, description, short description or tags
    pub fn matches_text(&self, candidate: &Candidate) -> bool {
        if self.terms.is_empty() {
            return true;
        }
        let fields = [
            candidate.title.to_lowercase(),
            candidate.description.to_lowercase(),
            candidate
                .short_description
                .as_deref()
                .map(str::to_lowercase)
                .unwrap_or_default(),
            joined_tags(&candidate.tags),
        ];
        self.terms
            .iter()
            .all(|term| fields.iter().any(|field| field.contains(term.as_str())))
    }

    /// AND: requested ⊆ candidate; OR: requested ∩ candidate ≠ ∅ / 标签过滤
    pub fn matches_tags(&self, candidate: &Candidate) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        let own: HashSet<String> = candidate.tags.iter().map(|t| normalize_tag(t)).collect();
        match self.tags_operator {
            TagsOperator::And => self.tags.iter().all(|t| own.contains(t)),
            TagsOperator::Or => self.tags.iter().any(|t| own.contains(t)),
        }
    }

    pub fn matches_category(&self, candidate: &Candidate) -> bool {
        self.categories.is_empty() || self.categories.contains(&normalize(&candidate.content_type))
    }

    pub fn matches_price(&self, candidate: &Candidate) -> bool {
        match self.price_range {
            Some((min, max)) => min <= candidate.price && candidate.price <= max,
            None => true,
        }
    }

    pub fn matches_free(&self, candidate: &Candidate) -> bool {
        match self.is_free {
            Some(wanted) => is_free(candidate) == wanted,
            None => true,
        }
    }

    pub fn matches_author(&self, candidate: &Candidate) -> bool {
        match &self.author_id {
            Some(author) => &candidate.author_id == author,
            None => true,
        }
    }
}

/// Convenience wrapper / 便捷函数
pub fn filter_candidates<'a>(query: &SearchQuery, candidates: &'a [Candidate]) -> Vec<&'a Candidate> {
    FilterSet::from_query(query).apply(candidates)
}
