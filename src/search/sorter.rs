//! Deterministic ordering per sort strategy / 排序
//!
//! Every strategy ends with popularity desc, created_at desc and id asc, so the
//! order never depends on the order a backend returned its candidates.

use std::cmp::Ordering;

use super::query::SortBy;
use super::schema::Candidate;

/// A filtered candidate with its precomputed keys / 带分数的候选
#[derive(Debug, Clone, Copy)]
pub struct Scored<'a> {
    pub candidate: &'a Candidate,
    pub score: u64,
    pub popularity: u64,
}

/// Sort in place according to `sort_by` / 按策略排序
pub fn sort_scored(items: &mut [Scored<'_>], sort_by: SortBy) {
    items.sort_by(|a, b| compare(a, b, sort_by));
}

pub fn compare(a: &Scored<'_>, b: &Scored<'_>, sort_by: SortBy) -> Ordering {
    let primary = match sort_by {
        SortBy::Relevance => b.score.cmp(&a.score),
        SortBy::PriceAsc => a.candidate.price.total_cmp(&b.candidate.price),
        SortBy::PriceDesc => b.candidate.price.total_cmp(&a.candidate.price),
        SortBy::Date => b.candidate.created_at.cmp(&a.candidate.created_at),
        SortBy::Popularity => b.popularity.cmp(&a.popularity),
    };
    primary.then_with(|| tie_break(a, b))
}

fn tie_break(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.popularity
        .cmp(&a.popularity)
        .then_with(|| b.candidate.created_at.cmp(&a.candidate.created_at))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}
