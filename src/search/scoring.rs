//! Relevance scoring / 相关性评分
//!
//! Field weights: title 3, description 2, short description 1, joined tags 2.
//! For each (term, field) pair the first matching rule wins:
//!
//! | rule                               | points       |
//! |------------------------------------|--------------|
//! | field equals term                  | 10 × weight  |
//! | field starts with term             | 8 × weight   |
//! | field contains term                | 5 × weight   |
//! | a word of the field starts with it | 3 × weight   |
//!
//! The candidate score is the sum over all terms and fields. Without text the
//! relevance strategy falls back to popularity.

use super::schema::{popularity, Candidate};
use super::tokenizer::{joined_tags, words};

pub const TITLE_WEIGHT: u64 = 3;
pub const DESCRIPTION_WEIGHT: u64 = 2;
pub const SHORT_DESCRIPTION_WEIGHT: u64 = 1;
pub const TAGS_WEIGHT: u64 = 2;

const EXACT_POINTS: u64 = 10;
const PREFIX_POINTS: u64 = 8;
const CONTAINS_POINTS: u64 = 5;
const WORD_PREFIX_POINTS: u64 = 3;

/// Points for one term against one lowercased field / 单字段得分
pub fn field_score(field: &str, term: &str, weight: u64) -> u64 {
    if field.is_empty() || term.is_empty() {
        return 0;
    }
    if field == term {
        EXACT_POINTS * weight
    } else if field.starts_with(term) {
        PREFIX_POINTS * weight
    } else if field.contains(term) {
        CONTAINS_POINTS * weight
    } else if words(field).any(|w| w.starts_with(term)) {
        // unreachable in practice: a word prefix is always a substring, caught above
        WORD_PREFIX_POINTS * weight
    } else {
        0
    }
}

/// Weighted text score of a candidate for lowercase `terms` / 文本相关性
pub fn text_score(candidate: &Candidate, terms: &[String]) -> u64 {
    let title = candidate.title.to_lowercase();
    let description = candidate.description.to_lowercase();
    let short = candidate
        .short_description
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let tags = joined_tags(&candidate.tags);

    let fields = [
        (title.as_str(), TITLE_WEIGHT),
        (description.as_str(), DESCRIPTION_WEIGHT),
        (short.as_str(), SHORT_DESCRIPTION_WEIGHT),
        (tags.as_str(), TAGS_WEIGHT),
    ];

    terms
        .iter()
        .map(|term| {
            fields
                .iter()
                .map(|(field, weight)| field_score(field, term, *weight))
                .sum::<u64>()
        })
        .sum()
}

/// Relevance score; popularity when the query has no terms / 相关性（无文本时回退热度）
pub fn relevance_score(candidate: &Candidate, terms: &[String]) -> u64 {
    if terms.is_empty() {
        popularity(candidate)
    } else {
        text_score(candidate, terms)
    }
}

/// Autocomplete relevance of `text` against `partial`, 0..=100 / 模糊匹配得分
///
/// exact 100, prefix 90, contains 70, word prefix 60 + 10 per matching word,
/// otherwise an in-order subsequence scored `matched / len(text) × 50`.
/// Returns 0 when `partial` is not a subsequence of `text`.
pub fn fuzzy_relevance(text: &str, partial: &str) -> f64 {
    let text = text.trim().to_lowercase();
    let partial = partial.trim().to_lowercase();
    if text.is_empty() || partial.is_empty() {
        return 0.0;
    }

    if text == partial {
        return 100.0;
    }
    if text.starts_with(&partial) {
        return 90.0;
    }
    if text.contains(&partial) {
        return 70.0;
    }

    // never hit once `contains` fails; a matching word prefix implies containment
    let word_matches = words(&text).filter(|w| w.starts_with(partial.as_str())).count();
    if word_matches > 0 {
        return (60.0 + 10.0 * word_matches as f64).min(100.0);
    }

    // 按顺序的子序列匹配
    let mut wanted = partial.chars().peekable();
    let mut matched = 0usize;
    for c in text.chars() {
        match wanted.peek() {
            Some(&p) if p == c => {
                matched += 1;
                wanted.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    if wanted.peek().is_some() {
        return 0.0;
    }

    let len = text.chars().count();
    (matched as f64 / len as f64) * 50.0
}
