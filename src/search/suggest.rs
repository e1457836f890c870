//! Suggestion engine - autocomplete, popular tags, related searches / 搜索建议
//!
//! All functions are pure over the published candidates handed in by the
//! repository; nothing here talks to a backend.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::schema::{popularity, Candidate};
use super::scoring::fuzzy_relevance;
use super::tokenizer::{normalize, normalize_tag, tokenize_query};

/// Shortest partial input that produces suggestions / 最短输入长度
pub const MIN_PARTIAL_LEN: usize = 2;
/// Default cap per suggestion list / 每类建议上限
pub const DEFAULT_SUGGESTION_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Tag,
    Title,
}

/// Autocomplete entry / 自动补全条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub value: String,
    /// 0..=100
    pub relevance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuggestionSet {
    pub tags: Vec<Suggestion>,
    pub titles: Vec<Suggestion>,
}

impl SuggestionSet {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.titles.is_empty()
    }

    pub fn tag_values(&self) -> Vec<&str> {
        self.tags.iter().map(|s| s.value.as_str()).collect()
    }

    pub fn title_values(&self) -> Vec<&str> {
        self.titles.iter().map(|s| s.value.as_str()).collect()
    }
}

/// Tag with its usage count / 标签计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Autocomplete over the tag vocabulary and titles / 自动补全
pub fn suggestions(candidates: &[Candidate], partial: &str, cap: usize) -> SuggestionSet {
    let partial = partial.trim();
    if partial.chars().count() < MIN_PARTIAL_LEN {
        return SuggestionSet::default();
    }

    let vocabulary: HashSet<String> = candidates
        .iter()
        .flat_map(|c| c.tags.iter().map(|t| normalize_tag(t)))
        .filter(|t| !t.is_empty())
        .collect();

    // 标题按小写去重，保留字典序最小的原文
    let mut titles: BTreeMap<String, &str> = BTreeMap::new();
    for c in candidates {
        let key = normalize(&c.title);
        if key.is_empty() {
            continue;
        }
        titles
            .entry(key)
            .and_modify(|kept| {
                if c.title.as_str() < *kept {
                    *kept = c.title.as_str();
                }
            })
            .or_insert(c.title.as_str());
    }

    SuggestionSet {
        tags: rank(vocabulary.iter().map(String::as_str), partial, SuggestionKind::Tag, cap),
        titles: rank(titles.values().copied(), partial, SuggestionKind::Title, cap),
    }
}

fn rank<'a>(
    values: impl Iterator<Item = &'a str>,
    partial: &str,
    kind: SuggestionKind,
    cap: usize,
) -> Vec<Suggestion> {
    let mut ranked: Vec<Suggestion> = values
        .filter_map(|value| {
            let relevance = fuzzy_relevance(value, partial);
            (relevance > 0.0).then(|| Suggestion {
                kind,
                value: value.to_string(),
                relevance,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.relevance
            .total_cmp(&a.relevance)
            .then_with(|| a.value.cmp(&b.value))
    });
    ranked.truncate(cap);
    ranked
}

/// Tag frequency across candidates, count desc then alphabetical / 标签频次
pub fn tag_counts<'a>(candidates: impl IntoIterator<Item = &'a Candidate>) -> Vec<TagCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for c in candidates {
        let own: HashSet<String> = c
            .tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();
        for tag in own {
            *counts.entry(tag).or_default() += 1;
        }
    }
    let mut counted: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    counted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    counted
}

/// Top `limit` tags / 热门标签
pub fn popular_tags(candidates: &[Candidate], limit: usize) -> Vec<String> {
    tag_counts(candidates)
        .into_iter()
        .take(limit)
        .map(|tc| tc.tag)
        .collect()
}

/// Most frequent tags among a result set, minus the ones already asked for / 结果中的推荐标签
pub fn suggested_tags(filtered: &[&Candidate], exclude: &[String], limit: usize) -> Vec<String> {
    let exclude: HashSet<&str> = exclude.iter().map(String::as_str).collect();
    tag_counts(filtered.iter().copied())
        .into_iter()
        .filter(|tc| !exclude.contains(tc.tag.as_str()))
        .take(limit)
        .map(|tc| tc.tag)
        .collect()
}

/// Titles that partially overlap the query tokens / 相关搜索
///
/// A title is related when it shares at least one token with the query but
/// neither token set contains the other.
pub fn related_searches(candidates: &[Candidate], query: &str, limit: usize) -> Vec<String> {
    let query_tokens: HashSet<String> = tokenize_query(query).into_iter().collect();
    if query_tokens.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut related: Vec<(usize, u64, &str)> = candidates
        .iter()
        .filter_map(|c| {
            let title_tokens: HashSet<String> = tokenize_query(&c.title).into_iter().collect();
            let overlap = title_tokens.intersection(&query_tokens).count();
            let partial = overlap > 0
                && !query_tokens.is_subset(&title_tokens)
                && !title_tokens.is_subset(&query_tokens);
            partial.then(|| (overlap, popularity(c), c.title.as_str()))
        })
        .collect();

    related.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.2.cmp(b.2))
    });

    let mut seen = HashSet::new();
    related
        .into_iter()
        .filter(|(_, _, title)| seen.insert(normalize(title)))
        .take(limit)
        .map(|(_, _, title)| title.to_string())
        .collect()
}
