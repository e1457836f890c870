//! Shared Filter → Score → Sort → Paginate pipeline / 共享搜索管线
//!
//! Every backend hands its raw candidates to `run`; no backend ranks on its own.

use super::filter::FilterSet;
use super::paginate::{paginate, PageInfo};
use super::query::SearchQuery;
use super::schema::{popularity, Candidate};
use super::scoring::relevance_score;
use super::sorter::{sort_scored, Scored};

/// Output of one pipeline run / 管线输出
#[derive(Debug)]
pub struct RankedPage<'a> {
    /// Items of the requested page, in order / 当前页
    pub items: Vec<Scored<'a>>,
    pub info: PageInfo,
    /// Full filtered set (unordered view used for tag suggestions) / 过滤后的全集
    pub filtered: Vec<&'a Candidate>,
}

impl RankedPage<'_> {
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|s| s.candidate.id.clone()).collect()
    }
}

/// Score and order the filtered set without slicing it / 排序全集
pub fn rank<'a>(query: &SearchQuery, filtered: &[&'a Candidate]) -> Vec<Scored<'a>> {
    let terms = query.terms();
    let mut scored: Vec<Scored<'a>> = filtered
        .iter()
        .map(|&c| Scored {
            candidate: c,
            score: relevance_score(c, &terms),
            popularity: popularity(c),
        })
        .collect();
    sort_scored(&mut scored, query.sort_by);
    scored
}

/// Run the whole pipeline over `candidates` / 执行完整管线
pub fn run<'a>(query: &SearchQuery, candidates: &'a [Candidate]) -> RankedPage<'a> {
    let filtered = FilterSet::from_query(query).apply(candidates);
    let ordered = rank(query, &filtered);
    let (items, info) = paginate(&ordered, query.page, query.limit);

    tracing::debug!(
        "pipeline: {} candidates, {} matched, page {}/{}",
        candidates.len(),
        info.total,
        info.page,
        info.total_pages
    );

    RankedPage {
        items,
        info,
        filtered,
    }
}
