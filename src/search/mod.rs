//! Search module - query model and ranking primitives / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - This module is pure: it never touches a backend
//! - Backends (see `repository`) only supply raw candidates
//! - Filter → Score → Sort → Paginate runs once, here, for every backend
//!
//! Ranking features / 排序特性：
//! - Weighted multi-field relevance (title, description, short description, tags)
//! - AND/OR tag semantics
//! - Deterministic tie-breaks for stable pagination
//! - Prefix/contains/subsequence matching for autocomplete

pub mod error;
pub mod filter;
pub mod paginate;
pub mod pipeline;
pub mod query;
pub mod result;
pub mod schema;
pub mod scoring;
pub mod sorter;
pub mod suggest;
pub mod tokenizer;

pub use error::{QueryViolation, SearchError};
pub use query::{PriceRange, SearchQuery, SortBy, TagsOperator};
pub use result::{SearchItem, SearchResponse};
pub use schema::{AuthorProfile, Candidate, Counters};
pub use suggest::{Suggestion, SuggestionKind, SuggestionSet};
