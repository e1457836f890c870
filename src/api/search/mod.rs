//! Search HTTP handlers / 搜索接口

pub mod query;
pub mod types;

pub use query::{popular_tags, record_view, related, search, stats, suggestions};
