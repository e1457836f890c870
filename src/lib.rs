//! Marketplace content search engine / 市场内容搜索引擎

pub mod analytics;
pub mod config;
pub mod repository;
pub mod search;
pub mod seed;
