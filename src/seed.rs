//! Startup seed data / 启动种子数据
//!
//! File format: `{"contents": [Candidate...], "authors": [AuthorProfile...]}`

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::repository::{AuthorDirectory, Backend, CandidateStore};
use crate::search::{AuthorProfile, Candidate, SearchError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub contents: Vec<Candidate>,
    #[serde(default)]
    pub authors: Vec<AuthorProfile>,
}

/// Read a seed file / 读取种子文件
pub fn load_seed(path: &Path) -> anyhow::Result<SeedData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {:?}", path))?;
    let seed: SeedData = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file {:?}", path))?;
    Ok(seed)
}

/// Write seed data into a backend, returns (contents, authors) / 导入种子数据
pub async fn apply_seed(seed: &SeedData, backend: &Backend) -> Result<(usize, usize), SearchError> {
    let contents = backend.store.insert_batch(&seed.contents).await?;
    let authors = backend.authors.insert_authors(&seed.authors).await?;
    tracing::info!(
        "Seeded {} contents and {} authors into {} store",
        contents,
        authors,
        backend.store.name()
    );
    Ok((contents, authors))
}
