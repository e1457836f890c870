//! In-memory candidate store / 内存存储
//!
//! Documents live in a `HashMap` behind a read-write lock. Retrieval clones the
//! published set; ranking happens in the shared pipeline.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::CandidateStore;
use crate::search::{Candidate, SearchError};

/// Memory store / 内存存储
pub struct MemoryStore {
    /// id -> Candidate
    documents: RwLock<HashMap<String, Candidate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Build a store already holding `items` / 预置数据
    pub fn with_candidates(items: impl IntoIterator<Item = Candidate>) -> Self {
        let store = Self::new();
        {
            let mut docs = store.documents.write();
            for c in items {
                docs.insert(c.id.clone(), c);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_candidates(&self) -> Result<Vec<Candidate>, SearchError> {
        let docs = self.documents.read();
        Ok(docs.values().filter(|c| c.published).cloned().collect())
    }

    async fn insert_batch(&self, items: &[Candidate]) -> Result<usize, SearchError> {
        let mut docs = self.documents.write();
        for c in items {
            docs.insert(c.id.clone(), c.clone());
        }
        Ok(items.len())
    }
}
