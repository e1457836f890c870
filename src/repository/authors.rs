//! Author directory used to enrich results / 作者目录

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::search::{AuthorProfile, SearchError};

/// Author lookup collaborator / 作者查询
#[async_trait]
pub trait AuthorDirectory: Send + Sync {
    /// `Ok(None)` when the author does not exist / 作者不存在时返回 None
    async fn lookup(&self, author_id: &str) -> Result<Option<AuthorProfile>, SearchError>;

    async fn insert_authors(&self, authors: &[AuthorProfile]) -> Result<usize, SearchError>;
}

/// In-memory author directory / 内存作者目录
#[derive(Default)]
pub struct MemoryAuthorDirectory {
    authors: RwLock<HashMap<String, AuthorProfile>>,
}

impl MemoryAuthorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.authors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.read().is_empty()
    }
}

#[async_trait]
impl AuthorDirectory for MemoryAuthorDirectory {
    async fn lookup(&self, author_id: &str) -> Result<Option<AuthorProfile>, SearchError> {
        Ok(self.authors.read().get(author_id).cloned())
    }

    async fn insert_authors(&self, authors: &[AuthorProfile]) -> Result<usize, SearchError> {
        let mut map = self.authors.write();
        for a in authors {
            map.insert(a.id.clone(), a.clone());
        }
        Ok(authors.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup() {
        let dir = MemoryAuthorDirectory::new();
        dir.insert_authors(&[AuthorProfile {
            id: "u1".into(),
            username: "lucia".into(),
            avatar: Some("/avatars/u1.png".into()),
        }])
        .await
        .unwrap();
        assert_eq!(dir.len(), 1);
        let found = dir.lookup("u1").await.unwrap().unwrap();
        assert_eq!(found.avatar.as_deref(), Some("/avatars/u1.png"));
        assert!(dir.lookup("u2").await.unwrap().is_none());
    }
}
