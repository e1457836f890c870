//! Document store - JSON lines file / 文档存储
//!
//! File format (one document per line) / 文件格式：
//! `{"id":"...","title":"...",...}`
//!
//! - Appending a line with an existing id replaces the earlier document
//! - Blank lines are ignored, malformed lines are skipped with a warning
//! - Reads stream the file on the blocking pool

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::CandidateStore;
use crate::search::{Candidate, SearchError};

const BACKEND: &str = "document";

/// Document store / 文档存储
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    /// Open the store at `path`, creating parent directories / 打开文档文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SearchError::backend(BACKEND, e))?;
            }
        }
        tracing::info!("Document store file: {:?}", path);
        Ok(Self { path })
    }

    /// Truncating writer / 覆盖写入器
    pub fn create_writer(&self) -> Result<DocumentWriter, SearchError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| SearchError::backend(BACKEND, e))?;
        Ok(DocumentWriter::new(file))
    }

    /// Appending writer / 追加写入器
    pub fn append_writer(&self) -> Result<DocumentWriter, SearchError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SearchError::backend(BACKEND, e))?;
        Ok(DocumentWriter::new(file))
    }
}

/// Read every document, last write wins per id / 读取全部文档
fn read_documents(path: &Path) -> Result<Vec<Candidate>, SearchError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path).map_err(|e| SearchError::backend(BACKEND, e))?;
    let reader = BufReader::with_capacity(256 * 1024, file);

    let mut by_id: HashMap<String, Candidate> = HashMap::new();
    let mut skipped = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SearchError::backend(BACKEND, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Candidate>(line) {
            Ok(c) => {
                by_id.insert(c.id.clone(), c);
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping malformed document at line {}: {}", line_no + 1, e);
            }
        }
    }

    if skipped > 0 {
        tracing::debug!("{} malformed documents skipped in {:?}", skipped, path);
    }
    Ok(by_id.into_values().collect())
}

#[async_trait]
impl CandidateStore for DocumentStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn fetch_candidates(&self) -> Result<Vec<Candidate>, SearchError> {
        let path = self.path.clone();
        let docs = tokio::task::spawn_blocking(move || read_documents(&path))
            .await
            .map_err(|e| SearchError::backend(BACKEND, e))??;
        Ok(docs.into_iter().filter(|c| c.published).collect())
    }

    async fn insert_batch(&self, items: &[Candidate]) -> Result<usize, SearchError> {
        if items.is_empty() {
            return Ok(0);
        }
        let mut writer = self.append_writer()?;
        let items = items.to_vec();
        tokio::task::spawn_blocking(move || {
            for c in &items {
                writer.write_entry(c)?;
            }
            writer.finish()
        })
        .await
        .map_err(|e| SearchError::backend(BACKEND, e))?
    }
}

/// Buffered line writer / 文档写入器
pub struct DocumentWriter {
    writer: BufWriter<File>,
    count: usize,
}

impl DocumentWriter {
    fn new(file: File) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, file),
            count: 0,
        }
    }

    /// Write one document / 写入一条
    pub fn write_entry(&mut self, candidate: &Candidate) -> Result<(), SearchError> {
        let line = serde_json::to_string(candidate).map_err(|e| SearchError::backend(BACKEND, e))?;
        writeln!(self.writer, "{}", line).map_err(|e| SearchError::backend(BACKEND, e))?;
        self.count += 1;
        Ok(())
    }

    /// Flush and return the number of documents written / 完成写入
    pub fn finish(mut self) -> Result<usize, SearchError> {
        self.writer.flush().map_err(|e| SearchError::backend(BACKEND, e))?;
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("none.jsonl")).unwrap();
        assert!(store.fetch_candidates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("data/contents.jsonl")).unwrap();

        let mut writer = store.create_writer().unwrap();
        writer.write_entry(&Candidate::new("a", "Casa").with_tags(&["3d"])).unwrap();
        writer.write_entry(&Candidate::new("b", "Borrador").unpublished()).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let inserted = store
            .insert_batch(&[Candidate::new("a", "Casa nueva"), Candidate::new("c", "Campo")])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let mut fetched = store.fetch_candidates().await.unwrap();
        fetched.sort_by(|x, y| x.id.cmp(&y.id));
        let titles: Vec<&str> = fetched.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Casa nueva", "Campo"]);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contents.jsonl");
        let good = serde_json::to_string(&Candidate::new("ok", "Bien")).unwrap();
        std::fs::write(&path, format!("{}\n\nnot json\n{{\"id\":\"x\"}}\n", good)).unwrap();

        let store = DocumentStore::open(&path).unwrap();
        let fetched = store.fetch_candidates().await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, "ok");
    }
}
