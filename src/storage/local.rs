//! Local filesystem snapshot store.
//!
//! The whole document lives in one JSON file (`data/data.json` by default).
//! Every update reads the document, replaces one site's entry and writes the
//! result to a temporary file that is then renamed over the document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Article;
use crate::storage::{SnapshotDocument, SnapshotStorage};

/// Snapshot store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore {
    path: PathBuf,
}

impl LocalSnapshotStore {
    /// Create a store for the given document path. The file is created on
    /// the first update.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read the document. Missing or unreadable JSON is an empty document.
    async fn read_document(&self) -> Result<SnapshotDocument> {
        let Some(bytes) = self.read_bytes().await? else {
            log::debug!("No snapshot at {}, starting empty", self.path.display());
            return Ok(SnapshotDocument::new());
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SnapshotDocument::new());
        }

        match serde_json::from_slice(&bytes) {
            Ok(document) => Ok(document),
            Err(e) => {
                log::warn!(
                    "Snapshot {} is not valid JSON ({e}); treating it as empty",
                    self.path.display()
                );
                Ok(SnapshotDocument::new())
            }
        }
    }

    async fn write_document(&self, document: &SnapshotDocument) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)?;
        self.write_bytes(&bytes).await
    }
}

#[async_trait]
impl SnapshotStorage for LocalSnapshotStore {
    async fn previous_articles(&self, site_key: &str) -> Result<Vec<Article>> {
        let mut document = self.read_document().await?;
        Ok(document.remove(site_key).unwrap_or_default())
    }

    async fn update_snapshot(&self, site_key: &str, current: &[Article]) -> Result<()> {
        let mut document = self.read_document().await?;
        document.insert(site_key.to_string(), current.to_vec());
        self.write_document(&document).await?;
        log::debug!(
            "Snapshot for '{site_key}' replaced with {} articles",
            current.len()
        );
        Ok(())
    }

    async fn load_all(&self) -> Result<SnapshotDocument> {
        self.read_document().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn article(n: char) -> Article {
        Article::new(format!("Article {n}"), format!("https://example.com/{n}"))
    }

    fn store_in(tmp: &TempDir) -> LocalSnapshotStore {
        LocalSnapshotStore::new(tmp.path().join("data").join("data.json"))
    }

    #[tokio::test]
    async fn test_unknown_site_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        assert!(store.previous_articles("3erp").await.unwrap().is_empty());
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_then_read_back() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        let articles = vec![article('A'), article('B'), article('C')];
        store.update_snapshot("3erp", &articles).await.unwrap();

        assert_eq!(store.previous_articles("3erp").await.unwrap(), articles);
        assert!(store.path().exists());
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_new_articles_then_replace() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store
            .update_snapshot("fictiv", &[article('A'), article('B'), article('C')])
            .await
            .unwrap();

        let current = vec![article('B'), article('C'), article('D')];
        let fresh = store.new_articles("fictiv", &current).await.unwrap();
        assert_eq!(fresh, vec![article('D')]);

        store.update_snapshot("fictiv", &current).await.unwrap();
        assert_eq!(store.previous_articles("fictiv").await.unwrap(), current);
    }

    #[tokio::test]
    async fn test_update_leaves_other_sites_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.update_snapshot("3erp", &[article('A')]).await.unwrap();
        store.update_snapshot("wayken", &[article('W')]).await.unwrap();
        store.update_snapshot("3erp", &[article('B')]).await.unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["3erp"], vec![article('B')]);
        assert_eq!(all["wayken"], vec![article('W')]);
    }

    #[tokio::test]
    async fn test_document_format() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store
            .update_snapshot("hlc-metalparts", &[article('A').with_date("Feb 10, 2026")])
            .await
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["hlc-metalparts"][0]["url"], "https://example.com/A");
        assert_eq!(value["hlc-metalparts"][0]["date"], "Feb 10, 2026");
    }

    #[tokio::test]
    async fn test_corrupt_document_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(store.previous_articles("3erp").await.unwrap().is_empty());

        store.update_snapshot("3erp", &[article('A')]).await.unwrap();
        assert_eq!(store.previous_articles("3erp").await.unwrap(), vec![article('A')]);
    }

    #[tokio::test]
    async fn test_empty_file_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "").unwrap();

        assert!(store.load_all().await.unwrap().is_empty());
    }
}
