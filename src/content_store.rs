//! On-disk content store: fetched bodies are written under
//! `data_dir/content/{2-char-hash-prefix}/{hash}.html`, keyed by the
//! SHA-256 hash of the body content.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct ContentStore {
    data_dir: PathBuf,
}

impl ContentStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        ContentStore {
            data_dir: data_dir.into(),
        }
    }

    pub fn content_hash(body: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(body.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, content_hash: &str) -> PathBuf {
        let prefix = &content_hash[..2.min(content_hash.len())];
        self.data_dir
            .join("content")
            .join(prefix)
            .join(format!("{content_hash}.html"))
    }

    /// Write the body to disk, returning the hash used as its key. A no-op
    /// if a file for this hash already exists (content is immutable once
    /// written).
    pub async fn store(&self, body: &str) -> Result<String, ContentStoreError> {
        let hash = Self::content_hash(body);
        let path = self.path_for(&hash);
        if fs::try_exists(&path).await? {
            return Ok(hash);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&path).await?;
        file.write_all(body.as_bytes()).await?;
        Ok(hash)
    }

    pub fn path_for_hash(&self, content_hash: &str) -> PathBuf {
        self.path_for(content_hash)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_writes_file_keyed_by_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let hash = store.store("<html>hi</html>").await.unwrap();
        let path = store.path_for_hash(&hash);
        let contents = tokio::fs::read_to_string(path).await.unwrap();
        assert_eq!(contents, "<html>hi</html>");
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(
            ContentStore::content_hash("same"),
            ContentStore::content_hash("same")
        );
        assert_ne!(
            ContentStore::content_hash("a"),
            ContentStore::content_hash("b")
        );
    }
}
