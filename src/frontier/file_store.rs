//! Append-only per-domain frontier files on the local filesystem. One file
//! per domain, sharded into 256 subdirectories by a 2-char hash prefix of
//! the domain name so `data_dir/frontiers/` never holds more than a few
//! hundred entries at its top level.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One pending-URL record.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
    pub priority: f64,
    pub added_timestamp: i64,
}

impl FrontierEntry {
    /// `url|depth|priority|added_timestamp`. Normalized URLs cannot contain
    /// `|` (it is not a valid URL character outside percent-encoding), so a
    /// bare delimiter is safe here.
    fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}\n",
            self.url, self.depth, self.priority, self.added_timestamp
        )
    }

    fn parse_line(line: &str) -> Option<FrontierEntry> {
        let mut parts = line.splitn(4, '|');
        let url = parts.next()?.to_string();
        let depth: u32 = parts.next()?.parse().ok()?;
        let priority: f64 = parts.next()?.parse().ok()?;
        let added_timestamp: i64 = parts.next()?.parse().ok()?;
        Some(FrontierEntry {
            url,
            depth,
            priority,
            added_timestamp,
        })
    }
}

/// A cached (line index, byte offset) pair so sequential consumption of a
/// domain's frontier (the common case) doesn't rescan the file from byte 0
/// on every `read_line` call.
#[derive(Clone, Copy)]
struct ReadCursor {
    next_line: u64,
    byte_offset: u64,
}

pub struct FrontierFileStore {
    data_dir: PathBuf,
    write_locks: DashMap<String, std::sync::Arc<Mutex<()>>>,
    read_cursors: DashMap<String, ReadCursor>,
}

impl FrontierFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        FrontierFileStore {
            data_dir: data_dir.into(),
            write_locks: DashMap::new(),
            read_cursors: DashMap::new(),
        }
    }

    /// Path (relative to `data_dir`) for a domain's frontier file.
    pub fn relative_path(domain: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        let digest = hasher.finalize();
        let prefix = hex::encode(&digest[..1]);
        format!("frontiers/{prefix}/{domain}.frontier")
    }

    fn absolute_path(&self, relative: &str) -> PathBuf {
        self.data_dir.join(relative)
    }

    fn lock_for(&self, domain: &str) -> std::sync::Arc<Mutex<()>> {
        self.write_locks
            .entry(domain.to_string())
            .or_insert_with(|| std::sync::Arc::new(Mutex::new(())))
            .clone()
    }

    /// Append entries for one domain. Creates the file (and parent
    /// directory) on first use. Serialized per-domain via an in-process
    /// lock.
    pub async fn append(
        &self,
        domain: &str,
        relative_path: &str,
        entries: &[FrontierEntry],
    ) -> Result<(), FileStoreError> {
        let lock = self.lock_for(domain);
        let _guard = lock.lock().await;

        let path = self.absolute_path(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let mut buf = String::new();
        for entry in entries {
            buf.push_str(&entry.to_line());
        }
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read the `line_index`-th (0-based) entry from a domain's frontier
    /// file. Unreadable/malformed lines return `Ok(None)` rather than an
    /// error — the caller (frontier manager) treats that as "advance past
    /// it and continue".
    pub async fn read_line(
        &self,
        domain: &str,
        relative_path: &str,
        line_index: u64,
    ) -> Result<Option<FrontierEntry>, FileStoreError> {
        let path = self.absolute_path(relative_path);
        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let cursor = self.read_cursors.get(domain).map(|c| *c);
        let (start_line, start_offset) = match cursor {
            Some(c) if c.next_line <= line_index => (c.next_line, c.byte_offset),
            _ => (0, 0),
        };

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(start_offset)).await?;

        let mut current_line = start_line;
        let mut offset = start_offset;
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                // Past end of file: nothing more to read yet.
                self.read_cursors.insert(
                    domain.to_string(),
                    ReadCursor {
                        next_line: current_line,
                        byte_offset: offset,
                    },
                );
                return Ok(None);
            }
            let consumed = bytes_read as u64;
            if current_line == line_index {
                self.read_cursors.insert(
                    domain.to_string(),
                    ReadCursor {
                        next_line: current_line + 1,
                        byte_offset: offset + consumed,
                    },
                );
                let trimmed = line.trim_end_matches(['\n', '\r']);
                return Ok(FrontierEntry::parse_line(trimmed));
            }
            offset += consumed;
            current_line += 1;
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_entry(url: &str, line: u32) -> FrontierEntry {
        FrontierEntry {
            url: url.to_string(),
            depth: line,
            priority: 0.0,
            added_timestamp: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn append_then_read_sequential_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = FrontierFileStore::new(dir.path());
        let rel = FrontierFileStore::relative_path("example.com");

        store
            .append(
                "example.com",
                &rel,
                &[mk_entry("http://example.com/a", 0), mk_entry("http://example.com/b", 1)],
            )
            .await
            .unwrap();

        let first = store
            .read_line("example.com", &rel, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.url, "http://example.com/a");

        let second = store
            .read_line("example.com", &rel, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.url, "http://example.com/b");

        let third = store.read_line("example.com", &rel, 2).await.unwrap();
        assert!(third.is_none());
    }

    #[tokio::test]
    async fn append_is_monotonic_never_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = FrontierFileStore::new(dir.path());
        let rel = FrontierFileStore::relative_path("a.com");

        store
            .append("a.com", &rel, &[mk_entry("http://a.com/1", 0)])
            .await
            .unwrap();
        store
            .append("a.com", &rel, &[mk_entry("http://a.com/2", 1)])
            .await
            .unwrap();

        let path = dir.path().join(&rel);
        let contents = tokio::fs::read_to_string(path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn read_line_on_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FrontierFileStore::new(dir.path());
        let rel = FrontierFileStore::relative_path("missing.com");
        let result = store.read_line("missing.com", &rel, 0).await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn relative_path_shards_into_256_subdirectories() {
        let rel = FrontierFileStore::relative_path("example.com");
        assert!(rel.starts_with("frontiers/"));
        assert!(rel.ends_with("example.com.frontier"));
        let prefix = rel.split('/').nth(1).unwrap();
        assert_eq!(prefix.len(), 2);
    }
}
