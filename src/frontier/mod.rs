//! The frontier manager: the hybrid Redis+filesystem queue of pending URLs,
//! partitioned by domain.

pub mod bloom;
pub mod file_store;
pub mod metadata;
pub mod ready_queue;

use crate::domain::extract_domain;
use crate::metrics::Metrics;
use crate::politeness::{Politeness, PolitenessError};
use crate::url_norm::{self, NormalizeError};
use bloom::{SeenFilter, SeenFilterError};
use file_store::{FrontierEntry, FrontierFileStore, FileStoreError};
use metadata::{now_secs, DomainMetaStore, MetadataError};
use ready_queue::{ReadyQueue, ReadyQueueError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontierError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Bloom(#[from] SeenFilterError),
    #[error(transparent)]
    ReadyQueue(#[from] ReadyQueueError),
    #[error(transparent)]
    FileStore(#[from] FileStoreError),
    #[error(transparent)]
    Politeness(#[from] PolitenessError),
}

/// Per-URL disposition during an add call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Accepted,
    NormalizationFailed,
    RejectedByPoliteness,
    RejectedBySeen,
}

pub struct FrontierManager {
    metadata: DomainMetaStore,
    seen: SeenFilter,
    ready_queue: ReadyQueue,
    file_store: FrontierFileStore,
    politeness: Arc<dyn Politeness>,
    metrics: Arc<Metrics>,
}

impl FrontierManager {
    pub fn new(
        metadata: DomainMetaStore,
        seen: SeenFilter,
        ready_queue: ReadyQueue,
        file_store: FrontierFileStore,
        politeness: Arc<dyn Politeness>,
        metrics: Arc<Metrics>,
    ) -> Self {
        FrontierManager {
            metadata,
            seen,
            ready_queue,
            file_store,
            politeness,
            metrics,
        }
    }

    /// Add a batch of candidate URLs at a given crawl depth. Returns the
    /// count appended to frontier files.
    pub async fn add_urls_batch(
        &self,
        raw_urls: &[String],
        depth: u32,
        is_seed: bool,
    ) -> Result<usize, FrontierError> {
        let outcomes = self.add_urls_batch_detailed(raw_urls, depth, is_seed).await?;
        Ok(outcomes
            .into_iter()
            .filter(|(_, outcome)| *outcome == AddOutcome::Accepted)
            .count())
    }

    /// Same as [`Self::add_urls_batch`] but reports the disposition of every
    /// input URL, for testability.
    pub async fn add_urls_batch_detailed(
        &self,
        raw_urls: &[String],
        depth: u32,
        is_seed: bool,
    ) -> Result<Vec<(String, AddOutcome)>, FrontierError> {
        let mut results = Vec::with_capacity(raw_urls.len());
        let mut dedup = HashSet::new();
        let mut survivors = Vec::new();

        // Step 1: normalize + in-batch dedup.
        for raw in raw_urls {
            match url_norm::normalize(raw) {
                Ok(normalized) => {
                    if dedup.insert(normalized.clone()) {
                        survivors.push(normalized);
                    }
                    // Duplicate within the batch: simply not re-processed;
                    // it is not an error for the original URL string.
                }
                Err(NormalizeError::Empty) => {}
                Err(_) => {
                    results.push((raw.clone(), AddOutcome::NormalizationFailed));
                }
            }
        }

        // Step 2: URL-level politeness filter.
        let mut politeness_survivors = Vec::new();
        for url in survivors {
            match self.politeness.is_url_allowed(&url).await {
                Ok(true) => politeness_survivors.push(url),
                Ok(false) => {
                    let _ = self.seen.insert(&url).await;
                    self.metrics.incr_robots_rejections();
                    results.push((url, AddOutcome::RejectedByPoliteness));
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Step 3: bloom-filter membership (insert before file append). A
        // bloom filter failure is treated as "unknown", not fatal: the URL
        // is conservatively dropped rather than aborting the whole batch.
        let mut accepted = Vec::new();
        for url in politeness_survivors {
            match self.seen.contains(&url).await {
                Ok(true) => {
                    self.metrics.incr_seen_rejections();
                    results.push((url, AddOutcome::RejectedBySeen));
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "bloom filter unavailable, dropping URL");
                    self.metrics.incr_bloom_failures();
                    results.push((url, AddOutcome::RejectedBySeen));
                    continue;
                }
            }
            if let Err(e) = self.seen.insert(&url).await {
                tracing::warn!(url = %url, error = %e, "bloom filter unavailable, dropping URL");
                self.metrics.incr_bloom_failures();
                results.push((url, AddOutcome::RejectedBySeen));
                continue;
            }
            accepted.push(url);
        }

        // Step 4: group by domain.
        let mut by_domain: HashMap<String, Vec<String>> = HashMap::new();
        for url in accepted {
            match extract_domain(&url) {
                Some(domain) => by_domain.entry(domain).or_default().push(url),
                None => results.push((url, AddOutcome::NormalizationFailed)),
            }
        }

        // Step 5: per-domain append.
        let now = now_secs();
        for (domain, urls) in by_domain {
            let relative_path = FrontierFileStore::relative_path(&domain);
            self.metadata
                .ensure_domain(&domain, &relative_path, is_seed)
                .await?;

            let entries: Vec<FrontierEntry> = urls
                .iter()
                .map(|url| FrontierEntry {
                    url: url.clone(),
                    depth,
                    priority: 0.0,
                    added_timestamp: now,
                })
                .collect();

            self.file_store
                .append(&domain, &relative_path, &entries)
                .await?;
            self.metadata
                .increment_frontier_size(&domain, entries.len() as u64)
                .await?;
            self.ready_queue.push_if_absent(&domain).await?;

            for url in urls {
                results.push((url, AddOutcome::Accepted));
            }
        }

        Ok(results)
    }

    /// Pop the next URL to fetch, honoring domain rotation and politeness.
    pub async fn get_next_url(&self) -> Result<Option<(String, String, u32)>, FrontierError> {
        let domain = match self.ready_queue.pop().await? {
            Some(d) => d,
            None => return Ok(None),
        };

        if !self.politeness.can_fetch_domain_now(&domain).await? {
            self.ready_queue.push_if_absent(&domain).await?;
            return Ok(None);
        }

        let relative_path = match self.metadata.file_path(&domain).await? {
            Some(p) => p,
            None => return Ok(None), // metadata vanished post-crash; start fresh for this domain
        };

        loop {
            let (offset, size) = self.metadata.offset_and_size(&domain).await?;
            if offset >= size {
                return Ok(None);
            }

            let line = self
                .file_store
                .read_line(&domain, &relative_path, offset)
                .await?;
            let new_offset = self.metadata.advance_offset(&domain).await?;

            let entry = match line {
                Some(entry) => entry,
                None => continue, // unreadable line: treat as consumed, keep going
            };

            if !self.politeness.is_url_allowed(&entry.url).await? {
                let _ = self.seen.insert(&entry.url).await;
                self.metrics.incr_robots_rejections();
                continue;
            }

            self.politeness.record_domain_fetch_attempt(&domain).await?;

            if new_offset < size {
                self.ready_queue.push_if_absent(&domain).await?;
            }

            return Ok(Some((entry.url, domain, entry.depth)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Always-allow politeness fake with a configurable crawl delay of 0,
    /// so frontier tests exercise queue/file/offset logic without a real
    /// robots.txt fetch or wall-clock wait.
    struct AllowAll {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Politeness for AllowAll {
        async fn is_url_allowed(&self, _url: &str) -> Result<bool, PolitenessError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
        async fn can_fetch_domain_now(&self, _domain: &str) -> Result<bool, PolitenessError> {
            Ok(true)
        }
        async fn record_domain_fetch_attempt(&self, _domain: &str) -> Result<(), PolitenessError> {
            Ok(())
        }
        async fn get_crawl_delay(&self, _domain: &str) -> Result<u64, PolitenessError> {
            Ok(0)
        }
    }

    // These tests require a reachable redis-server and are gated behind the
    // `redis-integration` feature-free `#[ignore]` marker so `cargo test`
    // stays hermetic by default; run with `cargo test -- --ignored` against
    // a local redis-server.
    async fn test_manager(data_dir: &std::path::Path) -> FrontierManager {
        let client = redis::Client::open("redis://127.0.0.1/").unwrap();
        let conn = redis::aio::ConnectionManager::new(client).await.unwrap();
        let metadata = DomainMetaStore::new(conn.clone());
        let seen = SeenFilter::new(conn.clone());
        let ready_queue = ReadyQueue::new(conn.clone());
        let file_store = FrontierFileStore::new(data_dir);
        let politeness: Arc<dyn Politeness> = Arc::new(AllowAll {
            calls: AtomicU32::new(0),
        });
        let metrics = Arc::new(Metrics::new());
        FrontierManager::new(metadata, seen, ready_queue, file_store, politeness, metrics)
    }

    #[tokio::test]
    #[ignore = "requires a local redis-server"]
    async fn add_then_get_returns_same_url() {
        let dir = tempfile::tempdir().unwrap();
        let manager = test_manager(dir.path()).await;
        let urls = vec!["https://example.com/only".to_string()];
        let added = manager.add_urls_batch(&urls, 0, true).await.unwrap();
        assert_eq!(added, 1);

        let (url, domain, depth) = manager.get_next_url().await.unwrap().unwrap();
        assert_eq!(url, "https://example.com/only");
        assert_eq!(domain, "example.com");
        assert_eq!(depth, 0);

        assert!(manager.get_next_url().await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a local redis-server"]
    async fn empty_frontier_returns_none_without_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let manager = test_manager(dir.path()).await;
        assert!(manager.get_next_url().await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a local redis-server"]
    async fn duplicate_add_is_rejected_by_seen_set() {
        let dir = tempfile::tempdir().unwrap();
        let manager = test_manager(dir.path()).await;
        let urls = vec!["https://example.com/dup".to_string()];
        manager.add_urls_batch(&urls, 0, true).await.unwrap();
        let second = manager.add_urls_batch(&urls, 0, true).await.unwrap();
        assert_eq!(second, 0);
    }

    #[test]
    fn normalization_failure_is_tagged_not_dropped_silently_from_outcomes() {
        // Pure unit check of the normalization step's classification, which
        // does not require Redis.
        assert!(matches!(
            url_norm::normalize("ftp://a.com"),
            Err(NormalizeError::UnsupportedScheme)
        ));
    }
}
