//! `visited:{url_hash}` — per-URL outcome record for pages that did not
//! enter the parse queue: non-HTML content or an error status.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisitedStoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Debug, Clone)]
pub struct VisitedRecord {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub crawled_timestamp: i64,
}

#[derive(Clone)]
pub struct VisitedStore {
    redis: ConnectionManager,
}

impl VisitedStore {
    pub fn new(redis: ConnectionManager) -> Self {
        VisitedStore { redis }
    }

    pub fn key_for(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("visited:{}", hex::encode(hasher.finalize()))
    }

    pub async fn record(&self, record: &VisitedRecord) -> Result<(), VisitedStoreError> {
        let mut conn = self.redis.clone();
        let key = Self::key_for(&record.url);
        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("url", record.url.clone()),
                    ("status_code", record.status_code.to_string()),
                    (
                        "content_type",
                        record.content_type.clone().unwrap_or_default(),
                    ),
                    ("crawled_timestamp", record.crawled_timestamp.to_string()),
                ],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_for_same_url() {
        assert_eq!(
            VisitedStore::key_for("https://a.com/x"),
            VisitedStore::key_for("https://a.com/x")
        );
    }

    #[test]
    fn key_differs_for_different_urls() {
        assert_ne!(
            VisitedStore::key_for("https://a.com/x"),
            VisitedStore::key_for("https://a.com/y")
        );
    }
}
