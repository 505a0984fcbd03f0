//! Per-domain metadata hash (`domain:{d}`).

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

fn key(domain: &str) -> String {
    format!("domain:{domain}")
}

/// Thin accessor over a domain's `domain:{d}` hash. Each method is one
/// focused Redis round trip rather than a single struct read/write, mirroring
/// how the frontier and politeness enforcer touch only the fields they need.
#[derive(Clone)]
pub struct DomainMetaStore {
    redis: ConnectionManager,
}

impl DomainMetaStore {
    pub fn new(redis: ConnectionManager) -> Self {
        DomainMetaStore { redis }
    }

    /// Create the domain hash on first use. Returns true if this call created
    /// it (i.e. the domain is new to the frontier).
    pub async fn ensure_domain(
        &self,
        domain: &str,
        file_path: &str,
        is_seed: bool,
    ) -> Result<bool, MetadataError> {
        let mut conn = self.redis.clone();
        let created: bool = redis::cmd("HSETNX")
            .arg(key(domain))
            .arg("file_path")
            .arg(file_path)
            .query_async(&mut conn)
            .await?;
        if created {
            let _: () = conn
                .hset_multiple(
                    key(domain),
                    &[
                        ("frontier_size", "0"),
                        ("frontier_offset", "0"),
                        ("is_seeded", if is_seed { "1" } else { "0" }),
                        ("is_excluded", "0"),
                    ],
                )
                .await?;
        } else if is_seed {
            // A domain first discovered via a non-seed link can later turn
            // out to also be a seed domain; OR the flag in rather than
            // overwrite it.
            let _: () = conn.hset(key(domain), "is_seeded", "1").await?;
        }
        Ok(created)
    }

    pub async fn increment_frontier_size(
        &self,
        domain: &str,
        by: u64,
    ) -> Result<(), MetadataError> {
        let mut conn = self.redis.clone();
        let _: i64 = conn.hincr(key(domain), "frontier_size", by as i64).await?;
        Ok(())
    }

    /// Returns (offset, size).
    pub async fn offset_and_size(&self, domain: &str) -> Result<(u64, u64), MetadataError> {
        let mut conn = self.redis.clone();
        let (offset, size): (Option<u64>, Option<u64>) = conn
            .hget(key(domain), &["frontier_offset", "frontier_size"])
            .await?;
        Ok((offset.unwrap_or(0), size.unwrap_or(0)))
    }

    pub async fn advance_offset(&self, domain: &str) -> Result<u64, MetadataError> {
        let mut conn = self.redis.clone();
        let new_offset: u64 = conn.hincr(key(domain), "frontier_offset", 1i64).await?;
        Ok(new_offset)
    }

    pub async fn file_path(&self, domain: &str) -> Result<Option<String>, MetadataError> {
        let mut conn = self.redis.clone();
        let v: Option<String> = conn.hget(key(domain), "file_path").await?;
        Ok(v)
    }

    pub async fn is_excluded(&self, domain: &str) -> Result<bool, MetadataError> {
        let mut conn = self.redis.clone();
        let v: Option<i64> = conn.hget(key(domain), "is_excluded").await?;
        Ok(v.unwrap_or(0) != 0)
    }

    pub async fn is_seeded(&self, domain: &str) -> Result<bool, MetadataError> {
        let mut conn = self.redis.clone();
        let v: Option<i64> = conn.hget(key(domain), "is_seeded").await?;
        Ok(v.unwrap_or(0) != 0)
    }

    pub async fn set_excluded(&self, domain: &str) -> Result<(), MetadataError> {
        let mut conn = self.redis.clone();
        let _: () = conn.hset(key(domain), "is_excluded", "1").await?;
        Ok(())
    }

    pub async fn robots_cache(&self, domain: &str) -> Result<Option<(String, i64)>, MetadataError> {
        let mut conn = self.redis.clone();
        let (body, expires): (Option<String>, Option<i64>) = conn
            .hget(key(domain), &["robots_txt", "robots_expires"])
            .await?;
        match (body, expires) {
            (Some(b), Some(e)) => Ok(Some((b, e))),
            _ => Ok(None),
        }
    }

    pub async fn set_robots_cache(
        &self,
        domain: &str,
        body: &str,
        expires_at: i64,
    ) -> Result<(), MetadataError> {
        let mut conn = self.redis.clone();
        let _: () = conn
            .hset_multiple(
                key(domain),
                &[
                    ("robots_txt", body),
                    ("robots_expires", &expires_at.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn next_fetch_time(&self, domain: &str) -> Result<i64, MetadataError> {
        let mut conn = self.redis.clone();
        let v: Option<i64> = conn.hget(key(domain), "next_fetch_time").await?;
        Ok(v.unwrap_or(0))
    }

    /// Write `next_fetch_time`, clamped so the field never moves backwards
    /// (monotonically non-decreasing).
    pub async fn set_next_fetch_time(&self, domain: &str, value: i64) -> Result<(), MetadataError> {
        let current = self.next_fetch_time(domain).await?;
        let clamped = value.max(current);
        let mut conn = self.redis.clone();
        let _: () = conn.hset(key(domain), "next_fetch_time", clamped).await?;
        Ok(())
    }
}
