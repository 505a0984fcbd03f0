//! `seen:bloom` — the Redis-resident probabilistic "URL has been seen"
//! membership test. Implemented against the RedisBloom module commands
//! (`BF.RESERVE`/`BF.ADD`/`BF.EXISTS`) since `redis-rs` has no built-in
//! bloom filter type; any command it can't parse as a typed reply is
//! issued as a raw `redis::cmd`, which is how this crate talks to it.

use redis::aio::ConnectionManager;
use redis::RedisError;
use thiserror::Error;

const BLOOM_KEY: &str = "seen:bloom";
/// ~10M items at 0.1% false-positive rate.
const CAPACITY: u64 = 10_000_000;
const ERROR_RATE: f64 = 0.001;

#[derive(Debug, Error)]
pub enum SeenFilterError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),
}

#[derive(Clone)]
pub struct SeenFilter {
    redis: ConnectionManager,
}

impl SeenFilter {
    pub fn new(redis: ConnectionManager) -> Self {
        SeenFilter { redis }
    }

    /// Reserve the filter if absent. Safe to call repeatedly — "already
    /// exists" is not an error.
    pub async fn ensure_reserved(&self) -> Result<(), SeenFilterError> {
        let mut conn = self.redis.clone();
        let result: Result<String, RedisError> = redis::cmd("BF.RESERVE")
            .arg(BLOOM_KEY)
            .arg(ERROR_RATE)
            .arg(CAPACITY)
            .query_async(&mut conn)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().to_lowercase().contains("exists") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// `true` means "possibly present" (drop the candidate); `false` means
    /// "definitely absent" (the candidate may proceed).
    pub async fn contains(&self, url: &str) -> Result<bool, SeenFilterError> {
        self.ensure_reserved().await?;
        let mut conn = self.redis.clone();
        let exists: i64 = redis::cmd("BF.EXISTS")
            .arg(BLOOM_KEY)
            .arg(url)
            .query_async(&mut conn)
            .await?;
        Ok(exists != 0)
    }

    /// Record `url` as seen. Idempotent.
    pub async fn insert(&self, url: &str) -> Result<(), SeenFilterError> {
        self.ensure_reserved().await?;
        let mut conn = self.redis.clone();
        let _: i64 = redis::cmd("BF.ADD")
            .arg(BLOOM_KEY)
            .arg(url)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Clear the filter entirely. Used on `resume=false` (fresh start).
    pub async fn clear(&self) -> Result<(), SeenFilterError> {
        let mut conn = self.redis.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(BLOOM_KEY)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
