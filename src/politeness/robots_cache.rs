//! Two-tier (in-memory LRU + Redis) robots.txt cache and retrieval.

use crate::frontier::metadata::{now_secs, DomainMetaStore, MetadataError};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use texting_robots::Robot;
use thiserror::Error;
use tokio::sync::Mutex;

const ROBOTS_CACHE_CAPACITY: usize = 100_000;
const ROBOTS_TTL_SECS: i64 = 24 * 60 * 60;
const ROBOTS_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum RobotsError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Result of consulting the two-tier cache.
enum RobotsLookup {
    Hit(String),
    Stale,
    Absent,
}

pub struct RobotsCache {
    metadata: DomainMetaStore,
    memory: Mutex<LruCache<String, Arc<Robot>>>,
    http: reqwest::Client,
    user_agent: String,
}

impl RobotsCache {
    pub fn new(metadata: DomainMetaStore, user_agent: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ROBOTS_FETCH_TIMEOUT_SECS))
            .user_agent(user_agent.clone())
            .build()
            .expect("failed to build robots.txt HTTP client");

        RobotsCache {
            metadata,
            memory: Mutex::new(LruCache::new(
                NonZeroUsize::new(ROBOTS_CACHE_CAPACITY).unwrap(),
            )),
            http,
            user_agent,
        }
    }

    fn simplified_agent(&self) -> &str {
        simplify_agent(&self.user_agent)
    }

    /// Fetch (or retrieve from cache) the parsed robots data for `domain`.
    pub async fn get(&self, domain: &str) -> Result<Arc<Robot>, RobotsError> {
        {
            let mut cache = self.memory.lock().await;
            if let Some(robot) = cache.get(domain) {
                return Ok(robot.clone());
            }
        }

        match self.redis_lookup(domain).await? {
            RobotsLookup::Hit(body) => Ok(self.store(domain, body).await),
            RobotsLookup::Stale | RobotsLookup::Absent => {
                let body = self.fetch_body(domain).await;
                let expires_at = now_secs() + ROBOTS_TTL_SECS;
                self.metadata
                    .set_robots_cache(domain, &body, expires_at)
                    .await?;
                Ok(self.store(domain, body).await)
            }
        }
    }

    async fn redis_lookup(&self, domain: &str) -> Result<RobotsLookup, RobotsError> {
        match self.metadata.robots_cache(domain).await? {
            Some((body, expires_at)) if expires_at > now_secs() => Ok(RobotsLookup::Hit(body)),
            Some(_) => Ok(RobotsLookup::Stale),
            None => Ok(RobotsLookup::Absent),
        }
    }

    async fn store(&self, domain: &str, body: String) -> Arc<Robot> {
        let agent = self.simplified_agent();
        let robot = match Robot::new(agent, body.as_bytes()) {
            Ok(r) if !body.as_bytes().contains(&0) => r,
            // NUL byte or a grammar the parser rejects: treat as empty
            // (allow-all).
            _ => Robot::new(agent, b"").expect("empty robots.txt always parses"),
        };
        let robot = Arc::new(robot);
        let mut cache = self.memory.lock().await;
        cache.put(domain.to_string(), robot.clone());
        robot
    }

    /// Try http, then https, then give up and treat as empty.
    async fn fetch_body(&self, domain: &str) -> String {
        for scheme in ["http", "https"] {
            let url = format!("{scheme}://{domain}/robots.txt");
            match self.http.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    if let Ok(text) = resp.text().await {
                        return text;
                    }
                }
                _ => continue,
            }
        }
        String::new()
    }
}

/// Parenthetical UA tokens (e.g. `MyBot (+https://example.com/bot)`) confuse
/// some robots parsers' longest-prefix matching; simplify to the leading
/// token before matching.
fn simplify_agent(user_agent: &str) -> &str {
    user_agent.split('(').next().unwrap_or(user_agent).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplifies_agent_with_trailing_parenthetical() {
        assert_eq!(
            simplify_agent("ExampleBot (+https://example.com/bot)"),
            "ExampleBot"
        );
    }

    #[test]
    fn leaves_plain_agent_untouched() {
        assert_eq!(simplify_agent("ExampleBot"), "ExampleBot");
    }
}
