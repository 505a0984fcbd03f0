//! The politeness enforcer: the authority on whether a given URL/domain may
//! be fetched right now.

pub mod exclusion;
pub mod robots_cache;

use crate::domain::extract_domain;
use crate::frontier::metadata::{now_secs, DomainMetaStore, MetadataError};
use async_trait::async_trait;
use exclusion::{ExclusionError, ExclusionList};
use robots_cache::{RobotsCache, RobotsError};
use thiserror::Error;

/// Minimum seconds between successive fetches to one domain, used even when
/// robots.txt specifies nothing or a shorter delay.
pub const MIN_CRAWL_DELAY_SECS: u64 = 70;

#[derive(Debug, Error)]
pub enum PolitenessError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Robots(#[from] RobotsError),
    #[error(transparent)]
    Exclusion(#[from] ExclusionError),
}

/// The seam the frontier manager calls through, so it can be exercised
/// against a fake in tests without standing up Redis or a robots.txt server.
#[async_trait]
pub trait Politeness: Send + Sync {
    async fn is_url_allowed(&self, url: &str) -> Result<bool, PolitenessError>;
    async fn can_fetch_domain_now(&self, domain: &str) -> Result<bool, PolitenessError>;
    async fn record_domain_fetch_attempt(&self, domain: &str) -> Result<(), PolitenessError>;
    async fn get_crawl_delay(&self, domain: &str) -> Result<u64, PolitenessError>;
}

pub struct PolitenessEnforcer {
    metadata: DomainMetaStore,
    exclusions: ExclusionList,
    robots: RobotsCache,
    user_agent: String,
    min_crawl_delay: u64,
}

impl PolitenessEnforcer {
    pub fn new(
        metadata: DomainMetaStore,
        exclusions: ExclusionList,
        user_agent: String,
        min_crawl_delay: u64,
    ) -> Self {
        let robots = RobotsCache::new(metadata.clone(), user_agent.clone());
        PolitenessEnforcer {
            metadata,
            exclusions,
            robots,
            user_agent,
            min_crawl_delay,
        }
    }
}

#[async_trait]
impl Politeness for PolitenessEnforcer {
    async fn is_url_allowed(&self, url: &str) -> Result<bool, PolitenessError> {
        let Some(domain) = extract_domain(url) else {
            return Ok(false);
        };

        if self.exclusions.is_excluded(&domain).await? {
            return Ok(false);
        }

        let robot = self.robots.get(&domain).await?;
        let path = match url::Url::parse(url) {
            Ok(u) => match u.query() {
                Some(q) => format!("{}?{}", u.path(), q),
                None => u.path().to_string(),
            },
            Err(_) => return Ok(false),
        };
        Ok(robot.allowed(&path))
    }

    async fn can_fetch_domain_now(&self, domain: &str) -> Result<bool, PolitenessError> {
        let next_fetch_time = self.metadata.next_fetch_time(domain).await?;
        Ok(now_secs() >= next_fetch_time)
    }

    async fn record_domain_fetch_attempt(&self, domain: &str) -> Result<(), PolitenessError> {
        let delay = self.get_crawl_delay(domain).await?;
        let next = now_secs() + delay as i64;
        self.metadata.set_next_fetch_time(domain, next).await?;
        Ok(())
    }

    async fn get_crawl_delay(&self, domain: &str) -> Result<u64, PolitenessError> {
        let robot = self.robots.get(domain).await?;
        let from_robots = robot.delay.unwrap_or(0) as u64;
        Ok(from_robots.max(self.min_crawl_delay))
    }
}

impl PolitenessEnforcer {
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
