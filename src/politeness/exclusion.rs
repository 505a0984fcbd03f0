//! Manual exclusion list: domains that must never be fetched, regardless of
//! what robots.txt says.

use crate::frontier::metadata::{DomainMetaStore, MetadataError};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::Path;
use thiserror::Error;
use tokio::sync::Mutex;

const EXCLUSION_CACHE_CAPACITY: usize = 100_000;

#[derive(Debug, Error)]
pub enum ExclusionError {
    #[error("io error reading exclusion file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Parse a manual exclusion file: one domain per line, `#`-prefixed comments
/// ignored, surrounding whitespace trimmed, blank lines skipped.
pub fn parse_exclusion_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| {
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            line.trim()
        })
        .filter(|line| !line.is_empty())
        .map(|line| line.to_lowercase())
        .collect()
}

pub async fn load_exclusion_file(path: &Path) -> Result<Vec<String>, ExclusionError> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(parse_exclusion_file(&contents))
}

/// Whether the crawl is restricted to seed domains ("seeded-only mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionMode {
    Default,
    SeededOnly,
}

/// LRU-cached view over each domain's `is_excluded`/`is_seeded` flags.
pub struct ExclusionList {
    metadata: DomainMetaStore,
    cache: Mutex<LruCache<String, bool>>,
    mode: ExclusionMode,
}

impl ExclusionList {
    pub fn new(metadata: DomainMetaStore, mode: ExclusionMode) -> Self {
        ExclusionList {
            metadata,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(EXCLUSION_CACHE_CAPACITY).unwrap(),
            )),
            mode,
        }
    }

    /// Write `is_excluded=1` for every listed domain. Called once at
    /// startup before any fetching begins.
    pub async fn seed_exclusions(&self, domains: &[String]) -> Result<(), ExclusionError> {
        for domain in domains {
            self.metadata.ensure_domain(domain, "", false).await?;
            self.metadata.set_excluded(domain).await?;
        }
        Ok(())
    }

    pub async fn is_excluded(&self, domain: &str) -> Result<bool, ExclusionError> {
        {
            let mut cache = self.cache.lock().await;
            if let Some(hit) = cache.get(domain) {
                return Ok(*hit);
            }
        }

        let excluded_flag = self.metadata.is_excluded(domain).await?;
        let excluded = match self.mode {
            ExclusionMode::Default => excluded_flag,
            ExclusionMode::SeededOnly => {
                excluded_flag || !self.metadata.is_seeded(domain).await?
            }
        };

        let mut cache = self.cache.lock().await;
        cache.put(domain.to_string(), excluded);
        Ok(excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_and_whitespace() {
        let contents = "  badsite.com  \n# a comment\n\nOther.Example.com\n";
        let domains = parse_exclusion_file(contents);
        assert_eq!(domains, vec!["badsite.com", "other.example.com"]);
    }

    #[test]
    fn strips_inline_comments() {
        let contents = "badsite.com # blocked for legal reasons\n";
        let domains = parse_exclusion_file(contents);
        assert_eq!(domains, vec!["badsite.com"]);
    }

    #[test]
    fn skips_blank_lines() {
        let contents = "\n\n   \nbadsite.com\n";
        assert_eq!(parse_exclusion_file(contents), vec!["badsite.com"]);
    }
}
