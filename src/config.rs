//! Crawl configuration resolved once at startup from CLI flags via `clap`.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--seed-file is required unless --resume is set")]
    MissingSeedFile,
    #[error("--max-workers must be at least 1")]
    ZeroWorkers,
}

/// A polite, resumable web crawl.
#[derive(Debug, Parser)]
#[command(name = "crawler", about = "A polite, resumable web crawler")]
pub struct Cli {
    /// Newline-delimited file of seed URLs, crawled at depth 0.
    #[arg(long)]
    pub seed_file: Option<PathBuf>,

    /// Contact address advertised in the User-Agent string. Ignored if
    /// `--user-agent` is set.
    #[arg(long, default_value = "crawler@example.com")]
    pub email: String,

    /// Full User-Agent string to send with every request, overriding the
    /// default built from `--email`.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Directory for frontier files and fetched content.
    #[arg(long, default_value = "./crawl-data")]
    pub data_dir: PathBuf,

    /// Newline-delimited file of domains to never fetch.
    #[arg(long)]
    pub exclude_file: Option<PathBuf>,

    /// Number of concurrent fetch workers.
    #[arg(long, default_value_t = 8)]
    pub max_workers: usize,

    /// Stop after fetching this many pages.
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Stop after this many seconds, regardless of frontier state.
    #[arg(long)]
    pub max_duration_secs: Option<u64>,

    /// Tracing filter directive, e.g. "info" or "crawler=debug".
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Resume an existing crawl in `data_dir` instead of starting fresh.
    #[arg(long, default_value_t = false)]
    pub resume: bool,

    /// Restrict crawling to domains present in the seed file.
    #[arg(long, default_value_t = false)]
    pub seeded_urls_only: bool,

    #[arg(long, default_value = "127.0.0.1")]
    pub redis_host: String,

    #[arg(long, default_value_t = 6379)]
    pub redis_port: u16,

    #[arg(long, default_value_t = 0)]
    pub redis_db: u8,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub seed_file: Option<PathBuf>,
    pub user_agent: String,
    pub data_dir: PathBuf,
    pub exclude_file: Option<PathBuf>,
    pub max_workers: usize,
    pub max_pages: Option<u32>,
    pub max_duration_secs: Option<u64>,
    pub log_level: String,
    pub resume: bool,
    pub seeded_urls_only: bool,
    pub redis_url: String,
}

const USER_AGENT_PRODUCT: &str = "ExampleCrawler/1.0";

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if cli.max_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if cli.seed_file.is_none() && !cli.resume {
            return Err(ConfigError::MissingSeedFile);
        }

        let redis_url = format!(
            "redis://{}:{}/{}",
            cli.redis_host, cli.redis_port, cli.redis_db
        );
        let user_agent = cli
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("{USER_AGENT_PRODUCT} (+mailto:{})", cli.email));

        Ok(Config {
            seed_file: cli.seed_file,
            user_agent,
            data_dir: cli.data_dir,
            exclude_file: cli.exclude_file,
            max_workers: cli.max_workers,
            max_pages: cli.max_pages,
            max_duration_secs: cli.max_duration_secs,
            log_level: cli.log_level,
            resume: cli.resume,
            seeded_urls_only: cli.seeded_urls_only,
            redis_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            seed_file: Some(PathBuf::from("seeds.txt")),
            email: "ops@example.com".into(),
            user_agent: None,
            data_dir: PathBuf::from("./data"),
            exclude_file: None,
            max_workers: 4,
            max_pages: None,
            max_duration_secs: None,
            log_level: "info".into(),
            resume: false,
            seeded_urls_only: false,
            redis_host: "127.0.0.1".into(),
            redis_port: 6379,
            redis_db: 0,
        }
    }

    #[test]
    fn builds_user_agent_with_contact_email() {
        let config = Config::from_cli(base_cli()).unwrap();
        assert!(config.user_agent.contains("ops@example.com"));
    }

    #[test]
    fn user_agent_flag_overrides_email_builder() {
        let mut cli = base_cli();
        cli.user_agent = Some("CustomBot/2.0".into());
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.user_agent, "CustomBot/2.0");
    }

    #[test]
    fn rejects_zero_workers() {
        let mut cli = base_cli();
        cli.max_workers = 0;
        assert!(matches!(
            Config::from_cli(cli),
            Err(ConfigError::ZeroWorkers)
        ));
    }

    #[test]
    fn requires_seed_file_unless_resuming() {
        let mut cli = base_cli();
        cli.seed_file = None;
        assert!(matches!(
            Config::from_cli(cli),
            Err(ConfigError::MissingSeedFile)
        ));

        cli.resume = true;
        assert!(Config::from_cli(cli).is_ok());
    }
}
