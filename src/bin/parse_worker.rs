//! The link-extraction process: consumes HTML bodies the fetch workers
//! enqueued, extracts outbound links, and feeds them back into the frontier
//! one depth deeper.

use clap::Parser;
use crawler::frontier::bloom::SeenFilter;
use crawler::frontier::file_store::FrontierFileStore;
use crawler::frontier::metadata::DomainMetaStore;
use crawler::frontier::ready_queue::ReadyQueue;
use crawler::frontier::FrontierManager;
use crawler::metrics::Metrics;
use crawler::models::FetchQueueItem;
use crawler::politeness::exclusion::{ExclusionList, ExclusionMode};
use crawler::politeness::{Politeness, PolitenessEnforcer, MIN_CRAWL_DELAY_SECS};
use redis::AsyncCommands;
use scraper::{Html, Selector};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

const FETCH_QUEUE_KEY: &str = "fetch:queue";
/// Seconds to block on an empty queue before looping to re-check shutdown.
const BRPOP_TIMEOUT_SECS: f64 = 5.0;

#[derive(Debug, Parser)]
#[command(name = "parse_worker", about = "Extracts links from fetched pages")]
struct Cli {
    #[arg(long, default_value = "./crawl-data")]
    data_dir: PathBuf,

    #[arg(long, default_value = "crawler@example.com")]
    email: String,

    #[arg(long, default_value_t = false)]
    seeded_urls_only: bool,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, default_value = "127.0.0.1")]
    redis_host: String,

    #[arg(long, default_value_t = 6379)]
    redis_port: u16,

    #[arg(long, default_value_t = 0)]
    redis_db: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let redis_url = format!("redis://{}:{}/{}", cli.redis_host, cli.redis_port, cli.redis_db);
    let client = redis::Client::open(redis_url.as_str()).expect("invalid redis URL");
    let conn = redis::aio::ConnectionManager::new(client)
        .await
        .expect("failed to connect to redis");

    let metadata = DomainMetaStore::new(conn.clone());
    let seen = SeenFilter::new(conn.clone());
    let ready_queue = ReadyQueue::new(conn.clone());
    let file_store = FrontierFileStore::new(&cli.data_dir);

    let exclusion_mode = if cli.seeded_urls_only {
        ExclusionMode::SeededOnly
    } else {
        ExclusionMode::Default
    };
    let exclusions = ExclusionList::new(metadata.clone(), exclusion_mode);
    let user_agent = format!("ExampleCrawler/1.0 (+mailto:{})", cli.email);
    let politeness: Arc<dyn Politeness> = Arc::new(PolitenessEnforcer::new(
        metadata.clone(),
        exclusions,
        user_agent,
        MIN_CRAWL_DELAY_SECS,
    ));

    let metrics = Arc::new(Metrics::new());
    let frontier = FrontierManager::new(metadata, seen, ready_queue, file_store, politeness, metrics);

    tracing::info!("parse worker ready, waiting on fetch:queue");

    let mut conn = conn;
    loop {
        let popped: Option<(String, String)> = conn
            .brpop(FETCH_QUEUE_KEY, BRPOP_TIMEOUT_SECS)
            .await
            .expect("redis error polling fetch:queue");

        let Some((_key, payload)) = popped else {
            continue;
        };

        let item: FetchQueueItem = match serde_json::from_str(&payload) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed fetch:queue entry");
                continue;
            }
        };

        let links = extract_links(&item.html_content, &item.url);
        if links.is_empty() {
            continue;
        }

        match frontier.add_urls_batch(&links, item.depth + 1, false).await {
            Ok(added) => {
                tracing::debug!(url = %item.url, found = links.len(), added, "links processed");
            }
            Err(e) => {
                tracing::error!(url = %item.url, error = %e, "failed to add discovered links");
            }
        }
    }
}

/// Resolve every `<a href>` against `base_url`, discarding anything that
/// doesn't resolve to an absolute http(s) URL (final normalization and
/// dedup happens inside the frontier's add path).
fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = url::Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|url| url.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_resolves_relative_links() {
        let html = r#"<html><body>
            <a href="/about">About</a>
            <a href="https://other.example.com/x">Other</a>
            <a href="mailto:hi@example.com">Mail</a>
            <a>No href</a>
        </body></html>"#;
        let links = extract_links(html, "https://example.com/blog/post");
        assert_eq!(
            links,
            vec![
                "https://example.com/about",
                "https://other.example.com/x",
            ]
        );
    }

    #[test]
    fn returns_empty_for_unparseable_base() {
        assert!(extract_links("<a href='/x'>x</a>", "not a url").is_empty());
    }
}
