use clap::Parser;
use crawler::config::{Cli, Config};
use crawler::content_store::ContentStore;
use crawler::frontier::bloom::SeenFilter;
use crawler::frontier::file_store::FrontierFileStore;
use crawler::frontier::metadata::DomainMetaStore;
use crawler::frontier::ready_queue::ReadyQueue;
use crawler::frontier::FrontierManager;
use crawler::metrics::Metrics;
use crawler::politeness::exclusion::{load_exclusion_file, ExclusionList, ExclusionMode};
use crawler::politeness::{Politeness, PolitenessEnforcer, MIN_CRAWL_DELAY_SECS};
use crawler::seed::load_seed_file;
use crawler::visited::VisitedStore;
use crawler::worker::fetcher::Fetcher;
use crawler::worker::{FetchWorkerPool, FetchWorkerPoolConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::from_cli(cli).expect("invalid configuration");

    fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(data_dir = %config.data_dir.display(), "starting crawl");

    let client = redis::Client::open(config.redis_url.as_str()).expect("invalid redis URL");
    let conn = redis::aio::ConnectionManager::new(client)
        .await
        .expect("failed to connect to redis");

    let metadata = DomainMetaStore::new(conn.clone());
    let seen = SeenFilter::new(conn.clone());
    let ready_queue = ReadyQueue::new(conn.clone());
    let file_store = FrontierFileStore::new(&config.data_dir);
    let visited = VisitedStore::new(conn.clone());

    if !config.resume {
        // Fresh start: the seen set must not remember anything from a
        // previous run, so a rerun re-fetches everything it's told to.
        seen.clear().await.expect("failed to reset seen set");
    }

    let exclusion_mode = if config.seeded_urls_only {
        ExclusionMode::SeededOnly
    } else {
        ExclusionMode::Default
    };
    let exclusions = ExclusionList::new(metadata.clone(), exclusion_mode);
    if let Some(path) = &config.exclude_file {
        let domains = load_exclusion_file(path)
            .await
            .expect("failed to read exclude file");
        exclusions
            .seed_exclusions(&domains)
            .await
            .expect("failed to seed exclusions");
    }

    let politeness: Arc<dyn Politeness> = Arc::new(PolitenessEnforcer::new(
        metadata.clone(),
        exclusions,
        config.user_agent.clone(),
        MIN_CRAWL_DELAY_SECS,
    ));

    let metrics = Arc::new(Metrics::new());

    let frontier = Arc::new(FrontierManager::new(
        metadata,
        seen,
        ready_queue,
        file_store,
        politeness,
        metrics.clone(),
    ));

    if let Some(path) = &config.seed_file {
        let seed_urls = load_seed_file(path).await.expect("failed to read seed file");
        let added = frontier
            .add_urls_batch(&seed_urls, 0, true)
            .await
            .expect("failed to seed frontier");
        tracing::info!(count = added, "seeded frontier");
    }

    let fetcher = Fetcher::new(&config.user_agent);
    let content_store = Arc::new(ContentStore::new(&config.data_dir));

    let pool = Arc::new(FetchWorkerPool::new(
        frontier,
        fetcher,
        visited,
        content_store,
        metrics.clone(),
        conn,
        FetchWorkerPoolConfig {
            max_workers: config.max_workers,
            max_pages: config.max_pages,
        },
    ));

    let cancel = CancellationToken::new();
    let shutdown_signal = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received, draining in-flight fetches");
            cancel.cancel();
        })
    };

    let duration_guard = config.max_duration_secs.map(|secs| {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::info!("max duration reached, stopping");
            cancel.cancel();
        })
    });

    pool.run(cancel).await;
    metrics.log_snapshot();

    shutdown_signal.abort();
    if let Some(guard) = duration_guard {
        guard.abort();
    }
}
