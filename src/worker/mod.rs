//! The fetch worker pool: N cooperative tasks, each looping "claim URL →
//! check politeness (already done by the frontier) → fetch → enqueue body →
//! record outcome", sharing one HTTP client.

pub mod fetcher;

use crate::content_store::ContentStore;
use crate::frontier::FrontierManager;
use crate::metrics::Metrics;
use crate::models::FetchQueueItem;
use crate::visited::{VisitedRecord, VisitedStore};
use fetcher::{FetchError, FetchResult, Fetcher};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const FETCH_QUEUE_KEY: &str = "fetch:queue";
const EMPTY_FRONTIER_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct FetchWorkerPoolConfig {
    pub max_workers: usize,
    pub max_pages: Option<u32>,
}

pub struct FetchWorkerPool {
    frontier: Arc<FrontierManager>,
    fetcher: Fetcher,
    visited: VisitedStore,
    content_store: Arc<ContentStore>,
    metrics: Arc<Metrics>,
    redis: ConnectionManager,
    config: FetchWorkerPoolConfig,
    idle_streak: AtomicU32,
}

impl FetchWorkerPool {
    pub fn new(
        frontier: Arc<FrontierManager>,
        fetcher: Fetcher,
        visited: VisitedStore,
        content_store: Arc<ContentStore>,
        metrics: Arc<Metrics>,
        redis: ConnectionManager,
        config: FetchWorkerPoolConfig,
    ) -> Self {
        FetchWorkerPool {
            frontier,
            fetcher,
            visited,
            content_store,
            metrics,
            redis,
            config,
            idle_streak: AtomicU32::new(0),
        }
    }

    /// Drive all workers until the frontier is exhausted, `max_pages` is
    /// reached, or `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut set: JoinSet<()> = JoinSet::new();
        for worker_id in 0..self.config.max_workers {
            let pool = self.clone();
            let cancel = cancel.clone();
            set.spawn(async move { pool.worker_loop(worker_id, cancel).await });
        }
        while set.join_next().await.is_some() {}
    }

    async fn worker_loop(&self, worker_id: usize, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(max) = self.config.max_pages {
                if self.metrics.pages_fetched.load(Ordering::Relaxed) as u32 >= max {
                    cancel.cancel();
                    break;
                }
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.frontier.get_next_url() => res,
            };

            match next {
                Ok(Some((url, domain, depth))) => {
                    self.idle_streak.store(0, Ordering::SeqCst);
                    self.process_url(worker_id, url, domain, depth).await;
                }
                Ok(None) => {
                    // No sleep-with-timing-authority here beyond the plain
                    // retry delay: the politeness enforcer owns pacing, the
                    // worker only owns "try again shortly".
                    let idle = self.idle_streak.fetch_add(1, Ordering::SeqCst) + 1;
                    if idle as usize >= self.config.max_workers.max(1) * 4 {
                        tracing::info!(worker_id, "frontier appears drained, signaling shutdown");
                        cancel.cancel();
                        break;
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(EMPTY_FRONTIER_RETRY_DELAY) => {}
                    }
                }
                Err(e) => {
                    // Redis errors propagate as fatal: stop this worker and
                    // let the others discover the same failure on their next
                    // claim.
                    tracing::error!(worker_id, error = %e, "frontier error, worker exiting");
                    break;
                }
            }
        }
    }

    async fn process_url(&self, worker_id: usize, url: String, domain: String, depth: u32) {
        let start = std::time::Instant::now();
        match self.fetcher.fetch(&url).await {
            Ok(result) => {
                self.metrics.incr_fetched();
                if result.is_error_status() || !result.is_html() {
                    self.handle_non_html_or_error(&result).await;
                } else {
                    self.handle_html(&result, &domain, depth).await;
                }
                tracing::debug!(
                    worker_id,
                    url = %url,
                    status = result.status_code,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "fetch complete"
                );
            }
            Err(FetchError::Transport(e)) => {
                self.metrics.incr_errored();
                tracing::warn!(worker_id, url = %url, error = %e, "fetch failed");
            }
        }
        // The fetch result (and its HTML body) goes out of scope here —
        // nothing retains it past this function.
    }

    async fn handle_non_html_or_error(&self, result: &FetchResult) {
        self.metrics.incr_errored();
        let record = VisitedRecord {
            url: result.final_url.clone(),
            status_code: result.status_code,
            content_type: result.content_type.clone(),
            crawled_timestamp: now_secs(),
        };
        if let Err(e) = self.visited.record(&record).await {
            tracing::warn!(url = %result.final_url, error = %e, "failed to record visited page");
        }
    }

    async fn handle_html(&self, result: &FetchResult, domain: &str, depth: u32) {
        if let Err(e) = self.content_store.store(&result.body).await {
            tracing::warn!(url = %result.final_url, error = %e, "failed to persist content");
        }

        let item = FetchQueueItem {
            url: result.final_url.clone(),
            domain: domain.to_string(),
            depth,
            html_content: result.body.clone(),
            content_type: result.content_type.clone(),
            crawled_timestamp: now_secs(),
            status_code: result.status_code,
            is_redirect: result.is_redirect,
            initial_url: result.initial_url.clone(),
        };

        match serde_json::to_string(&item) {
            Ok(json) => {
                let mut conn = self.redis.clone();
                if let Err(e) = conn.rpush::<_, _, ()>(FETCH_QUEUE_KEY, json).await {
                    tracing::error!(url = %result.final_url, error = %e, "failed to enqueue fetch result");
                    self.metrics.incr_errored();
                    return;
                }
                self.metrics.incr_html_queued();
            }
            Err(e) => {
                tracing::error!(url = %result.final_url, error = %e, "failed to serialize fetch result");
            }
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}
