//! The `fetch:queue` inter-process record: the payload shared between the
//! fetch workers and the parse worker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchQueueItem {
    pub url: String,
    pub domain: String,
    pub depth: u32,
    pub html_content: String,
    pub content_type: Option<String>,
    pub crawled_timestamp: i64,
    pub status_code: u16,
    pub is_redirect: bool,
    pub initial_url: String,
}
