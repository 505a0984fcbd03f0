//! The shared HTTP client the fetch worker pool drives. Per-domain pacing
//! is owned entirely by the politeness enforcer's `next_fetch_time`
//! bookkeeping, not by this client — there is no per-domain rate limiter
//! here; the connection-limit-per-host=1 discipline is enforced by the
//! frontier's claim/push-back protocol.

use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const FETCH_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;
/// Bounded body size; the fetch result is truncated rather than rejected
/// past this many bytes.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub initial_url: String,
    pub final_url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub is_redirect: bool,
    pub truncated: bool,
}

impl FetchResult {
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    pub fn is_error_status(&self) -> bool {
        self.status_code >= 400
    }
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .pool_max_idle_per_host(1)
            .build()
            .expect("failed to build HTTP client");
        Fetcher { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let response = self.client.get(url).send().await?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let (body, truncated) = read_bounded_body(response).await?;

        Ok(FetchResult {
            initial_url: url.to_string(),
            is_redirect: final_url != url,
            final_url,
            status_code,
            content_type,
            body,
            truncated,
        })
    }
}

async fn read_bounded_body(response: reqwest::Response) -> Result<(String, bool), FetchError> {
    let mut bytes = Vec::new();
    let mut truncated = false;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len() + chunk.len() > MAX_BODY_BYTES {
            let remaining = MAX_BODY_BYTES.saturating_sub(bytes.len());
            bytes.extend_from_slice(&chunk[..remaining]);
            truncated = true;
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok((String::from_utf8_lossy(&bytes).into_owned(), truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_html_matches_content_type_case_insensitively() {
        let result = FetchResult {
            initial_url: "http://a.com".into(),
            final_url: "http://a.com".into(),
            status_code: 200,
            content_type: Some("Text/HTML; charset=utf-8".into()),
            body: String::new(),
            is_redirect: false,
            truncated: false,
        };
        assert!(result.is_html());
    }

    #[test]
    fn is_html_false_for_json() {
        let result = FetchResult {
            initial_url: "http://a.com".into(),
            final_url: "http://a.com".into(),
            status_code: 200,
            content_type: Some("application/json".into()),
            body: String::new(),
            is_redirect: false,
            truncated: false,
        };
        assert!(!result.is_html());
    }

    #[test]
    fn is_error_status_at_400_boundary() {
        let mut result = FetchResult {
            initial_url: "http://a.com".into(),
            final_url: "http://a.com".into(),
            status_code: 399,
            content_type: None,
            body: String::new(),
            is_redirect: false,
            truncated: false,
        };
        assert!(!result.is_error_status());
        result.status_code = 400;
        assert!(result.is_error_status());
    }
}
