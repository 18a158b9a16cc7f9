//! Polite, cached GET: conditional requests plus capped exponential backoff.
//!
//! Every call looks up the previous response for the URL and, if there is
//! one, sends `If-None-Match` / `If-Modified-Since`. A `304` answers with
//! the cached body. `429` and `5xx` are retried after
//! `min(60s, base * 2^(attempt-1))`; any other non-2xx fails immediately.

use super::cache::{cache_key, CacheEntry, CacheStore};
use super::http_client::{HttpClient, HttpResponse};
use reqwest::header::{HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on a single backoff wait.
pub const MAX_BACKOFF: Duration = Duration::from_millis(60_000);

/// A fetch that did not produce a usable body.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport { .. } => None,
        }
    }
}

/// Retry policy for transient statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_backoff: Duration::from_millis(1_000),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt, after `attempt` (1-based) failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

/// Whether a status is worth retrying.
pub fn is_transient(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// How a body was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// `2xx`, stored in the cache.
    Fetched,
    /// `304`, served from the cache.
    NotModified,
}

/// A successful fetch with its retry history.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub body: String,
    pub freshness: Freshness,
    pub attempts: u32,
    /// Backoff waits taken before each retry, in order.
    pub waits: Vec<Duration>,
}

/// The fetch layer used by every network-touching stage.
#[derive(Clone)]
pub struct FetchCache {
    client: HttpClient,
    store: Arc<dyn CacheStore>,
    policy: RetryPolicy,
}

impl FetchCache {
    pub fn new(client: HttpClient, store: Arc<dyn CacheStore>, policy: RetryPolicy) -> Self {
        Self {
            client,
            store,
            policy,
        }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch a text resource through the cache.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_detailed(url).await.map(|o| o.body)
    }

    /// Fetch a text resource, reporting freshness and backoff history.
    pub async fn fetch_detailed(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let key = cache_key(url);
        let prior = self.store.get(&key);

        let mut headers: Vec<(HeaderName, String)> = Vec::new();
        if let Some(entry) = &prior {
            if let Some(tag) = &entry.etag {
                debug!("Setting If-None-Match: {tag}");
                headers.push((IF_NONE_MATCH, tag.clone()));
            }
            if let Some(lm) = &entry.last_modified {
                debug!("Setting If-Modified-Since: {lm}");
                headers.push((IF_MODIFIED_SINCE, lm.clone()));
            }
        }

        let (resp, attempts, waits) = self.send_with_retry(url, &headers).await?;

        if resp.status == 304 {
            if let Some(entry) = prior {
                info!("not modified (304) for {url}");
                return Ok(FetchOutcome {
                    body: entry.body,
                    freshness: Freshness::NotModified,
                    attempts,
                    waits,
                });
            }
        }

        if !resp.is_success() {
            return Err(FetchError::Status {
                status: resp.status,
                url: url.to_string(),
            });
        }

        let body = resp.text();
        let entry = CacheEntry {
            etag: resp.etag.clone(),
            last_modified: resp.last_modified.clone(),
            body: body.clone(),
        };
        if let Err(e) = self.store.put(&key, &entry) {
            warn!("failed to cache {url}: {e:#}");
        }
        debug!("fetched {} bytes from {url}", body.len());

        Ok(FetchOutcome {
            body,
            freshness: Freshness::Fetched,
            attempts,
            waits,
        })
    }

    /// Fetch binary content (images). Retried like text, never cached.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let (resp, _, _) = self.send_with_retry(url, &[]).await?;
        if !resp.is_success() {
            return Err(FetchError::Status {
                status: resp.status,
                url: url.to_string(),
            });
        }
        Ok(resp.body)
    }

    /// Send until a non-transient status or the retry budget runs out.
    ///
    /// Returns the last response, even if it is a transient failure.
    async fn send_with_retry(
        &self,
        url: &str,
        headers: &[(HeaderName, String)],
    ) -> Result<(HttpResponse, u32, Vec<Duration>), FetchError> {
        let mut attempt = 0u32;
        let mut waits = Vec::new();
        loop {
            attempt += 1;
            let resp = self
                .client
                .get(url, headers)
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;

            if is_transient(resp.status) && attempt <= self.policy.retries {
                let delay = self.policy.delay_for(attempt);
                warn!(
                    "HTTP {} for {url}, retry {attempt}/{} in {}ms",
                    resp.status,
                    self.policy.retries,
                    delay.as_millis()
                );
                waits.push(delay);
                tokio::time::sleep(delay).await;
                continue;
            }

            return Ok((resp, attempt, waits));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            retries: 10,
            base_backoff: Duration::from_millis(1_000),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4_000));
        assert_eq!(policy.delay_for(7), Duration::from_millis(60_000));
        assert_eq!(policy.delay_for(40), MAX_BACKOFF);
    }

    #[test]
    fn test_delays_are_non_decreasing() {
        let policy = RetryPolicy {
            retries: 50,
            base_backoff: Duration::from_millis(700),
        };
        let delays: Vec<_> = (1..50).map(|a| policy.delay_for(a)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= MAX_BACKOFF));
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(429));
        assert!(is_transient(500));
        assert!(is_transient(503));
        assert!(!is_transient(404));
        assert!(!is_transient(304));
        assert!(!is_transient(200));
    }
}
