//! robots.txt handling, limited to `Crawl-delay` for the wildcard agent.
//!
//! Anything that goes wrong while fetching or parsing robots.txt yields
//! the permissive policy: allowed, no delay.

use crate::acquisition::{FetchCache, MAX_BACKOFF};
use std::time::Duration;

/// Longest crawl delay honored; larger requests are clamped to this.
pub const MAX_CRAWL_DELAY: Duration = MAX_BACKOFF;

/// What robots.txt asks of us.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RobotsPolicy {
    pub allowed: bool,
    pub crawl_delay: Duration,
}

impl RobotsPolicy {
    pub fn permissive() -> Self {
        Self {
            allowed: true,
            crawl_delay: Duration::ZERO,
        }
    }

    /// Sleep for the crawl delay, if there is one.
    pub async fn wait(&self) {
        if !self.crawl_delay.is_zero() {
            tokio::time::sleep(self.crawl_delay).await;
        }
    }
}

/// Parse robots.txt, reading `Crawl-delay` under `User-agent: *`.
///
/// Delays are seconds and may be fractional. The last valid value in the
/// wildcard group wins.
pub fn parse_robots(body: &str) -> RobotsPolicy {
    let mut in_wildcard = false;
    let mut delay = Duration::ZERO;

    for line in body.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let field = field.trim().to_ascii_lowercase();
        let value = value.trim();

        match field.as_str() {
            "user-agent" => in_wildcard = value == "*",
            "crawl-delay" if in_wildcard => {
                if let Ok(secs) = value.parse::<f64>() {
                    if secs.is_finite() && secs >= 0.0 {
                        delay = clamp_delay(secs);
                    }
                }
            }
            _ => {}
        }
    }

    RobotsPolicy {
        allowed: true,
        crawl_delay: delay,
    }
}

fn clamp_delay(secs: f64) -> Duration {
    if secs > MAX_CRAWL_DELAY.as_secs_f64() {
        tracing::warn!(
            "Crawl-delay of {secs}s capped at {}s",
            MAX_CRAWL_DELAY.as_secs()
        );
        return MAX_CRAWL_DELAY;
    }
    Duration::from_millis((secs * 1000.0) as u64)
}

/// Fetch and parse `https://<host>/robots.txt`, failing open.
pub async fn fetch_robots(fetch: &FetchCache, origin: &str) -> RobotsPolicy {
    let url = format!("{}/robots.txt", origin.trim_end_matches('/'));
    match fetch.fetch(&url).await {
        Ok(body) => {
            let policy = parse_robots(&body);
            tracing::info!(
                "robots.txt: crawl delay {}ms",
                policy.crawl_delay.as_millis()
            );
            policy
        }
        Err(e) => {
            tracing::debug!("robots.txt unavailable ({e}), assuming no delay");
            RobotsPolicy::permissive()
        }
    }
}
