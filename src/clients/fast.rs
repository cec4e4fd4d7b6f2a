//! Fast Client (C2). Fetches the public search-result page for a query and
//! returns the raw HTML for the Fast Parser (C4) to scrape. Enforces a
//! minimum inter-request interval with `governor`, the same rate-limiting
//! crate the pack's odds-ingestion service uses to stay under its upstream's
//! per-minute quota.

use governor::{Quota, RateLimiter};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use reqwest::Client;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use crate::error::IngestError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

pub struct FastClient {
    http: Client,
    base_url: String,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl FastClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_min_interval(base_url, DEFAULT_MIN_INTERVAL)
    }

    pub fn with_min_interval(base_url: impl Into<String>, min_interval: Duration) -> Self {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("reqwest client builds");
        // One permit per `min_interval`, expressed as a per-minute quota so
        // a sub-second interval still rounds to at least 1 request/period.
        let per_minute = (Duration::from_secs(60).as_secs_f64() / min_interval.as_secs_f64())
            .max(1.0) as u32;
        let quota = Quota::per_minute(NonZeroU32::new(per_minute.max(1)).unwrap());
        Self {
            http,
            base_url: base_url.into(),
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Renders the search-result page for `query` and returns the outer
    /// HTML. Back-pressure is the rate limiter's `until_ready`, which blocks
    /// the caller rather than failing when the quota is exhausted.
    pub async fn fetch_search_html(&self, query: &str) -> Result<String, IngestError> {
        self.limiter.until_ready().await;

        let url = format!("{}/search", self.base_url);
        debug!(url, query, "fetching from fast upstream");

        let resp = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IngestError::UpstreamTimeout(url.clone())
                } else {
                    IngestError::UpstreamRejected(format!("{e}"))
                }
            })?;

        let body = resp
            .text()
            .await
            .map_err(|e| IngestError::UpstreamTimeout(format!("{e}")))?;

        if body.trim().is_empty() {
            return Err(IngestError::UpstreamMalformed {
                reason: "empty response body".to_string(),
                payload_prefix: String::new(),
            });
        }

        Ok(body)
    }

    /// Convenience wrapper matching the scoreboard query the live poller
    /// issues on every tick.
    pub async fn fetch_live_games_html(&self) -> Result<String, IngestError> {
        self.fetch_search_html("live games today").await
    }
}
