//! Primary Client (C1). Fetches scoreboard and per-event summary JSON for a
//! sport+date or game id, the way `TheSportsDB` provider fetches its
//! livescore endpoint — a thin `reqwest::Client` with a fixed timeout and a
//! base URL that can be overridden for tests.

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::IngestError;
use crate::sport::Sport;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub struct PrimaryClient {
    http: Client,
    base_url: String,
}

impl PrimaryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("reqwest client builds");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// `GET {base}/{sport_path}/scoreboard[?dates=YYYYMMDD]`.
    pub async fn fetch_scoreboard(
        &self,
        sport: Sport,
        date: Option<chrono::NaiveDate>,
    ) -> Result<serde_json::Value, IngestError> {
        let mut url = format!("{}/{}/scoreboard", self.base_url, sport.primary_path());
        if let Some(d) = date {
            url.push_str(&format!("?dates={}", d.format("%Y%m%d")));
        }
        self.get_json(&url).await
    }

    /// `GET {base}/{sport_path}/summary?event={external_id}`.
    pub async fn fetch_summary(
        &self,
        sport: Sport,
        external_game_id: &str,
    ) -> Result<serde_json::Value, IngestError> {
        let url = format!(
            "{}/{}/summary?event={}",
            self.base_url,
            sport.primary_path(),
            external_game_id
        );
        self.get_json(&url).await
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, IngestError> {
        debug!(url, "fetching from primary upstream");

        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                IngestError::UpstreamTimeout(url.to_string())
            } else {
                IngestError::UpstreamRejected(format!("{e}"))
            }
        })?;

        let body = resp
            .text()
            .await
            .map_err(|e| IngestError::UpstreamTimeout(format!("{e}")))?;

        // Some upstreams return an HTML error/interstitial page with a 200
        // status; detect it by the leading `<` before attempting to parse.
        if body.trim_start().starts_with('<') {
            return Err(IngestError::UpstreamRejected(
                body.chars().take(120).collect(),
            ));
        }

        serde_json::from_str(&body).map_err(|e| IngestError::UpstreamMalformed {
            reason: e.to_string(),
            payload_prefix: body.chars().take(200).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoreboard_url_includes_date() {
        let client = PrimaryClient::new("https://example.test");
        // exercised indirectly through fetch_scoreboard in integration tests;
        // this just locks the path-building convention.
        assert_eq!(
            format!("{}/{}/scoreboard", client.base_url, Sport::Basketball.primary_path()),
            "https://example.test/basketball/nba/scoreboard"
        );
    }
}
