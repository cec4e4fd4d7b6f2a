//! Publisher (C12). Emits reconciled game transitions onto two Redis
//! Streams, keyed per sport, using the same `redis::aio::ConnectionManager` connect-with-
//! retry idiom the pack's odds-ingestion service uses for its own Redis
//! client.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::sport::Sport;

#[derive(Debug, Clone, Serialize)]
pub struct LiveUpdateEvent {
    pub external_game_id: String,
    pub home_team_abbr: String,
    pub away_team_abbr: String,
    pub home_score: i32,
    pub away_score: i32,
    pub period: Option<i32>,
    pub clock: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalStatsEvent {
    pub external_game_id: String,
    pub home_team_abbr: String,
    pub away_team_abbr: String,
    pub home_score: i32,
    pub away_score: i32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub struct Publisher {
    conn: ConnectionManager,
}

impl Publisher {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let mut attempt = 0u32;
        let conn = loop {
            attempt += 1;
            let client = redis::Client::open(redis_url)?;
            match client.get_connection_manager().await {
                Ok(conn) => break conn,
                Err(e) if attempt < 5 => {
                    warn!(attempt, error = %e, "redis connection failed, retrying");
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt.min(4)))).await;
                }
                Err(e) => return Err(e.into()),
            }
        };
        Ok(Self { conn })
    }

    fn live_updates_key(sport: Sport) -> String {
        format!("live-updates:{sport}")
    }

    fn final_stats_key(sport: Sport) -> String {
        format!("final-stats:{sport}")
    }

    /// At-least-once: `XADD` never loses an entry once acknowledged, and
    /// consumers are documented to dedupe on `(external_game_id,
    /// updated_at)` — a redelivered event is therefore harmless.
    pub async fn publish_live_update(
        &self,
        sport: Sport,
        event: &LiveUpdateEvent,
    ) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();
        let id: String = conn
            .xadd(Self::live_updates_key(sport), "*", &[("payload", payload)])
            .await?;
        info!(external_game_id = %event.external_game_id, stream_id = %id, "published live update");
        Ok(())
    }

    pub async fn publish_final_stats(
        &self,
        sport: Sport,
        event: &FinalStatsEvent,
    ) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();
        let id: String = conn
            .xadd(Self::final_stats_key(sport), "*", &[("payload", payload)])
            .await?;
        info!(external_game_id = %event.external_game_id, stream_id = %id, "published final stats");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_keys_are_namespaced_per_sport() {
        assert_eq!(Publisher::live_updates_key(Sport::Basketball), "live-updates:basketball");
        assert_eq!(Publisher::final_stats_key(Sport::Basketball), "final-stats:basketball");
    }
}
