//! Runtime configuration. Recognized keys are bound as CLI flags with
//! matching environment variable fallbacks; unrecognized environment
//! variables are ignored, not errors.

use clap::{Parser, Subcommand};

use crate::reconcile::ReconciliationStrategy;
use crate::sport::Sport;

#[derive(Parser, Debug, Clone)]
#[command(name = "hoopscore-core", version, about)]
pub struct Config {
    /// Sport to ingest.
    #[arg(long, env = "SPORT", default_value = "basketball")]
    pub sport: Sport,

    /// Season-year seed for the resolver, e.g. "2024-25".
    #[arg(long, env = "CURRENT_SEASON")]
    pub current_season: Option<String>,

    /// Live-poll cadence in seconds.
    #[arg(long, env = "LIVE_POLL_INTERVAL_SECS", default_value = "10")]
    pub live_poll_interval_secs: u64,

    /// Local hour (0-23, America/New_York) the daily backfill hook fires.
    #[arg(long, env = "DAILY_INGESTION_HOUR", default_value = "3")]
    pub daily_ingestion_hour: u32,

    /// Enable the live-polling task.
    #[arg(long, env = "ENABLE_LIVE_POLLING", default_value = "true")]
    pub enable_live_polling: bool,

    /// Enable the daily backfill hook.
    #[arg(long, env = "ENABLE_DAILY_INGESTION", default_value = "true")]
    pub enable_daily_ingestion: bool,

    /// Retry budget per live-poll tick.
    #[arg(long, env = "MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    /// Fixed delay between tick retries, in seconds.
    #[arg(long, env = "RETRY_DELAY_SECS", default_value = "5")]
    pub retry_delay_secs: u64,

    /// Primary upstream base URL.
    #[arg(long, env = "PRIMARY_BASE_URL", default_value = "https://site.api.espn.com/apis/site/v2/sports")]
    pub primary_base_url: String,

    /// Fast upstream base URL (public search page).
    #[arg(long, env = "FAST_BASE_URL", default_value = "https://www.google.com/search")]
    pub fast_base_url: String,

    /// Redis connection string for the publisher's two streams.
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost/hoopscore")]
    pub database_url: String,

    /// Reconciliation strategy for live polling and backfill alike.
    #[arg(long, env = "RECONCILIATION_STRATEGY", default_value = "smart-merge")]
    pub reconciliation_strategy: ReconciliationStrategyArg,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Enqueue a backfill job and exit once it's accepted onto the queue.
    Backfill {
        /// "YYYY-YY" season to replay in full.
        #[arg(long)]
        season: Option<String>,

        /// Start of an inclusive date range (requires --end).
        #[arg(long)]
        start: Option<chrono::NaiveDate>,

        /// End of an inclusive date range (requires --start).
        #[arg(long)]
        end: Option<chrono::NaiveDate>,

        /// External game id; may be repeated.
        #[arg(long = "game")]
        game_ids: Vec<String>,

        /// Walk the job without writing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ReconciliationStrategyArg {
    PreferAuthoritative,
    PreferLatest,
    SmartMerge,
}

impl From<ReconciliationStrategyArg> for ReconciliationStrategy {
    fn from(arg: ReconciliationStrategyArg) -> Self {
        match arg {
            ReconciliationStrategyArg::PreferAuthoritative => {
                ReconciliationStrategy::PreferAuthoritative
            }
            ReconciliationStrategyArg::PreferLatest => ReconciliationStrategy::PreferLatest,
            ReconciliationStrategyArg::SmartMerge => ReconciliationStrategy::SmartMerge,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.live_poll_interval_secs == 0 {
            anyhow::bail!("live_poll_interval_secs must be at least 1");
        }
        if self.daily_ingestion_hour > 23 {
            anyhow::bail!("daily_ingestion_hour must be between 0 and 23");
        }
        if let Some(season) = &self.current_season {
            if season.split_once('-').is_none() {
                anyhow::bail!("current_season must look like \"YYYY-YY\"");
            }
        }
        Ok(())
    }

    pub fn live_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.live_poll_interval_secs)
    }

    pub fn retry_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.retry_delay_secs)
    }
}
