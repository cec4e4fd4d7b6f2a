//! PostgreSQL access layer. `Database` wraps a single `sqlx::PgPool` — one
//! writer, no sharding — and applies the embedded schema on startup via
//! `execute_batch`, the same idiom used for applying schema SQL at boot.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod models;
pub mod repositories;
mod schema;

pub use repositories::{
    BackfillJobRepository, GameRepository, PlayerGameStatsRepository, PlayerRepository,
    SeasonRepository, TeamGameStatsRepository, TeamRepository,
};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect with a small bounded retry loop, matching the connect-with-
    /// backoff idiom used for the odds-ingestion service this crate draws
    /// its Postgres/Redis plumbing from.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let mut attempt = 0u32;
        let pool = loop {
            attempt += 1;
            match PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) if attempt < 5 => {
                    tracing::warn!(attempt, error = %e, "database connection failed, retrying");
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt.min(4)))).await;
                }
                Err(e) => return Err(e).context("failed to connect to database after retries"),
            }
        };
        let db = Database { pool };
        db.apply_schema().await?;
        Ok(db)
    }

    async fn apply_schema(&self) -> Result<()> {
        sqlx::raw_sql(schema::SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .context("failed to apply schema")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn seasons(&self) -> SeasonRepository<'_> {
        SeasonRepository::new(&self.pool)
    }

    pub fn teams(&self) -> TeamRepository<'_> {
        TeamRepository::new(&self.pool)
    }

    pub fn players(&self) -> PlayerRepository<'_> {
        PlayerRepository::new(&self.pool)
    }

    pub fn games(&self) -> GameRepository<'_> {
        GameRepository::new(&self.pool)
    }

    pub fn player_game_stats(&self) -> PlayerGameStatsRepository<'_> {
        PlayerGameStatsRepository::new(&self.pool)
    }

    pub fn team_game_stats(&self) -> TeamGameStatsRepository<'_> {
        TeamGameStatsRepository::new(&self.pool)
    }

    pub fn backfill_jobs(&self) -> BackfillJobRepository<'_> {
        BackfillJobRepository::new(&self.pool)
    }
}
