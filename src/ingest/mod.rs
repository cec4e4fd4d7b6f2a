//! Live Ingester & Scheduler (C8). Two periodic tasks — live polling and the
//! daily backfill hook — spawned as tokio tasks and wired into a `select!`
//! loop alongside a second periodic sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::America::New_York;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::clients::{FastClient, PrimaryClient};
use crate::db::models::GameStatus;
use crate::db::Database;
use crate::error::IngestError;
use crate::parsing::{fast_parser, primary_parser};
use crate::publish::{FinalStatsEvent, LiveUpdateEvent, Publisher};
use crate::reconcile::{self, Matcher, ReconciliationMetrics, ReconciliationStrategy};
use crate::resolve::{SeasonResolver, TeamPlayerResolver};
use crate::sport::Sport;

const CONSECUTIVE_FAILURE_THRESHOLD: u32 = 5;
const EXTRA_BACKOFF_ON_SUSTAINED_FAILURE: Duration = Duration::from_secs(20);
const STALE_GAME_THRESHOLD: chrono::Duration = chrono::Duration::hours(6);

pub struct LiveIngesterConfig {
    pub sport: Sport,
    pub live_poll_interval: Duration,
    pub daily_ingestion_hour: u32,
    pub strategy: ReconciliationStrategy,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

pub struct LiveIngester {
    db: Database,
    primary: PrimaryClient,
    fast: FastClient,
    resolver: Arc<TeamPlayerResolver>,
    season_resolver: SeasonResolver,
    metrics: Arc<ReconciliationMetrics>,
    publisher: Publisher,
    config: LiveIngesterConfig,
}

impl LiveIngester {
    pub fn new(
        db: Database,
        primary: PrimaryClient,
        fast: FastClient,
        resolver: Arc<TeamPlayerResolver>,
        metrics: Arc<ReconciliationMetrics>,
        publisher: Publisher,
        config: LiveIngesterConfig,
    ) -> Self {
        let season_resolver = SeasonResolver::new(db.clone());
        Self {
            db,
            primary,
            fast,
            resolver,
            season_resolver,
            metrics,
            publisher,
            config,
        }
    }

    pub fn sport(&self) -> Sport {
        self.config.sport
    }

    /// Spawns the live-polling task. `shutdown` is observed at the next
    /// suspension point, so at most one in-flight tick completes after
    /// cancellation.
    pub fn spawn_live_poll_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.live_poll_interval);
            let mut consecutive_failures: u32 = 0;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => {
                        info!("live poll loop shutting down");
                        break;
                    }
                }

                match self.run_tick_with_retry().await {
                    Ok(()) => consecutive_failures = 0,
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(error = %e, consecutive_failures, "live poll tick failed after retries");
                        if consecutive_failures > CONSECUTIVE_FAILURE_THRESHOLD {
                            warn!("sustained failures, backing off an extra 20s");
                            tokio::time::sleep(EXTRA_BACKOFF_ON_SUSTAINED_FAILURE).await;
                        }
                    }
                }
            }
        });
    }

    /// Spawns the once-per-24h backfill hook, firing at
    /// `daily_ingestion_hour` in `America/New_York`.
    pub fn spawn_daily_backfill_hook(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
        on_fire: impl Fn() -> tokio::task::JoinHandle<()> + Send + Sync + 'static,
    ) {
        tokio::spawn(async move {
            loop {
                let sleep_duration = self.duration_until_next_daily_hour();
                tokio::select! {
                    _ = tokio::time::sleep(sleep_duration) => {}
                    _ = shutdown.changed() => {
                        info!("daily backfill hook shutting down");
                        break;
                    }
                }
                info!("daily backfill hook firing");
                on_fire().await.ok();
            }
        });
    }

    fn duration_until_next_daily_hour(&self) -> Duration {
        let now = Utc::now().with_timezone(&New_York);
        let target_today = now
            .date_naive()
            .and_hms_opt(self.config.daily_ingestion_hour, 0, 0)
            .expect("valid hour 0..23");
        let target = if now.naive_local() < target_today {
            target_today
        } else {
            target_today + chrono::Duration::days(1)
        };
        (target - now.naive_local())
            .to_std()
            .unwrap_or(Duration::from_secs(1))
    }

    async fn run_tick_with_retry(&self) -> Result<(), IngestError> {
        let max_retries = self.config.max_retries;
        let mut last_err = None;
        for attempt in 0..=max_retries {
            match self.run_tick().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    warn!(attempt, error = %e, "retrying tick");
                    last_err = Some(e);
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(IngestError::CancellationRequested))
    }

    /// One live-poll tick.
    async fn run_tick(&self) -> Result<(), IngestError> {
        let today = Utc::now().with_timezone(&New_York).date_naive();
        let sport = self.config.sport;

        let scoreboard = self.primary.fetch_scoreboard(sport, Some(today)).await?;
        let primary_games = primary_parser::parse_scoreboard(&scoreboard);

        let fast_html = self.fast.fetch_live_games_html().await?;
        let fast_games = fast_parser::parse_live_games(&fast_html);

        let abbreviations = self.resolver.external_id_to_abbreviation(sport).await?;
        let matched = Matcher::new(&abbreviations).pair(primary_games, fast_games);

        if !matched.unmatched_fast.is_empty() {
            info!(
                count = matched.unmatched_fast.len(),
                "dropping fast-only games with no matching primary record"
            );
        }

        for (primary_game, fast_game) in matched.paired {
            if let Err(e) = self
                .process_game(sport, &scoreboard, &primary_game, fast_game.as_ref())
                .await
            {
                warn!(
                    external_id = %primary_game.external_id,
                    error = %e,
                    "skipping game after processing error"
                );
            }
        }

        self.db
            .games()
            .cleanup_stale_games(sport, STALE_GAME_THRESHOLD)
            .await?;

        Ok(())
    }

    async fn process_game(
        &self,
        sport: Sport,
        scoreboard: &serde_json::Value,
        primary_game: &crate::parsing::ParsedGame,
        fast_game: Option<&crate::parsing::FastGame>,
    ) -> Result<(), IngestError> {
        let season = match &primary_game.season_year {
            Some(year) => {
                self.season_resolver
                    .resolve_for_season_year(sport, year)
                    .await?
            }
            None => {
                self.season_resolver
                    .resolve_for_date(sport, primary_game.start_date.date_naive(), Some(scoreboard))
                    .await?
            }
        };
        self.process_game_with_season(sport, primary_game, fast_game, season)
            .await
    }

    /// Processes one Primary (+ optional Fast) game once its season is
    /// already known. Shared by the live poll tick and the backfill driver,
    /// which each resolve the season through a different path.
    async fn process_game_with_season(
        &self,
        sport: Sport,
        primary_game: &crate::parsing::ParsedGame,
        fast_game: Option<&crate::parsing::FastGame>,
        season: crate::db::models::Season,
    ) -> Result<(), IngestError> {
        let home_team = self
            .resolver
            .resolve_team(
                sport,
                &primary_game.home.external_team_id,
                primary_game.home.abbreviation.as_deref(),
            )
            .await?;
        let away_team = self
            .resolver
            .resolve_team(
                sport,
                &primary_game.away.external_team_id,
                primary_game.away.abbreviation.as_deref(),
            )
            .await?;

        let outcome = reconcile::reconcile(
            Some(primary_game),
            fast_game,
            self.config.strategy,
        )?;
        self.metrics.record(outcome.preferred, outcome.conflict);

        let game = self
            .db
            .games()
            .upsert(
                sport,
                &primary_game.external_id,
                season.id,
                home_team.id,
                away_team.id,
                outcome.fields.status,
                outcome.fields.period,
                outcome.fields.clock.as_deref(),
                outcome.fields.home_score,
                outcome.fields.away_score,
                primary_game.attendance,
                primary_game.venue.as_deref(),
                primary_game.start_date,
            )
            .await?;

        if game.status == GameStatus::InProgress {
            self.ingest_box_score(sport, &game).await?;
            self.publisher
                .publish_live_update(
                    sport,
                    &LiveUpdateEvent {
                        external_game_id: game.external_id.clone(),
                        home_team_abbr: home_team.abbreviation.clone(),
                        away_team_abbr: away_team.abbreviation.clone(),
                        home_score: game.home_score.unwrap_or(0),
                        away_score: game.away_score.unwrap_or(0),
                        period: game.period,
                        clock: game.clock.clone(),
                        status: "in_progress".to_string(),
                    },
                )
                .await
                .map_err(|e| IngestError::UpstreamMalformed {
                    reason: e.to_string(),
                    payload_prefix: String::new(),
                })?;
        } else if game.status == GameStatus::Final {
            self.ingest_box_score(sport, &game).await?;
            self.publisher
                .publish_final_stats(
                    sport,
                    &FinalStatsEvent {
                        external_game_id: game.external_id.clone(),
                        home_team_abbr: home_team.abbreviation,
                        away_team_abbr: away_team.abbreviation,
                        home_score: game.home_score.unwrap_or(0),
                        away_score: game.away_score.unwrap_or(0),
                        updated_at: game.updated_at,
                    },
                )
                .await
                .map_err(|e| IngestError::UpstreamMalformed {
                    reason: e.to_string(),
                    payload_prefix: String::new(),
                })?;
        }

        Ok(())
    }

    /// Fetches the per-game summary and upserts every player stat row.
    /// Unknown players/teams drop just that row and are logged, never
    /// aborting the game.
    async fn ingest_box_score(
        &self,
        sport: Sport,
        game: &crate::db::models::Game,
    ) -> Result<(), IngestError> {
        let summary = self.primary.fetch_summary(sport, &game.external_id).await?;
        let stats = primary_parser::parse_box_score(&summary);

        let mut team_totals: std::collections::HashMap<i64, TeamTotals> =
            std::collections::HashMap::new();

        for row in stats {
            let player = match self
                .resolver
                .resolve_player(sport, &row.external_player_id, &row.full_name)
                .await
            {
                Ok(p) => p,
                Err(e) => {
                    warn!(external_player_id = %row.external_player_id, error = %e, "skipping stat row");
                    continue;
                }
            };

            if let Some(external_team_id) = &row.external_team_id {
                if let Ok(team) = self
                    .resolver
                    .resolve_team(
                        sport,
                        external_team_id,
                        row.external_team_abbreviation.as_deref(),
                    )
                    .await
                {
                    team_totals.entry(team.id).or_default().add(&row);
                }
            }

            self.db
                .player_game_stats()
                .upsert(
                    game.id,
                    player.id,
                    row.minutes_played,
                    row.points,
                    row.field_goals_made,
                    row.field_goals_attempted,
                    row.three_points_made,
                    row.three_points_attempted,
                    row.free_throws_made,
                    row.free_throws_attempted,
                    row.offensive_rebounds,
                    row.defensive_rebounds,
                    row.assists,
                    row.steals,
                    row.blocks,
                    row.turnovers,
                    row.personal_fouls,
                    row.plus_minus,
                )
                .await?;
        }

        for (team_id, totals) in team_totals {
            let is_home = team_id == game.home_team_id;
            self.db
                .team_game_stats()
                .upsert(
                    game.id,
                    team_id,
                    is_home,
                    totals.points,
                    totals.field_goals_made,
                    totals.field_goals_attempted,
                    totals.three_points_made,
                    totals.three_points_attempted,
                    totals.free_throws_made,
                    totals.free_throws_attempted,
                    totals.offensive_rebounds,
                    totals.defensive_rebounds,
                    totals.assists,
                    totals.turnovers,
                    Some(totals.estimate_possessions()),
                )
                .await?;
        }

        Ok(())
    }

    /// Fetches and processes every game on the Primary scoreboard for
    /// `date`. Used by the backfill driver, which has no Fast-source input —
    /// every game is reconciled against Primary alone. Returns the number of
    /// games successfully processed; a game that fails to process is logged
    /// and skipped rather than aborting the whole date.
    pub async fn ingest_games_for_date(
        &self,
        sport: Sport,
        date: chrono::NaiveDate,
    ) -> Result<usize, IngestError> {
        let scoreboard = self.primary.fetch_scoreboard(sport, Some(date)).await?;
        let primary_games = primary_parser::parse_scoreboard(&scoreboard);

        let mut processed = 0;
        for primary_game in &primary_games {
            match self.process_game(sport, &scoreboard, primary_game, None).await {
                Ok(()) => processed += 1,
                Err(e) => warn!(
                    external_id = %primary_game.external_id,
                    error = %e,
                    "skipping game during date backfill"
                ),
            }
        }
        Ok(processed)
    }

    /// Fetches a single game's summary directly by its external id and
    /// processes it, for `game`-type backfill jobs. `season_id` is the
    /// surrogate key already known by the caller; when absent the season is
    /// resolved the same way the live poller does.
    pub async fn ingest_game_by_id(
        &self,
        sport: Sport,
        season_id: Option<i64>,
        external_game_id: &str,
    ) -> Result<(), IngestError> {
        let summary = self.primary.fetch_summary(sport, external_game_id).await?;
        let primary_game = primary_parser::parse_game_summary_header(&summary).ok_or_else(|| {
            IngestError::UpstreamMalformed {
                reason: "summary response has no usable header block".to_string(),
                payload_prefix: summary.to_string().chars().take(200).collect(),
            }
        })?;

        let season = match season_id {
            Some(id) => self
                .db
                .seasons()
                .get_by_id(id)
                .await?
                .ok_or_else(|| IngestError::UnknownSeason(format!("no season row for id {id}")))?,
            None => {
                self.season_resolver
                    .resolve_for_date(sport, primary_game.start_date.date_naive(), None)
                    .await?
            }
        };

        self.process_game_with_season(sport, &primary_game, None, season)
            .await
    }
}

/// Team totals accumulated from the player rows of a single box score.
/// Team-level JSON isn't fetched separately; summing the already-parsed
/// player lines avoids a second pass over the summary payload.
#[derive(Default)]
struct TeamTotals {
    points: i32,
    field_goals_made: i32,
    field_goals_attempted: i32,
    three_points_made: i32,
    three_points_attempted: i32,
    free_throws_made: i32,
    free_throws_attempted: i32,
    offensive_rebounds: i32,
    defensive_rebounds: i32,
    assists: i32,
    turnovers: i32,
}

impl TeamTotals {
    fn add(&mut self, row: &crate::parsing::ParsedPlayerStats) {
        self.points += row.points;
        self.field_goals_made += row.field_goals_made;
        self.field_goals_attempted += row.field_goals_attempted;
        self.three_points_made += row.three_points_made;
        self.three_points_attempted += row.three_points_attempted;
        self.free_throws_made += row.free_throws_made;
        self.free_throws_attempted += row.free_throws_attempted;
        self.offensive_rebounds += row.offensive_rebounds;
        self.defensive_rebounds += row.defensive_rebounds;
        self.assists += row.assists;
        self.turnovers += row.turnovers;
    }

    /// Standard single-team possession estimate (no opponent rebounding
    /// split available from summed player rows alone).
    fn estimate_possessions(&self) -> i32 {
        let possessions = self.field_goals_attempted as f64 - self.offensive_rebounds as f64
            + self.turnovers as f64
            + 0.4 * self.free_throws_attempted as f64;
        possessions.round() as i32
    }
}
