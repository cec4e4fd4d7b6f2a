//! Typed repositories. One struct per entity, each holding a
//! borrowed `&PgPool`; every write path is an `INSERT ... ON CONFLICT ...
//! RETURNING *` so the caller always gets back the row with its
//! trigger-computed columns populated, matching the `upsert_market` idiom
//! the sqlx-based market database in the pack uses for the same reason.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPool;

use crate::error::IngestError;
use crate::sport::Sport;

use super::models::{
    BackfillJob, BackfillJobEvent, BackfillJobStatus, BackfillJobType, BackfillRequest, Game,
    GameStatus, Player, PlayerGameStats, PlayerStatus, PlayerTeamHistory, Season, SeasonType,
    Team, TeamGameStats,
};

pub struct SeasonRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SeasonRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Season>, IngestError> {
        let row = sqlx::query_as::<_, Season>("SELECT * FROM seasons WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Finds the season whose `[start_date, end_date]` window contains `date`
    /// (step 1 of the season resolver's fallback chain).
    pub async fn find_covering_date(
        &self,
        sport: Sport,
        date: NaiveDate,
    ) -> Result<Option<Season>, IngestError> {
        let row = sqlx::query_as::<_, Season>(
            "SELECT * FROM seasons WHERE sport = $1 AND $2 BETWEEN start_date AND end_date \
             ORDER BY start_date DESC LIMIT 1",
        )
        .bind(sport)
        .bind(date)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_year_and_type(
        &self,
        sport: Sport,
        season_year: &str,
        season_type: SeasonType,
    ) -> Result<Option<Season>, IngestError> {
        let row = sqlx::query_as::<_, Season>(
            "SELECT * FROM seasons WHERE sport = $1 AND season_year = $2 AND season_type = $3",
        )
        .bind(sport)
        .bind(season_year)
        .bind(season_type)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// The most recently started season for a sport, regardless of whether
    /// `date` falls inside it — the resolver's off-season fallback.
    pub async fn find_most_recent(&self, sport: Sport) -> Result<Option<Season>, IngestError> {
        let row = sqlx::query_as::<_, Season>(
            "SELECT * FROM seasons WHERE sport = $1 ORDER BY start_date DESC LIMIT 1",
        )
        .bind(sport)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// The season with the earliest `start_date` still in the future
    /// relative to `date` — the resolver's pre-season fallback.
    pub async fn find_earliest_future(
        &self,
        sport: Sport,
        date: NaiveDate,
    ) -> Result<Option<Season>, IngestError> {
        let row = sqlx::query_as::<_, Season>(
            "SELECT * FROM seasons WHERE sport = $1 AND start_date > $2 \
             ORDER BY start_date ASC LIMIT 1",
        )
        .bind(sport)
        .bind(date)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn upsert(
        &self,
        sport: Sport,
        season_year: &str,
        season_type: SeasonType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Season, IngestError> {
        let row = sqlx::query_as::<_, Season>(
            "INSERT INTO seasons (sport, season_year, season_type, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (sport, season_year, season_type) DO UPDATE SET \
                start_date = excluded.start_date, end_date = excluded.end_date \
             RETURNING *",
        )
        .bind(sport)
        .bind(season_year)
        .bind(season_type)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }
}

pub struct TeamRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TeamRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_external_id(
        &self,
        sport: Sport,
        external_id: &str,
    ) -> Result<Option<Team>, IngestError> {
        let row = sqlx::query_as::<_, Team>(
            "SELECT * FROM teams WHERE sport = $1 AND external_id = $2",
        )
        .bind(sport)
        .bind(external_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_by_abbreviation(
        &self,
        sport: Sport,
        abbreviation: &str,
    ) -> Result<Option<Team>, IngestError> {
        let row = sqlx::query_as::<_, Team>(
            "SELECT * FROM teams WHERE sport = $1 AND abbreviation = $2",
        )
        .bind(sport)
        .bind(abbreviation.to_uppercase())
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_all(&self, sport: Sport) -> Result<Vec<Team>, IngestError> {
        let rows = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE sport = $1 ORDER BY name")
            .bind(sport)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn upsert(
        &self,
        sport: Sport,
        external_id: &str,
        abbreviation: &str,
        name: &str,
    ) -> Result<Team, IngestError> {
        let row = sqlx::query_as::<_, Team>(
            "INSERT INTO teams (sport, external_id, abbreviation, name) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (sport, external_id) DO UPDATE SET \
                abbreviation = excluded.abbreviation, name = excluded.name \
             RETURNING *",
        )
        .bind(sport)
        .bind(external_id)
        .bind(abbreviation.to_uppercase())
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }
}

pub struct PlayerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PlayerRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_external_id(
        &self,
        sport: Sport,
        external_id: &str,
    ) -> Result<Option<Player>, IngestError> {
        let row = sqlx::query_as::<_, Player>(
            "SELECT * FROM players WHERE sport = $1 AND external_id = $2",
        )
        .bind(sport)
        .bind(external_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Fallback lookup by exact full-name match, used when the Fast source
    /// gives a name instead of an external id.
    pub async fn find_by_full_name(
        &self,
        sport: Sport,
        full_name: &str,
    ) -> Result<Option<Player>, IngestError> {
        let row = sqlx::query_as::<_, Player>(
            "SELECT * FROM players WHERE sport = $1 AND full_name = $2",
        )
        .bind(sport)
        .bind(full_name)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn upsert(
        &self,
        sport: Sport,
        external_id: &str,
        full_name: &str,
        first_name: Option<&str>,
        last_name: &str,
        status: PlayerStatus,
    ) -> Result<Player, IngestError> {
        let row = sqlx::query_as::<_, Player>(
            "INSERT INTO players (sport, external_id, full_name, first_name, last_name, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (sport, external_id) DO UPDATE SET \
                full_name = excluded.full_name, first_name = excluded.first_name, \
                last_name = excluded.last_name, status = excluded.status \
             RETURNING *",
        )
        .bind(sport)
        .bind(external_id)
        .bind(full_name)
        .bind(first_name)
        .bind(last_name)
        .bind(status)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn record_team_history(
        &self,
        player_id: i64,
        team_id: i64,
        start_date: NaiveDate,
    ) -> Result<PlayerTeamHistory, IngestError> {
        let row = sqlx::query_as::<_, PlayerTeamHistory>(
            "INSERT INTO player_team_history (player_id, team_id, start_date) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (player_id, team_id, start_date) DO UPDATE SET start_date = excluded.start_date \
             RETURNING *",
        )
        .bind(player_id)
        .bind(team_id)
        .bind(start_date)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }
}

pub struct GameRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GameRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Game>, IngestError> {
        let row = sqlx::query_as::<_, Game>("SELECT * FROM games WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_by_external_id(
        &self,
        sport: Sport,
        external_id: &str,
    ) -> Result<Option<Game>, IngestError> {
        let row = sqlx::query_as::<_, Game>(
            "SELECT * FROM games WHERE sport = $1 AND external_id = $2",
        )
        .bind(sport)
        .bind(external_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_live(&self, sport: Sport) -> Result<Vec<Game>, IngestError> {
        let rows = sqlx::query_as::<_, Game>(
            "SELECT * FROM games WHERE sport = $1 AND status = $2 ORDER BY game_date",
        )
        .bind(sport)
        .bind(GameStatus::InProgress)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_date(
        &self,
        sport: Sport,
        date: NaiveDate,
    ) -> Result<Vec<Game>, IngestError> {
        let rows = sqlx::query_as::<_, Game>(
            "SELECT * FROM games WHERE sport = $1 AND game_date::date = $2 ORDER BY game_date",
        )
        .bind(sport)
        .bind(date)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_upcoming(&self, sport: Sport, limit: i64) -> Result<Vec<Game>, IngestError> {
        let rows = sqlx::query_as::<_, Game>(
            "SELECT * FROM games WHERE sport = $1 AND status = $2 AND game_date > now() \
             ORDER BY game_date LIMIT $3",
        )
        .bind(sport)
        .bind(GameStatus::Scheduled)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_team(
        &self,
        team_id: i64,
        season_id: i64,
        limit: i64,
    ) -> Result<Vec<Game>, IngestError> {
        let rows = sqlx::query_as::<_, Game>(
            "SELECT * FROM games WHERE (home_team_id = $1 OR away_team_id = $1) AND season_id = $2 \
             ORDER BY game_date DESC LIMIT $3",
        )
        .bind(team_id)
        .bind(season_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Upserts the reconciled game row. `home_team_id`/`away_team_id` must
    /// already resolve to real team rows — an unmatched Fast-only game is
    /// never passed here.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        sport: Sport,
        external_id: &str,
        season_id: i64,
        home_team_id: i64,
        away_team_id: i64,
        status: GameStatus,
        period: Option<i32>,
        clock: Option<&str>,
        home_score: Option<i32>,
        away_score: Option<i32>,
        attendance: Option<i32>,
        venue: Option<&str>,
        game_date: DateTime<Utc>,
    ) -> Result<Game, IngestError> {
        let row = sqlx::query_as::<_, Game>(
            "INSERT INTO games (sport, external_id, season_id, home_team_id, away_team_id, \
                status, period, clock, home_score, away_score, attendance, venue, game_date) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13) \
             ON CONFLICT (sport, external_id) DO UPDATE SET \
                season_id = excluded.season_id, \
                home_team_id = excluded.home_team_id, \
                away_team_id = excluded.away_team_id, \
                status = excluded.status, \
                period = excluded.period, \
                clock = excluded.clock, \
                home_score = excluded.home_score, \
                away_score = excluded.away_score, \
                attendance = excluded.attendance, \
                venue = excluded.venue, \
                game_date = excluded.game_date \
             RETURNING *",
        )
        .bind(sport)
        .bind(external_id)
        .bind(season_id)
        .bind(home_team_id)
        .bind(away_team_id)
        .bind(status)
        .bind(period)
        .bind(clock)
        .bind(home_score)
        .bind(away_score)
        .bind(attendance)
        .bind(venue)
        .bind(game_date)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Marks games stuck `in_progress` for longer than `stale_after` as
    /// `final` so the live poller's working set doesn't grow without bound
    ///.
    pub async fn cleanup_stale_games(
        &self,
        sport: Sport,
        stale_after: chrono::Duration,
    ) -> Result<u64, IngestError> {
        let cutoff = Utc::now() - stale_after;
        let result = sqlx::query(
            "UPDATE games SET status = $1 WHERE sport = $2 AND status = $3 AND updated_at < $4",
        )
        .bind(GameStatus::Final)
        .bind(sport)
        .bind(GameStatus::InProgress)
        .bind(cutoff)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

pub struct PlayerGameStatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PlayerGameStatsRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_for_game(&self, game_id: i64) -> Result<Vec<PlayerGameStats>, IngestError> {
        let rows = sqlx::query_as::<_, PlayerGameStats>(
            "SELECT * FROM player_game_stats WHERE game_id = $1 ORDER BY points DESC",
        )
        .bind(game_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Upserts raw box-score counts; the derived percentage/rating columns
    /// are filled in by `derive_player_game_stats` and always
    /// come back populated in the returned row.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        game_id: i64,
        player_id: i64,
        minutes_played: f64,
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
        steals: i32,
        blocks: i32,
        turnovers: i32,
        personal_fouls: i32,
        plus_minus: Option<i32>,
    ) -> Result<PlayerGameStats, IngestError> {
        let total_rebounds = offensive_rebounds + defensive_rebounds;
        let row = sqlx::query_as::<_, PlayerGameStats>(
            "INSERT INTO player_game_stats ( \
                game_id, player_id, minutes_played, points, \
                field_goals_made, field_goals_attempted, \
                three_points_made, three_points_attempted, \
                free_throws_made, free_throws_attempted, \
                offensive_rebounds, defensive_rebounds, total_rebounds, \
                assists, steals, blocks, turnovers, personal_fouls, plus_minus \
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19) \
             ON CONFLICT (game_id, player_id) DO UPDATE SET \
                minutes_played = excluded.minutes_played, \
                points = excluded.points, \
                field_goals_made = excluded.field_goals_made, \
                field_goals_attempted = excluded.field_goals_attempted, \
                three_points_made = excluded.three_points_made, \
                three_points_attempted = excluded.three_points_attempted, \
                free_throws_made = excluded.free_throws_made, \
                free_throws_attempted = excluded.free_throws_attempted, \
                offensive_rebounds = excluded.offensive_rebounds, \
                defensive_rebounds = excluded.defensive_rebounds, \
                total_rebounds = excluded.total_rebounds, \
                assists = excluded.assists, \
                steals = excluded.steals, \
                blocks = excluded.blocks, \
                turnovers = excluded.turnovers, \
                personal_fouls = excluded.personal_fouls, \
                plus_minus = excluded.plus_minus \
             RETURNING *",
        )
        .bind(game_id)
        .bind(player_id)
        .bind(minutes_played)
        .bind(points)
        .bind(field_goals_made)
        .bind(field_goals_attempted)
        .bind(three_points_made)
        .bind(three_points_attempted)
        .bind(free_throws_made)
        .bind(free_throws_attempted)
        .bind(offensive_rebounds)
        .bind(defensive_rebounds)
        .bind(total_rebounds)
        .bind(assists)
        .bind(steals)
        .bind(blocks)
        .bind(turnovers)
        .bind(personal_fouls)
        .bind(plus_minus)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }
}

pub struct TeamGameStatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TeamGameStatsRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_for_game(&self, game_id: i64) -> Result<Vec<TeamGameStats>, IngestError> {
        let rows = sqlx::query_as::<_, TeamGameStats>(
            "SELECT * FROM team_game_stats WHERE game_id = $1 ORDER BY is_home DESC",
        )
        .bind(game_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        game_id: i64,
        team_id: i64,
        is_home: bool,
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
        possessions: Option<i32>,
    ) -> Result<TeamGameStats, IngestError> {
        let row = sqlx::query_as::<_, TeamGameStats>(
            "INSERT INTO team_game_stats ( \
                game_id, team_id, is_home, points, \
                field_goals_made, field_goals_attempted, \
                three_points_made, three_points_attempted, \
                free_throws_made, free_throws_attempted, \
                offensive_rebounds, defensive_rebounds, assists, turnovers, possessions \
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15) \
             ON CONFLICT (game_id, team_id) DO UPDATE SET \
                is_home = excluded.is_home, \
                points = excluded.points, \
                field_goals_made = excluded.field_goals_made, \
                field_goals_attempted = excluded.field_goals_attempted, \
                three_points_made = excluded.three_points_made, \
                three_points_attempted = excluded.three_points_attempted, \
                free_throws_made = excluded.free_throws_made, \
                free_throws_attempted = excluded.free_throws_attempted, \
                offensive_rebounds = excluded.offensive_rebounds, \
                defensive_rebounds = excluded.defensive_rebounds, \
                assists = excluded.assists, \
                turnovers = excluded.turnovers, \
                possessions = excluded.possessions \
             RETURNING *",
        )
        .bind(game_id)
        .bind(team_id)
        .bind(is_home)
        .bind(points)
        .bind(field_goals_made)
        .bind(field_goals_attempted)
        .bind(three_points_made)
        .bind(three_points_attempted)
        .bind(free_throws_made)
        .bind(free_throws_attempted)
        .bind(offensive_rebounds)
        .bind(defensive_rebounds)
        .bind(assists)
        .bind(turnovers)
        .bind(possessions)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }
}

pub struct BackfillJobRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BackfillJobRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// `progress_total` is pre-computed by the caller: game count for a
    /// `game` job, day count for `season`/`date_range`.
    pub async fn enqueue(
        &self,
        sport: Sport,
        request: &BackfillRequest,
        progress_total: i32,
    ) -> Result<BackfillJob, IngestError> {
        let job_type = if !request.game_ids.is_empty() {
            BackfillJobType::Game
        } else if request.start_date.is_some() || request.end_date.is_some() {
            BackfillJobType::DateRange
        } else if request.season_id.is_some() {
            BackfillJobType::Season
        } else {
            return Err(IngestError::Underspecified);
        };

        let job_id = uuid::Uuid::new_v4();
        let row = sqlx::query_as::<_, BackfillJob>(
            "INSERT INTO backfill_jobs \
                (job_id, sport, job_type, season_id, start_date, end_date, game_ids, dry_run, progress_total) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9) \
             RETURNING *",
        )
        .bind(job_id)
        .bind(sport)
        .bind(job_type)
        .bind(request.season_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.game_ids)
        .bind(request.dry_run)
        .bind(progress_total)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get(&self, job_id: uuid::Uuid) -> Result<Option<BackfillJob>, IngestError> {
        let row = sqlx::query_as::<_, BackfillJob>("SELECT * FROM backfill_jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<BackfillJob>, IngestError> {
        let rows = sqlx::query_as::<_, BackfillJob>(
            "SELECT * FROM backfill_jobs ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Claims the oldest queued job for exclusive processing. `FOR UPDATE
    /// SKIP LOCKED` lets multiple worker instances race the queue safely and
    /// is what makes crash recovery free: a worker that dies mid-job simply
    /// leaves the row `running`, and `reap_stuck_jobs` requeues it later.
    pub async fn claim_next(&self) -> Result<Option<BackfillJob>, IngestError> {
        let mut tx = self.pool.begin().await?;
        let claimed = sqlx::query_as::<_, BackfillJob>(
            "SELECT * FROM backfill_jobs WHERE status = $1 \
             ORDER BY created_at LIMIT 1 FOR UPDATE SKIP LOCKED",
        )
        .bind(BackfillJobStatus::Queued)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = claimed else {
            tx.commit().await?;
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, BackfillJob>(
            "UPDATE backfill_jobs SET status = $1 WHERE job_id = $2 RETURNING *",
        )
        .bind(BackfillJobStatus::Running)
        .bind(job.job_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    pub async fn update_progress(
        &self,
        job_id: uuid::Uuid,
        current: i32,
        total: i32,
        message: &str,
    ) -> Result<(), IngestError> {
        sqlx::query(
            "UPDATE backfill_jobs SET progress_current = $1, progress_total = $2, \
             status_message = $3 WHERE job_id = $4",
        )
        .bind(current)
        .bind(total)
        .bind(message)
        .bind(job_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_completed(&self, job_id: uuid::Uuid) -> Result<(), IngestError> {
        sqlx::query(
            "UPDATE backfill_jobs SET status = $1, completed_at = now() WHERE job_id = $2",
        )
        .bind(BackfillJobStatus::Completed)
        .bind(job_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, job_id: uuid::Uuid, error: &str) -> Result<(), IngestError> {
        sqlx::query(
            "UPDATE backfill_jobs SET status = $1, last_error = $2, \
             retry_count = retry_count + 1, completed_at = now() WHERE job_id = $3",
        )
        .bind(BackfillJobStatus::Failed)
        .bind(error)
        .bind(job_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Terminal state for a job that observed shutdown mid-iteration, as
    /// opposed to `mark_failed`'s error-triggered terminal state.
    pub async fn mark_cancelled(&self, job_id: uuid::Uuid) -> Result<(), IngestError> {
        sqlx::query(
            "UPDATE backfill_jobs SET status = $1, completed_at = now() WHERE job_id = $2",
        )
        .bind(BackfillJobStatus::Cancelled)
        .bind(job_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn requeue(&self, job_id: uuid::Uuid) -> Result<(), IngestError> {
        sqlx::query("UPDATE backfill_jobs SET status = $1 WHERE job_id = $2")
            .bind(BackfillJobStatus::Queued)
            .bind(job_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Resets every `running` row to `queued` at service startup — a prior
    /// process died mid-job and left these rows orphaned.
    pub async fn reset_running_jobs_on_startup(&self) -> Result<u64, IngestError> {
        let result = sqlx::query(
            "UPDATE backfill_jobs SET status = $1, status_message = $2 WHERE status = $3",
        )
        .bind(BackfillJobStatus::Queued)
        .bind("Reset after service restart")
        .bind(BackfillJobStatus::Running)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Requeues jobs left `running` past `stale_after` — the crash-recovery
    /// half of the worker loop.
    pub async fn reap_stuck_jobs(
        &self,
        stale_after: chrono::Duration,
    ) -> Result<u64, IngestError> {
        let cutoff = Utc::now() - stale_after;
        let result = sqlx::query(
            "UPDATE backfill_jobs SET status = $1 \
             WHERE status = $2 AND created_at < $3",
        )
        .bind(BackfillJobStatus::Queued)
        .bind(BackfillJobStatus::Running)
        .bind(cutoff)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn record_event(
        &self,
        job_id: uuid::Uuid,
        event_type: &str,
        message: &str,
        progress_current: i32,
        progress_total: i32,
    ) -> Result<BackfillJobEvent, IngestError> {
        let row = sqlx::query_as::<_, BackfillJobEvent>(
            "INSERT INTO backfill_job_events \
                (job_id, event_type, message, progress_current, progress_total) \
             VALUES ($1,$2,$3,$4,$5) RETURNING *",
        )
        .bind(job_id)
        .bind(event_type)
        .bind(message)
        .bind(progress_current)
        .bind(progress_total)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }
}
