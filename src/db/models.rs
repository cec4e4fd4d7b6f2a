//! Canonical data model. These are the row types returned by the
//! repositories in `db::repositories`; trigger-computed columns on the two
//! box-score tables are represented as `Option<f64>` fields that are always
//! read back from the database, never computed in Rust.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::sport::Sport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "snake_case")]
pub enum SeasonType {
    Preseason,
    Regular,
    Playoffs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
    Postponed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,
    Retired,
    FreeAgent,
    Injured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "snake_case")]
pub enum BackfillJobType {
    Season,
    DateRange,
    Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "snake_case")]
pub enum BackfillJobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Season {
    pub id: i64,
    pub sport: Sport,
    pub season_year: String,
    pub season_type: SeasonType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub sport: Sport,
    pub external_id: String,
    pub abbreviation: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub sport: Sport,
    pub external_id: String,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: String,
    pub status: PlayerStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlayerTeamHistory {
    pub id: i64,
    pub player_id: i64,
    pub team_id: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// The canonical, reconciled `Game` row. A Fast-only game that
/// never matched a Primary record is never persisted here, so this invariant
/// always holds in the database: `home_team_id != 0 && away_team_id != 0`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub sport: Sport,
    pub external_id: String,
    pub season_id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub status: GameStatus,
    pub period: Option<i32>,
    pub clock: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub attendance: Option<i32>,
    pub venue: Option<String>,
    pub game_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlayerGameStats {
    pub id: i64,
    pub game_id: i64,
    pub player_id: i64,
    pub minutes_played: f64,
    pub points: i32,
    pub field_goals_made: i32,
    pub field_goals_attempted: i32,
    pub three_points_made: i32,
    pub three_points_attempted: i32,
    pub free_throws_made: i32,
    pub free_throws_attempted: i32,
    pub offensive_rebounds: i32,
    pub defensive_rebounds: i32,
    pub total_rebounds: i32,
    pub assists: i32,
    pub steals: i32,
    pub blocks: i32,
    pub turnovers: i32,
    pub personal_fouls: i32,
    pub plus_minus: Option<i32>,
    // Trigger-derived; always read back, never computed here.
    pub field_goal_pct: Option<f64>,
    pub three_point_pct: Option<f64>,
    pub free_throw_pct: Option<f64>,
    pub true_shooting_pct: Option<f64>,
    pub effective_fg_pct: Option<f64>,
    pub game_score: Option<f64>,
    pub offensive_rating: Option<f64>,
    pub defensive_rating: Option<f64>,
    pub net_rating: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TeamGameStats {
    pub id: i64,
    pub game_id: i64,
    pub team_id: i64,
    pub is_home: bool,
    pub points: i32,
    pub field_goals_made: i32,
    pub field_goals_attempted: i32,
    pub three_points_made: i32,
    pub three_points_attempted: i32,
    pub free_throws_made: i32,
    pub free_throws_attempted: i32,
    pub offensive_rebounds: i32,
    pub defensive_rebounds: i32,
    pub assists: i32,
    pub turnovers: i32,
    pub possessions: Option<i32>,
    // Trigger-derived.
    pub field_goal_pct: Option<f64>,
    pub three_point_pct: Option<f64>,
    pub free_throw_pct: Option<f64>,
    pub free_throw_rate: Option<f64>,
    pub assist_to_turnover_ratio: Option<f64>,
    pub offensive_rating: Option<f64>,
    pub defensive_rating: Option<f64>,
    pub net_rating: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BackfillJob {
    pub job_id: uuid::Uuid,
    pub sport: Sport,
    pub job_type: BackfillJobType,
    pub season_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub game_ids: Vec<String>,
    pub dry_run: bool,
    pub status: BackfillJobStatus,
    pub progress_current: i32,
    pub progress_total: i32,
    pub status_message: Option<String>,
    pub last_error: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BackfillJobEvent {
    pub id: i64,
    pub job_id: uuid::Uuid,
    pub event_type: String,
    pub message: String,
    pub progress_current: i32,
    pub progress_total: i32,
    pub created_at: DateTime<Utc>,
}

/// A request to enqueue a backfill job.
#[derive(Debug, Clone, Default)]
pub struct BackfillRequest {
    pub sport: Option<Sport>,
    pub season_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub game_ids: Vec<String>,
    pub dry_run: bool,
}
