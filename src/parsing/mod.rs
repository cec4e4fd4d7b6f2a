//! Parsers (C3, C4). Both operate on already-fetched payloads (JSON for
//! Primary, HTML for Fast) and never make network calls themselves, mirroring
//! the split between `TheSportsDB::fetch_live_games` and the free function
//! `parse_livescore_response` it delegates to.

pub mod fast_parser;
pub mod primary_parser;

use chrono::{DateTime, NaiveDate, Utc};

use crate::db::models::GameStatus;

/// One competitor + score extracted from a Primary scoreboard event.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCompetitor {
    pub external_team_id: String,
    pub abbreviation: Option<String>,
    pub is_home: bool,
    pub score: Option<i32>,
}

/// A single game as parsed from the Primary scoreboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGame {
    pub external_id: String,
    pub start_date: DateTime<Utc>,
    pub status: GameStatus,
    pub period: Option<i32>,
    pub clock: Option<String>,
    pub venue: Option<String>,
    pub attendance: Option<i32>,
    pub home: ParsedCompetitor,
    pub away: ParsedCompetitor,
    pub season_year: Option<String>,
    pub season_type_id: Option<i32>,
}

/// A single player's box-score line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPlayerStats {
    pub external_team_id: Option<String>,
    pub external_team_abbreviation: Option<String>,
    pub external_player_id: String,
    pub full_name: String,
    pub minutes_played: f64,
    pub points: i32,
    pub offensive_rebounds: i32,
    pub defensive_rebounds: i32,
    pub total_rebounds: i32,
    pub assists: i32,
    pub steals: i32,
    pub blocks: i32,
    pub turnovers: i32,
    pub personal_fouls: i32,
    pub field_goals_made: i32,
    pub field_goals_attempted: i32,
    pub three_points_made: i32,
    pub three_points_attempted: i32,
    pub free_throws_made: i32,
    pub free_throws_attempted: i32,
    pub plus_minus: Option<i32>,
}

/// A compact live-game view scraped from the Fast HTML page.
#[derive(Debug, Clone, PartialEq)]
pub struct FastGame {
    pub home_team: String,
    pub away_team: String,
    pub home_abbr: Option<String>,
    pub away_abbr: Option<String>,
    pub home_score: i32,
    pub away_score: i32,
    pub home_record: Option<String>,
    pub away_record: Option<String>,
    pub home_logo_url: Option<String>,
    pub away_logo_url: Option<String>,
    pub period: Option<i32>,
    pub clock: Option<String>,
    pub is_live: bool,
    pub is_final: bool,
    pub is_scheduled: bool,
}

pub(crate) fn team_record_to_w_l(raw: &str) -> Option<String> {
    // "(10 - 4)" -> "10-4"
    let trimmed = raw.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace());
    let parts: Vec<&str> = trimmed.split('-').map(|p| p.trim()).collect();
    if parts.len() == 2 && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        Some(format!("{}-{}", parts[0], parts[1]))
    } else {
        None
    }
}

pub(crate) fn normalize_logo_url(raw: &str) -> String {
    if let Some(stripped) = raw.strip_prefix("//") {
        format!("https://{stripped}")
    } else {
        raw.to_string()
    }
}

#[allow(dead_code)]
pub(crate) fn naive_date_from_any(s: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.naive_utc().date())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%dT%H:%MZ").ok())
}
