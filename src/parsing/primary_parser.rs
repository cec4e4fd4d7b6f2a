//! Primary Parser (C3). Label-keyed dereferencing over `serde_json::Value`,
//! Every field is read with `filter_map`/`and_then` chains so one malformed
//! event is skipped with a warning instead of aborting the whole batch.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::db::models::GameStatus;

use super::{ParsedCompetitor, ParsedGame, ParsedPlayerStats};

const RECOGNIZED_LABELS: &[&str] = &[
    "MIN", "PTS", "OREB", "DREB", "REB", "AST", "STL", "BLK", "TO", "FG", "3PT", "FT", "PF", "+/-",
];

/// Parses `events[]` out of a Primary scoreboard response.
pub fn parse_scoreboard(raw: &Value) -> Vec<ParsedGame> {
    let Some(events) = raw["events"].as_array() else {
        return vec![];
    };

    events
        .iter()
        .filter_map(|ev| match parse_event(ev) {
            Ok(game) => Some(game),
            Err(reason) => {
                warn!(reason, "skipping unparseable scoreboard event");
                None
            }
        })
        .collect()
}

pub(crate) fn parse_event(ev: &Value) -> Result<ParsedGame, String> {
    let external_id = ev["id"]
        .as_str()
        .ok_or("missing event id")?
        .to_string();

    let start_date = parse_timestamp(ev["date"].as_str().unwrap_or_default())
        .ok_or("unparseable start date")?;

    let competitions = ev["competitions"][0].clone();
    let competitors = competitions["competitors"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    if competitors.len() < 2 {
        return Err(format!("event {external_id} has fewer than two competitors"));
    }

    let mut home = None;
    let mut away = None;
    for c in &competitors {
        let is_home = c["homeAway"].as_str() == Some("home");
        let competitor = ParsedCompetitor {
            external_team_id: c["team"]["id"].as_str().unwrap_or_default().to_string(),
            abbreviation: c["team"]["abbreviation"].as_str().map(|s| s.to_string()),
            is_home,
            score: c["score"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .or_else(|| c["score"].as_i64().map(|v| v as i32)),
        };
        if is_home {
            if home.is_some() {
                return Err(format!("event {external_id} has duplicate home competitors"));
            }
            home = Some(competitor);
        } else {
            if away.is_some() {
                return Err(format!("event {external_id} has duplicate away competitors"));
            }
            away = Some(competitor);
        }
    }

    let (Some(home), Some(away)) = (home, away) else {
        return Err(format!("event {external_id} missing a home or away competitor"));
    };

    let status_type = &competitions["status"]["type"];
    let status = map_status(
        status_type["state"].as_str().unwrap_or("pre"),
        status_type["completed"].as_bool().unwrap_or(false),
    );

    let season_type_id = ev["season"]["type"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| ev["season"]["type"]["id"].as_i64().map(|v| v as i32));

    Ok(ParsedGame {
        external_id,
        start_date,
        status,
        period: competitions["status"]["period"].as_i64().map(|v| v as i32),
        clock: competitions["status"]["displayClock"]
            .as_str()
            .map(|s| s.to_string()),
        venue: competitions["venue"]["fullName"].as_str().map(|s| s.to_string()),
        attendance: competitions["attendance"].as_i64().map(|v| v as i32),
        home,
        away,
        season_year: ev["season"]["year"]
            .as_i64()
            .map(|y| y.to_string())
            .or_else(|| ev["season"]["year"].as_str().map(|s| s.to_string())),
        season_type_id,
    })
}

/// Maps Primary's raw status to the canonical `GameStatus` state machine
///: `pre -> scheduled, in -> in_progress, post -> final`,
/// `completed=true` always wins regardless of `state`.
fn map_status(state: &str, completed: bool) -> GameStatus {
    if completed {
        return GameStatus::Final;
    }
    match state {
        "pre" => GameStatus::Scheduled,
        "in" => GameStatus::InProgress,
        "post" => GameStatus::Final,
        _ => GameStatus::Scheduled,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
                .ok()
                .map(|n| DateTime::from_naive_utc_and_offset(n, Utc))
        })
}

/// Parses a per-game summary's `header` block into the same shape as a
/// scoreboard event, for backfill paths that only have a game id and no
/// scoreboard listing to draw the event from.
pub fn parse_game_summary_header(raw: &Value) -> Option<ParsedGame> {
    let header = &raw["header"];
    if header.is_null() {
        return None;
    }
    let mut ev = header.clone();
    if ev["date"].is_null() {
        if let Some(date) = header["competitions"][0]["date"].as_str() {
            ev["date"] = Value::String(date.to_string());
        }
    }
    parse_event(&ev).ok()
}

/// Parses a per-event summary's box score. Looks for
/// `boxscore.players[]`, falling back to `boxscore.teams[]`.
pub fn parse_box_score(raw: &Value) -> Vec<ParsedPlayerStats> {
    let groups = raw["boxscore"]["players"]
        .as_array()
        .or_else(|| raw["boxscore"]["teams"].as_array())
        .cloned()
        .unwrap_or_default();

    let mut out = Vec::new();
    for group in groups {
        let Some(label_index) = build_label_index(&group) else {
            warn!("skipping box-score group with no stat labels");
            continue;
        };
        let external_team_id = group["team"]["id"].as_str().map(|s| s.to_string());
        let external_team_abbreviation = group["team"]["abbreviation"]
            .as_str()
            .map(|s| s.to_string());

        let athletes = group["statistics"][0]["athletes"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        for athlete in athletes {
            if athlete["didNotPlay"].as_bool().unwrap_or(false) {
                continue;
            }
            match parse_athlete_stats(&athlete, &label_index) {
                Ok(mut stats) => {
                    stats.external_team_id = external_team_id.clone();
                    stats.external_team_abbreviation = external_team_abbreviation.clone();
                    out.push(stats)
                }
                Err(reason) => warn!(reason, "skipping unparseable athlete stat row"),
            }
        }
    }
    out
}

fn build_label_index(group: &Value) -> Option<Vec<String>> {
    group["statistics"][0]["names"].as_array().map(|names| {
        names
            .iter()
            .map(|n| n.as_str().unwrap_or_default().to_string())
            .collect()
    })
}

fn parse_athlete_stats(athlete: &Value, labels: &[String]) -> Result<ParsedPlayerStats, String> {
    let external_player_id = athlete["athlete"]["id"]
        .as_str()
        .ok_or("missing athlete id")?
        .to_string();
    let full_name = athlete["athlete"]["displayName"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let values = athlete["stats"].as_array().cloned().unwrap_or_default();
    let mut by_label = std::collections::HashMap::new();
    for (label, value) in labels.iter().zip(values.iter()) {
        if RECOGNIZED_LABELS.contains(&label.as_str()) {
            by_label.insert(label.as_str(), value.as_str().unwrap_or_default());
        }
    }

    let (fgm, fga) = split_made_attempted(by_label.get("FG").copied().unwrap_or("0-0"));
    let (tpm, tpa) = split_made_attempted(by_label.get("3PT").copied().unwrap_or("0-0"));
    let (ftm, fta) = split_made_attempted(by_label.get("FT").copied().unwrap_or("0-0"));

    Ok(ParsedPlayerStats {
        external_team_id: None,
        external_team_abbreviation: None,
        external_player_id,
        full_name,
        minutes_played: parse_minutes(by_label.get("MIN").copied().unwrap_or("0")),
        points: parse_i32(by_label.get("PTS").copied().unwrap_or("0")),
        offensive_rebounds: parse_i32(by_label.get("OREB").copied().unwrap_or("0")),
        defensive_rebounds: parse_i32(by_label.get("DREB").copied().unwrap_or("0")),
        total_rebounds: parse_i32(by_label.get("REB").copied().unwrap_or("0")),
        assists: parse_i32(by_label.get("AST").copied().unwrap_or("0")),
        steals: parse_i32(by_label.get("STL").copied().unwrap_or("0")),
        blocks: parse_i32(by_label.get("BLK").copied().unwrap_or("0")),
        turnovers: parse_i32(by_label.get("TO").copied().unwrap_or("0")),
        personal_fouls: parse_i32(by_label.get("PF").copied().unwrap_or("0")),
        field_goals_made: fgm,
        field_goals_attempted: fga,
        three_points_made: tpm,
        three_points_attempted: tpa,
        free_throws_made: ftm,
        free_throws_attempted: fta,
        plus_minus: by_label
            .get("+/-")
            .and_then(|v| v.trim_start_matches('+').parse().ok()),
    })
}

fn split_made_attempted(raw: &str) -> (i32, i32) {
    let mut parts = raw.split('-');
    let made = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let attempted = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (made, attempted)
}

fn parse_i32(raw: &str) -> i32 {
    raw.parse().unwrap_or(0)
}

/// `MIN` accepts both `"mm:ss"` and fractional-minute strings.
fn parse_minutes(raw: &str) -> f64 {
    if let Some((m, s)) = raw.split_once(':') {
        let m: f64 = m.parse().unwrap_or(0.0);
        let s: f64 = s.parse().unwrap_or(0.0);
        m + s / 60.0
    } else {
        raw.parse().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mm_ss_minutes() {
        assert!((parse_minutes("34:30") - 34.5).abs() < 1e-9);
    }

    #[test]
    fn parses_fractional_minutes() {
        assert!((parse_minutes("34.5") - 34.5).abs() < 1e-9);
    }

    #[test]
    fn splits_made_attempted() {
        assert_eq!(split_made_attempted("10-20"), (10, 20));
    }

    #[test]
    fn maps_completed_status_regardless_of_state() {
        assert_eq!(map_status("in", true), GameStatus::Final);
        assert_eq!(map_status("pre", false), GameStatus::Scheduled);
        assert_eq!(map_status("in", false), GameStatus::InProgress);
    }

    #[test]
    fn scoreboard_skips_events_with_one_competitor() {
        let raw = serde_json::json!({
            "events": [{
                "id": "401",
                "date": "2024-01-01T00:00Z",
                "competitions": [{ "competitors": [{"homeAway": "home", "team": {"id": "1"}}] }]
            }]
        });
        assert!(parse_scoreboard(&raw).is_empty());
    }
}
