//! Reconciliation Engine (C7). Merges a Primary game with an optional Fast
//! game into one canonical record under a chosen strategy, and pairs the two
//! sources' game lists ahead of time via `Matcher`.

mod matcher;
mod metrics;

pub use matcher::Matcher;
pub use metrics::ReconciliationMetrics;

use crate::db::models::GameStatus;
use crate::error::IngestError;
use crate::parsing::{FastGame, ParsedGame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationStrategy {
    PreferAuthoritative,
    PreferLatest,
    SmartMerge,
}

impl Default for ReconciliationStrategy {
    fn default() -> Self {
        ReconciliationStrategy::SmartMerge
    }
}

/// Canonical live fields after reconciliation — everything else (identity,
/// season, teams, venue) is carried from the Primary record unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledLiveFields {
    pub status: GameStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub period: Option<i32>,
    pub clock: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameState {
    PreGame,
    Live,
    Final,
    Conflict,
}

/// Whichever source's live fields won, for the metrics counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preferred {
    Primary,
    Fast,
}

pub struct ReconciliationOutcome {
    pub fields: ReconciledLiveFields,
    pub preferred: Preferred,
    pub conflict: bool,
}

/// Reconciles one game. `primary` and `fast` may each be absent, but not
/// both (`ErrBothSourcesNil`) — the caller is expected to have already
/// dropped any Fast-only game that didn't match a Primary record.
pub fn reconcile(
    primary: Option<&ParsedGame>,
    fast: Option<&FastGame>,
    strategy: ReconciliationStrategy,
) -> Result<ReconciliationOutcome, IngestError> {
    let (Some(primary), fast) = (primary, fast) else {
        return Err(IngestError::ErrBothSourcesNil);
    };

    match strategy {
        ReconciliationStrategy::PreferAuthoritative => Ok(ReconciliationOutcome {
            fields: primary_fields(primary),
            preferred: Preferred::Primary,
            conflict: false,
        }),
        ReconciliationStrategy::PreferLatest => match fast {
            Some(fast) => Ok(ReconciliationOutcome {
                fields: fast_onto_primary(primary, fast),
                preferred: Preferred::Fast,
                conflict: false,
            }),
            None => Ok(ReconciliationOutcome {
                fields: primary_fields(primary),
                preferred: Preferred::Primary,
                conflict: false,
            }),
        },
        ReconciliationStrategy::SmartMerge => smart_merge(primary, fast),
    }
}

fn smart_merge(
    primary: &ParsedGame,
    fast: Option<&FastGame>,
) -> Result<ReconciliationOutcome, IngestError> {
    let Some(fast) = fast else {
        return Ok(ReconciliationOutcome {
            fields: primary_fields(primary),
            preferred: Preferred::Primary,
            conflict: false,
        });
    };

    if is_conflicting(primary, fast) {
        return Ok(ReconciliationOutcome {
            fields: primary_fields(primary),
            preferred: Preferred::Primary,
            conflict: true,
        });
    }

    match derive_state(primary) {
        GameState::PreGame | GameState::Final | GameState::Conflict => Ok(ReconciliationOutcome {
            fields: primary_fields(primary),
            preferred: Preferred::Primary,
            conflict: false,
        }),
        GameState::Live => Ok(ReconciliationOutcome {
            fields: fast_onto_primary(primary, fast),
            preferred: Preferred::Fast,
            conflict: false,
        }),
    }
}

/// A conflict is (a) either score differs by more than 20 between sources,
/// or (b) one source reports `final` while the other reports live.
fn is_conflicting(primary: &ParsedGame, fast: &FastGame) -> bool {
    let home_delta = (primary.home.score.unwrap_or(0) - fast.home_score).abs();
    let away_delta = (primary.away.score.unwrap_or(0) - fast.away_score).abs();
    if home_delta > 20 || away_delta > 20 {
        return true;
    }
    let primary_final = primary.status == GameStatus::Final;
    (primary_final && fast.is_live) || (!primary_final && fast.is_final)
}

fn derive_state(primary: &ParsedGame) -> GameState {
    match primary.status {
        GameStatus::Scheduled => GameState::PreGame,
        GameStatus::InProgress => GameState::Live,
        GameStatus::Final => GameState::Final,
        GameStatus::Postponed | GameStatus::Cancelled => GameState::PreGame,
    }
}

fn primary_fields(primary: &ParsedGame) -> ReconciledLiveFields {
    ReconciledLiveFields {
        status: primary.status,
        home_score: primary.home.score,
        away_score: primary.away.score,
        period: primary.period,
        clock: primary.clock.clone(),
    }
}

/// Overlays Fast's live fields onto Primary's identity, falling back to
/// Primary cell-wise when a Fast field is absent.
fn fast_onto_primary(primary: &ParsedGame, fast: &FastGame) -> ReconciledLiveFields {
    ReconciledLiveFields {
        status: GameStatus::InProgress,
        home_score: Some(fast.home_score).or(primary.home.score),
        away_score: Some(fast.away_score).or(primary.away.score),
        period: fast.period.or(primary.period),
        clock: fast.clock.clone().or_else(|| primary.clock.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ParsedCompetitor;
    use chrono::Utc;

    fn primary_game(status: GameStatus, home: i32, away: i32) -> ParsedGame {
        ParsedGame {
            external_id: "1".into(),
            start_date: Utc::now(),
            status,
            period: Some(4),
            clock: Some("3:12".into()),
            venue: None,
            attendance: None,
            home: ParsedCompetitor {
                external_team_id: "h".into(),
                abbreviation: None,
                is_home: true,
                score: Some(home),
            },
            away: ParsedCompetitor {
                external_team_id: "a".into(),
                abbreviation: None,
                is_home: false,
                score: Some(away),
            },
            season_year: None,
            season_type_id: None,
        }
    }

    fn fast_game(home: i32, away: i32, is_live: bool, is_final: bool) -> FastGame {
        FastGame {
            home_team: "Home".into(),
            away_team: "Away".into(),
            home_abbr: None,
            away_abbr: None,
            home_score: home,
            away_score: away,
            home_record: None,
            away_record: None,
            home_logo_url: None,
            away_logo_url: None,
            period: Some(4),
            clock: Some("2:58".into()),
            is_live,
            is_final,
            is_scheduled: false,
        }
    }

    #[test]
    fn reconcile_with_no_fast_input_returns_primary_verbatim() {
        let primary = primary_game(GameStatus::InProgress, 104, 99);
        let outcome = reconcile(Some(&primary), None, ReconciliationStrategy::SmartMerge).unwrap();
        assert_eq!(outcome.fields.home_score, Some(104));
        assert!(!outcome.conflict);
    }

    #[test]
    fn both_sources_absent_is_an_error() {
        let err = reconcile(None, None, ReconciliationStrategy::SmartMerge).unwrap_err();
        assert!(matches!(err, IngestError::ErrBothSourcesNil));
    }

    #[test]
    fn smart_merge_live_overlays_fast_scores() {
        // S2 from the scenario table.
        let primary = primary_game(GameStatus::InProgress, 104, 99);
        let fast = fast_game(106, 99, true, false);
        let outcome =
            reconcile(Some(&primary), Some(&fast), ReconciliationStrategy::SmartMerge).unwrap();
        assert_eq!(outcome.fields.home_score, Some(106));
        assert_eq!(outcome.fields.clock.as_deref(), Some("2:58"));
        assert_eq!(outcome.preferred, Preferred::Fast);
    }

    #[test]
    fn final_vs_live_is_a_conflict_primary_wins() {
        // S3 from the scenario table.
        let primary = primary_game(GameStatus::Final, 112, 100);
        let fast = fast_game(112, 100, true, false);
        let outcome =
            reconcile(Some(&primary), Some(&fast), ReconciliationStrategy::SmartMerge).unwrap();
        assert!(outcome.conflict);
        assert_eq!(outcome.preferred, Preferred::Primary);
        assert_eq!(outcome.fields.status, GameStatus::Final);
    }

    #[test]
    fn large_score_delta_is_a_conflict() {
        let primary = primary_game(GameStatus::InProgress, 104, 99);
        let fast = fast_game(150, 99, true, false);
        let outcome =
            reconcile(Some(&primary), Some(&fast), ReconciliationStrategy::SmartMerge).unwrap();
        assert!(outcome.conflict);
    }

    #[test]
    fn prefer_authoritative_always_emits_primary() {
        let primary = primary_game(GameStatus::InProgress, 104, 99);
        let fast = fast_game(106, 99, true, false);
        let outcome = reconcile(
            Some(&primary),
            Some(&fast),
            ReconciliationStrategy::PreferAuthoritative,
        )
        .unwrap();
        assert_eq!(outcome.fields.home_score, Some(104));
    }

    #[test]
    fn prefer_latest_transposes_fast_onto_primary_identity() {
        let primary = primary_game(GameStatus::InProgress, 104, 99);
        let fast = fast_game(106, 99, true, false);
        let outcome = reconcile(
            Some(&primary),
            Some(&fast),
            ReconciliationStrategy::PreferLatest,
        )
        .unwrap();
        assert_eq!(outcome.fields.home_score, Some(106));
    }
}
