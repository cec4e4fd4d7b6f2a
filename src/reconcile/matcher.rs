//! Matches Primary games to Fast games by team abbreviation before
//! per-game reconciliation runs.

use std::collections::HashMap;

use crate::parsing::{FastGame, ParsedGame};
use crate::resolve::team_player::normalize_abbreviation;

/// One unmatched Fast game, carried separately so the caller can apply the
/// team_id=0-sentinel decision: rather than
/// persist a zero surrogate key, these are tagged and dropped before
/// reaching the repository layer.
pub struct MatchResult {
    pub paired: Vec<(ParsedGame, Option<FastGame>)>,
    pub unmatched_fast: Vec<FastGame>,
}

/// Built from a snapshot of `(external_team_id -> abbreviation)`, the same
/// shape the team cache already holds.
pub struct Matcher<'a> {
    team_abbreviations: &'a HashMap<String, String>,
}

impl<'a> Matcher<'a> {
    pub fn new(team_abbreviations: &'a HashMap<String, String>) -> Self {
        Self { team_abbreviations }
    }

    pub fn pair(&self, primary_games: Vec<ParsedGame>, fast_games: Vec<FastGame>) -> MatchResult {
        let mut remaining_fast = fast_games;
        let mut paired = Vec::with_capacity(primary_games.len());

        for primary in primary_games {
            let home_abbr = self.team_abbreviations.get(&primary.home.external_team_id);
            let away_abbr = self.team_abbreviations.get(&primary.away.external_team_id);

            let match_index = home_abbr.zip(away_abbr).and_then(|(home, away)| {
                remaining_fast.iter().position(|fast| {
                    abbreviation_matches(home, fast.home_abbr.as_deref())
                        && abbreviation_matches(away, fast.away_abbr.as_deref())
                })
            });

            let matched_fast = match_index.map(|idx| remaining_fast.remove(idx));
            paired.push((primary, matched_fast));
        }

        MatchResult {
            paired,
            unmatched_fast: remaining_fast,
        }
    }
}

/// Normalizes both sides through the same curated alias table before
/// comparing, so Fast's short forms (`"GS"`) pair with Primary's canonical
/// abbreviation (`"GSW"`) instead of only matching an exact string.
fn abbreviation_matches(expected: &str, actual: Option<&str>) -> bool {
    let expected = normalize_abbreviation(expected);
    actual
        .map(|a| normalize_abbreviation(a) == expected)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::GameStatus;
    use crate::parsing::ParsedCompetitor;
    use chrono::Utc;

    fn primary(home_ext: &str, away_ext: &str) -> ParsedGame {
        ParsedGame {
            external_id: "1".into(),
            start_date: Utc::now(),
            status: GameStatus::InProgress,
            period: None,
            clock: None,
            venue: None,
            attendance: None,
            home: ParsedCompetitor {
                external_team_id: home_ext.into(),
                abbreviation: None,
                is_home: true,
                score: Some(10),
            },
            away: ParsedCompetitor {
                external_team_id: away_ext.into(),
                abbreviation: None,
                is_home: false,
                score: Some(8),
            },
            season_year: None,
            season_type_id: None,
        }
    }

    fn fast(home_abbr: &str, away_abbr: &str) -> FastGame {
        FastGame {
            home_team: "Home".into(),
            away_team: "Away".into(),
            home_abbr: Some(home_abbr.into()),
            away_abbr: Some(away_abbr.into()),
            home_score: 10,
            away_score: 8,
            home_record: None,
            away_record: None,
            home_logo_url: None,
            away_logo_url: None,
            period: None,
            clock: None,
            is_live: true,
            is_final: false,
            is_scheduled: false,
        }
    }

    #[test]
    fn pairs_games_by_abbreviation() {
        let mut abbrs = HashMap::new();
        abbrs.insert("1".to_string(), "LAL".to_string());
        abbrs.insert("2".to_string(), "BOS".to_string());

        let matcher = Matcher::new(&abbrs);
        let result = matcher.pair(vec![primary("1", "2")], vec![fast("LAL", "BOS")]);

        assert_eq!(result.paired.len(), 1);
        assert!(result.paired[0].1.is_some());
        assert!(result.unmatched_fast.is_empty());
    }

    #[test]
    fn pairs_games_through_short_form_alias() {
        let mut abbrs = HashMap::new();
        abbrs.insert("1".to_string(), "GSW".to_string());
        abbrs.insert("2".to_string(), "BOS".to_string());

        let matcher = Matcher::new(&abbrs);
        let result = matcher.pair(vec![primary("1", "2")], vec![fast("GS", "BOS")]);

        assert_eq!(result.paired.len(), 1);
        assert!(result.paired[0].1.is_some());
        assert!(result.unmatched_fast.is_empty());
    }

    #[test]
    fn unmatched_fast_games_are_reported_separately() {
        let abbrs = HashMap::new();
        let matcher = Matcher::new(&abbrs);
        let result = matcher.pair(vec![], vec![fast("LAL", "BOS")]);

        assert!(result.paired.is_empty());
        assert_eq!(result.unmatched_fast.len(), 1);
    }
}
