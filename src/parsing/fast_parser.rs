//! Fast Parser (C4). Regex-based extraction over rendered HTML, grounded in
//! the same `once_cell::Lazy<Regex>` idiom the pack's odds-ingestion parser
//! uses for its score-line matching. No DOM/CSS-selector crate is in the
//! dependency stack (none of the example repos pull one in for this shape
//! of scrape), so both the "widget" and the "fallback" strategies described
//! are implemented as regex passes over the raw text — the fallback is
//! simply a looser, more permissive pattern.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{normalize_logo_url, team_record_to_w_l, FastGame};

static CARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<div[^>]*class="[^"]*score-card[^"]*"[^>]*>(.*?)</div>\s*(?:</div>\s*)*"#,
    )
    .unwrap()
});

static FALLBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([A-Za-z .]+?)\s+(\d{1,3})\s*-\s*(\d{1,3})\s+([A-Za-z .]+)").unwrap()
});

static CLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2}:\d{2})\b").unwrap());
static RECORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+\s*-\s*\d+)\)").unwrap());
static LOGO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"src="([^"]+logo[^"]*)""#).unwrap());

const LIVE_MARKERS: &[&str] = &["live", "q1", "q2", "q3", "q4", "ot", "half"];

/// Built-in name-to-abbreviation table. Keyed by both the full display name
/// and the nickname alone, since the card and fallback strategies surface
/// either form depending on how the search result renders the team.
const NAME_TO_ABBREVIATION: &[(&str, &str)] = &[
    ("Atlanta Hawks", "ATL"),
    ("Hawks", "ATL"),
    ("Boston Celtics", "BOS"),
    ("Celtics", "BOS"),
    ("Brooklyn Nets", "BKN"),
    ("Nets", "BKN"),
    ("Charlotte Hornets", "CHA"),
    ("Hornets", "CHA"),
    ("Chicago Bulls", "CHI"),
    ("Bulls", "CHI"),
    ("Cleveland Cavaliers", "CLE"),
    ("Cavaliers", "CLE"),
    ("Dallas Mavericks", "DAL"),
    ("Mavericks", "DAL"),
    ("Denver Nuggets", "DEN"),
    ("Nuggets", "DEN"),
    ("Detroit Pistons", "DET"),
    ("Pistons", "DET"),
    ("Golden State Warriors", "GSW"),
    ("Warriors", "GSW"),
    ("Houston Rockets", "HOU"),
    ("Rockets", "HOU"),
    ("Indiana Pacers", "IND"),
    ("Pacers", "IND"),
    ("LA Clippers", "LAC"),
    ("Los Angeles Clippers", "LAC"),
    ("Clippers", "LAC"),
    ("Los Angeles Lakers", "LAL"),
    ("Lakers", "LAL"),
    ("Memphis Grizzlies", "MEM"),
    ("Grizzlies", "MEM"),
    ("Miami Heat", "MIA"),
    ("Heat", "MIA"),
    ("Milwaukee Bucks", "MIL"),
    ("Bucks", "MIL"),
    ("Minnesota Timberwolves", "MIN"),
    ("Timberwolves", "MIN"),
    ("New Orleans Pelicans", "NOP"),
    ("Pelicans", "NOP"),
    ("New York Knicks", "NYK"),
    ("Knicks", "NYK"),
    ("Oklahoma City Thunder", "OKC"),
    ("Thunder", "OKC"),
    ("Orlando Magic", "ORL"),
    ("Magic", "ORL"),
    ("Philadelphia 76ers", "PHI"),
    ("76ers", "PHI"),
    ("Phoenix Suns", "PHX"),
    ("Suns", "PHX"),
    ("Portland Trail Blazers", "POR"),
    ("Trail Blazers", "POR"),
    ("Sacramento Kings", "SAC"),
    ("Kings", "SAC"),
    ("San Antonio Spurs", "SAS"),
    ("Spurs", "SAS"),
    ("Toronto Raptors", "TOR"),
    ("Raptors", "TOR"),
    ("Utah Jazz", "UTA"),
    ("Jazz", "UTA"),
    ("Washington Wizards", "WAS"),
    ("Wizards", "WAS"),
];

/// Parses every game card out of a rendered search-results page. Cards that
/// match neither the primary widget selector nor the fallback regex are
/// silently dropped — treated as a routine "no games found" result, not
/// an error.
pub fn parse_live_games(html: &str) -> Vec<FastGame> {
    let mut games: Vec<FastGame> = CARD_RE
        .captures_iter(html)
        .filter_map(|c| parse_card(&c[1]))
        .collect();

    if games.is_empty() {
        games = FALLBACK_RE
            .captures_iter(html)
            .filter_map(|c| {
                let home_score: i32 = c[2].parse().ok()?;
                let away_score: i32 = c[3].parse().ok()?;
                Some(FastGame {
                    home_team: c[1].trim().to_string(),
                    away_team: c[4].trim().to_string(),
                    home_abbr: abbreviation_from_name(&c[1]),
                    away_abbr: abbreviation_from_name(&c[4]),
                    home_score,
                    away_score,
                    home_record: None,
                    away_record: None,
                    home_logo_url: None,
                    away_logo_url: None,
                    period: None,
                    clock: None,
                    is_live: true,
                    is_final: false,
                    is_scheduled: false,
                })
            })
            .collect();
    }
    games
}

fn parse_card(card_html: &str) -> Option<FastGame> {
    let text = strip_tags(card_html);
    let teams: Vec<&str> = text
        .split(|c: char| c == '\n')
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let scores: Vec<i32> = text
        .split_whitespace()
        .filter_map(|t| t.parse::<i32>().ok())
        .collect();
    if scores.len() < 2 || teams.len() < 2 {
        return None;
    }

    let records: Vec<String> = RECORD_RE
        .captures_iter(&text)
        .filter_map(|c| team_record_to_w_l(&c[0]))
        .collect();

    let logos: Vec<String> = LOGO_RE
        .captures_iter(card_html)
        .map(|c| normalize_logo_url(&c[1]))
        .collect();

    let status_str = text.to_lowercase();
    let is_live = LIVE_MARKERS.iter().any(|m| status_str.contains(m)) || CLOCK_RE.is_match(&text);
    let is_final = status_str.contains("final");
    let is_scheduled = !is_live && !is_final;

    let (period, clock) = parse_period_and_clock(&status_str);

    Some(FastGame {
        home_team: teams[0].to_string(),
        away_team: teams[1].to_string(),
        home_abbr: abbreviation_from_name(teams[0]),
        away_abbr: abbreviation_from_name(teams[1]),
        home_score: scores[0],
        away_score: scores[1],
        home_record: records.first().cloned(),
        away_record: records.get(1).cloned(),
        home_logo_url: logos.first().cloned(),
        away_logo_url: logos.get(1).cloned(),
        period,
        clock,
        is_live,
        is_final,
        is_scheduled,
    })
}

fn parse_period_and_clock(status_str: &str) -> (Option<i32>, Option<String>) {
    if status_str.contains("half") {
        return (Some(2), Some("Halftime".to_string()));
    }
    let period = [
        ("q1", 1),
        ("1st", 1),
        ("first", 1),
        ("q2", 2),
        ("2nd", 2),
        ("second", 2),
        ("q3", 3),
        ("3rd", 3),
        ("third", 3),
        ("q4", 4),
        ("4th", 4),
        ("fourth", 4),
        ("ot", 5),
        ("overtime", 5),
    ]
    .iter()
    .find(|(token, _)| status_str.contains(token))
    .map(|(_, p)| *p);

    let clock = CLOCK_RE
        .captures(status_str)
        .map(|c| c[1].to_string());

    (period, clock)
}

/// Looks a display name up in the built-in table, trying the full trimmed
/// name first and then its last whitespace-separated word (the nickname),
/// since a scraped card may render either form.
fn abbreviation_from_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if let Some((_, abbr)) = NAME_TO_ABBREVIATION
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(trimmed))
    {
        return Some(abbr.to_string());
    }
    let nickname = trimmed.rsplit(' ').next()?;
    NAME_TO_ABBREVIATION
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(nickname))
        .map(|(_, abbr)| abbr.to_string())
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push('\n');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_regex_extracts_team_score_team() {
        let html = "<p>Lakers 104 - 99 Celtics</p>";
        let games = parse_live_games(html);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].home_score, 104);
        assert_eq!(games[0].away_score, 99);
        assert_eq!(games[0].home_abbr.as_deref(), Some("LAL"));
        assert_eq!(games[0].away_abbr.as_deref(), Some("BOS"));
    }

    #[test]
    fn abbreviation_table_covers_full_name_and_nickname() {
        assert_eq!(abbreviation_from_name("Lakers"), Some("LAL".to_string()));
        assert_eq!(
            abbreviation_from_name("Los Angeles Lakers"),
            Some("LAL".to_string())
        );
        assert_eq!(abbreviation_from_name("Golden State Warriors"), Some("GSW".to_string()));
        assert_eq!(abbreviation_from_name("Nonexistent Team"), None);
    }

    #[test]
    fn classifies_live_status_from_clock() {
        let (period, clock) = parse_period_and_clock("q3 5:12");
        assert_eq!(period, Some(3));
        assert_eq!(clock.as_deref(), Some("5:12"));
    }

    #[test]
    fn classifies_halftime() {
        let (period, clock) = parse_period_and_clock("halftime");
        assert_eq!(period, Some(2));
        assert_eq!(clock.as_deref(), Some("Halftime"));
    }

    #[test]
    fn normalizes_record_text() {
        assert_eq!(team_record_to_w_l("(10 - 4)"), Some("10-4".to_string()));
    }
}
