//! Season Resolver (C6). Implements the five-step fallback chain in order;
//! failure at all five is fatal for the unit of work (`UnknownSeason`).

use chrono::NaiveDate;
use serde_json::Value;

use crate::db::models::{Season, SeasonType};
use crate::db::Database;
use crate::error::IngestError;
use crate::sport::Sport;

pub struct SeasonResolver {
    db: Database,
}

impl SeasonResolver {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Step 1: the job specifies a season year directly.
    pub async fn resolve_for_season_year(
        &self,
        sport: Sport,
        season_year: &str,
    ) -> Result<Season, IngestError> {
        if let Some(season) = self
            .db
            .seasons()
            .find_by_year_and_type(sport, season_year, SeasonType::Regular)
            .await?
        {
            return Ok(season);
        }
        // Widen to other types on failure.
        for season_type in [SeasonType::Preseason, SeasonType::Playoffs] {
            if let Some(season) = self
                .db
                .seasons()
                .find_by_year_and_type(sport, season_year, season_type)
                .await?
            {
                return Ok(season);
            }
        }
        Err(IngestError::UnknownSeason(format!(
            "no season row for year {season_year}"
        )))
    }

    /// Steps 2-5: no season year given. `scoreboard` is the already-fetched
    /// Primary scoreboard JSON for `date`, consulted for the
    /// `leagues[0].season` hint before falling back to calendar matching.
    pub async fn resolve_for_date(
        &self,
        sport: Sport,
        date: NaiveDate,
        scoreboard: Option<&Value>,
    ) -> Result<Season, IngestError> {
        // Step 2: Primary's scoreboard season hint.
        if let Some(raw) = scoreboard {
            if let Some(season) = self.resolve_from_scoreboard_hint(sport, raw).await? {
                return Ok(season);
            }
        }

        // Step 3: date-interval match.
        if let Some(season) = self.db.seasons().find_covering_date(sport, date).await? {
            return Ok(season);
        }

        // Step 4: most-recently-ended season (off-season fallback).
        if let Some(season) = self.most_recently_ended(sport, date).await? {
            return Ok(season);
        }

        // Step 5: earliest future season (pre-season fallback).
        if let Some(season) = self.earliest_future(sport, date).await? {
            return Ok(season);
        }

        Err(IngestError::UnknownSeason(format!(
            "exhausted all fallbacks for date {date}"
        )))
    }

    async fn resolve_from_scoreboard_hint(
        &self,
        sport: Sport,
        raw: &Value,
    ) -> Result<Option<Season>, IngestError> {
        let league = &raw["leagues"][0];
        let Some(display_name) = league["season"]["displayName"].as_str() else {
            return Ok(None);
        };
        let type_id = league["season"]["type"]["id"]
            .as_str()
            .and_then(|s| s.parse::<i32>().ok())
            .or_else(|| league["season"]["type"]["id"].as_i64().map(|v| v as i32));
        let Some(season_type) = type_id.and_then(map_season_type_id) else {
            return Ok(None);
        };
        Ok(self
            .db
            .seasons()
            .find_by_year_and_type(sport, display_name, season_type)
            .await?)
    }

    async fn most_recently_ended(
        &self,
        sport: Sport,
        date: NaiveDate,
    ) -> Result<Option<Season>, IngestError> {
        let candidate = self.db.seasons().find_most_recent(sport).await?;
        Ok(candidate.filter(|s| s.end_date < date))
    }

    async fn earliest_future(
        &self,
        sport: Sport,
        date: NaiveDate,
    ) -> Result<Option<Season>, IngestError> {
        self.db.seasons().find_earliest_future(sport, date).await
    }
}

/// `1=preseason, 2=regular, 3=playoffs`.
fn map_season_type_id(id: i32) -> Option<SeasonType> {
    match id {
        1 => Some(SeasonType::Preseason),
        2 => Some(SeasonType::Regular),
        3 => Some(SeasonType::Playoffs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_season_type_ids() {
        assert_eq!(map_season_type_id(1), Some(SeasonType::Preseason));
        assert_eq!(map_season_type_id(2), Some(SeasonType::Regular));
        assert_eq!(map_season_type_id(3), Some(SeasonType::Playoffs));
        assert_eq!(map_season_type_id(9), None);
    }
}
