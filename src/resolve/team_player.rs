//! Team/Player Resolver (C5). The team cache is a build-once, read-many
//! process-wide map — the same `Arc<RwLock<HashMap<...>>>` with a
//! double-checked-locking `get_or_insert` shape the pack's odds-ingestion
//! `GameCache` uses, just keyed by external id and abbreviation instead of
//! by game id.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::models::{Player, PlayerStatus, Team};
use crate::db::Database;
use crate::error::IngestError;
use crate::sport::Sport;

/// Curated table of short-form variants the Primary and Fast upstreams emit
/// inconsistently. Shared with the `Matcher` (C7), which normalizes both
/// sides of an abbreviation comparison through the same table before
/// pairing a Primary game with a Fast game.
pub(crate) const ABBREVIATION_ALIASES: &[(&str, &str)] = &[
    ("GS", "GSW"),
    ("SA", "SAS"),
    ("NO", "NOP"),
    ("NY", "NYK"),
    ("UTAH", "UTA"),
    ("WSH", "WAS"),
];

/// Uppercases and maps a short-form variant to its canonical abbreviation,
/// passing unrecognized input through unchanged.
pub(crate) fn normalize_abbreviation(raw: &str) -> String {
    let upper = raw.to_uppercase();
    ABBREVIATION_ALIASES
        .iter()
        .find(|(from, _)| *from == upper)
        .map(|(_, to)| to.to_string())
        .unwrap_or(upper)
}

#[derive(Default)]
struct TeamCache {
    by_external_id: HashMap<String, Team>,
    by_abbreviation: HashMap<String, Team>,
}

pub struct TeamPlayerResolver {
    db: Database,
    team_cache: RwLock<Option<Arc<TeamCache>>>,
    player_cache: RwLock<HashMap<String, i64>>,
}

impl TeamPlayerResolver {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            team_cache: RwLock::new(None),
            player_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Forces a rebuild of the team cache on the next lookup — the
    /// operational-hygiene hook for rebuilding the cache on a signal.
    pub async fn invalidate_team_cache(&self) {
        *self.team_cache.write().await = None;
    }

    async fn cache(&self, sport: Sport) -> Result<Arc<TeamCache>, IngestError> {
        if let Some(cache) = self.team_cache.read().await.as_ref() {
            return Ok(cache.clone());
        }

        let mut guard = self.team_cache.write().await;
        if let Some(cache) = guard.as_ref() {
            return Ok(cache.clone());
        }

        let teams = self.db.teams().list_all(sport).await?;
        let mut cache = TeamCache::default();
        for team in teams {
            cache.by_external_id.insert(team.external_id.clone(), team.clone());
            cache
                .by_abbreviation
                .insert(team.abbreviation.clone(), team);
        }
        let cache = Arc::new(cache);
        *guard = Some(cache.clone());
        Ok(cache)
    }

    /// Resolves a team by external id, falling back to abbreviation lookup.
    /// Returns `UnknownTeam` rather than creating one — teams are
    /// pre-seeded, never created at ingest time.
    pub async fn resolve_team(
        &self,
        sport: Sport,
        external_id: &str,
        abbreviation: Option<&str>,
    ) -> Result<Team, IngestError> {
        let cache = self.cache(sport).await?;
        if let Some(team) = cache.by_external_id.get(external_id) {
            return Ok(team.clone());
        }
        if let Some(abbr) = abbreviation {
            let normalized = normalize_abbreviation(abbr);
            if let Some(team) = cache.by_abbreviation.get(&normalized) {
                return Ok(team.clone());
            }
        }
        Err(IngestError::UnknownTeam(external_id.to_string()))
    }

    pub async fn resolve_team_by_abbreviation(
        &self,
        sport: Sport,
        abbreviation: &str,
    ) -> Result<Team, IngestError> {
        let normalized = normalize_abbreviation(abbreviation);
        let cache = self.cache(sport).await?;
        cache
            .by_abbreviation
            .get(&normalized)
            .cloned()
            .ok_or_else(|| IngestError::UnknownTeam(normalized))
    }

    /// Builds a `{external_team_id -> abbreviation}` map from the cached
    /// team set, for matching Fast-source games onto Primary games without
    /// a per-team lookup.
    pub async fn external_id_to_abbreviation(
        &self,
        sport: Sport,
    ) -> Result<HashMap<String, String>, IngestError> {
        let cache = self.cache(sport).await?;
        Ok(cache
            .by_external_id
            .iter()
            .map(|(external_id, team)| (external_id.clone(), team.abbreviation.clone()))
            .collect())
    }

    /// Resolves a player: cache -> repository -> upsert-on-demand. Name
    /// splitting is by rightmost space; the remainder before it becomes
    /// `first_name`.
    pub async fn resolve_player(
        &self,
        sport: Sport,
        external_id: &str,
        full_name: &str,
    ) -> Result<Player, IngestError> {
        let cached = self.player_cache.read().await.contains_key(external_id);
        if cached {
            if let Some(player) = self
                .db
                .players()
                .get_by_external_id(sport, external_id)
                .await?
            {
                return Ok(player);
            }
            // Cache entry outlived the row (should not happen in normal
            // operation); fall through and re-resolve from scratch.
        }

        if let Some(player) = self
            .db
            .players()
            .get_by_external_id(sport, external_id)
            .await?
        {
            self.player_cache
                .write()
                .await
                .insert(external_id.to_string(), player.id);
            return Ok(player);
        }

        let (first_name, last_name) = split_name(full_name);
        let player = self
            .db
            .players()
            .upsert(
                sport,
                external_id,
                full_name,
                first_name.as_deref(),
                &last_name,
                PlayerStatus::Active,
            )
            .await?;
        self.player_cache
            .write()
            .await
            .insert(external_id.to_string(), player.id);
        Ok(player)
    }
}

/// Splits on the rightmost space: everything before is `first_name`,
/// everything after is `last_name` (mandatory).
fn split_name(full_name: &str) -> (Option<String>, String) {
    match full_name.trim().rsplit_once(' ') {
        Some((first, last)) => (Some(first.to_string()), last.to_string()),
        None => (None, full_name.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_aliases() {
        assert_eq!(normalize_abbreviation("gs"), "GSW");
        assert_eq!(normalize_abbreviation("SA"), "SAS");
        assert_eq!(normalize_abbreviation("LAL"), "LAL");
    }

    #[test]
    fn splits_name_on_rightmost_space() {
        assert_eq!(
            split_name("Shai Gilgeous-Alexander"),
            (Some("Shai".to_string()), "Gilgeous-Alexander".to_string())
        );
        assert_eq!(split_name("Nene"), (None, "Nene".to_string()));
    }
}
