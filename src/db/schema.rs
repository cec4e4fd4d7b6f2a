//! Embedded PostgreSQL schema, applied once at startup via `execute_batch` —
//! a full migration runner is out of scope. Every statement is idempotent
//! (`CREATE TABLE IF NOT EXISTS` / `CREATE OR REPLACE FUNCTION`), so this is
//! safe to run on every boot.
//!
//! Trigger-computed columns are recomputed unconditionally on
//! every insert/update of the two box-score tables; division-by-zero guards
//! leave the derived column `NULL` rather than erroring.

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS seasons (
    id          BIGSERIAL PRIMARY KEY,
    sport       TEXT NOT NULL,
    season_year TEXT NOT NULL,
    season_type TEXT NOT NULL CHECK (season_type IN ('preseason', 'regular', 'playoffs')),
    start_date  DATE NOT NULL,
    end_date    DATE NOT NULL CHECK (end_date >= start_date),
    UNIQUE (sport, season_year, season_type)
);

CREATE TABLE IF NOT EXISTS teams (
    id           BIGSERIAL PRIMARY KEY,
    sport        TEXT NOT NULL,
    external_id  TEXT NOT NULL,
    abbreviation TEXT NOT NULL,
    name         TEXT NOT NULL,
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (sport, external_id),
    UNIQUE (sport, abbreviation)
);

CREATE TABLE IF NOT EXISTS players (
    id          BIGSERIAL PRIMARY KEY,
    sport       TEXT NOT NULL,
    external_id TEXT NOT NULL,
    full_name   TEXT NOT NULL,
    first_name  TEXT,
    last_name   TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'retired', 'free_agent', 'injured')),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (sport, external_id)
);

CREATE TABLE IF NOT EXISTS player_team_history (
    id         BIGSERIAL PRIMARY KEY,
    player_id  BIGINT NOT NULL REFERENCES players(id),
    team_id    BIGINT NOT NULL REFERENCES teams(id),
    start_date DATE NOT NULL,
    end_date   DATE,
    UNIQUE (player_id, team_id, start_date)
);

CREATE TABLE IF NOT EXISTS games (
    id            BIGSERIAL PRIMARY KEY,
    sport         TEXT NOT NULL,
    external_id   TEXT NOT NULL,
    season_id     BIGINT NOT NULL REFERENCES seasons(id),
    home_team_id  BIGINT NOT NULL REFERENCES teams(id),
    away_team_id  BIGINT NOT NULL REFERENCES teams(id),
    status        TEXT NOT NULL CHECK (status IN ('scheduled', 'in_progress', 'final', 'postponed', 'cancelled')),
    period        INTEGER,
    clock         TEXT,
    home_score    INTEGER,
    away_score    INTEGER,
    attendance    INTEGER,
    venue         TEXT,
    game_date     TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (sport, external_id),
    CHECK (home_team_id != away_team_id),
    CHECK (status != 'final' OR (home_score IS NOT NULL AND away_score IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_games_status ON games (status);
CREATE INDEX IF NOT EXISTS idx_games_game_date ON games (game_date);
CREATE INDEX IF NOT EXISTS idx_games_season ON games (season_id);

CREATE TABLE IF NOT EXISTS player_game_stats (
    id                      BIGSERIAL PRIMARY KEY,
    game_id                 BIGINT NOT NULL REFERENCES games(id),
    player_id               BIGINT NOT NULL REFERENCES players(id),
    minutes_played          DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK (minutes_played >= 0 AND minutes_played <= 60),
    points                  INTEGER NOT NULL DEFAULT 0,
    field_goals_made        INTEGER NOT NULL DEFAULT 0,
    field_goals_attempted   INTEGER NOT NULL DEFAULT 0,
    three_points_made       INTEGER NOT NULL DEFAULT 0,
    three_points_attempted  INTEGER NOT NULL DEFAULT 0,
    free_throws_made        INTEGER NOT NULL DEFAULT 0,
    free_throws_attempted   INTEGER NOT NULL DEFAULT 0,
    offensive_rebounds      INTEGER NOT NULL DEFAULT 0,
    defensive_rebounds      INTEGER NOT NULL DEFAULT 0,
    total_rebounds          INTEGER NOT NULL DEFAULT 0,
    assists                 INTEGER NOT NULL DEFAULT 0,
    steals                  INTEGER NOT NULL DEFAULT 0,
    blocks                  INTEGER NOT NULL DEFAULT 0,
    turnovers               INTEGER NOT NULL DEFAULT 0,
    personal_fouls          INTEGER NOT NULL DEFAULT 0,
    plus_minus              INTEGER,
    field_goal_pct          DOUBLE PRECISION,
    three_point_pct         DOUBLE PRECISION,
    free_throw_pct          DOUBLE PRECISION,
    true_shooting_pct       DOUBLE PRECISION,
    effective_fg_pct        DOUBLE PRECISION,
    game_score              DOUBLE PRECISION,
    offensive_rating        DOUBLE PRECISION,
    defensive_rating        DOUBLE PRECISION,
    net_rating              DOUBLE PRECISION,
    updated_at              TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (game_id, player_id),
    CHECK (field_goals_made <= field_goals_attempted),
    CHECK (three_points_made <= three_points_attempted),
    CHECK (free_throws_made <= free_throws_attempted)
);

CREATE TABLE IF NOT EXISTS team_game_stats (
    id                       BIGSERIAL PRIMARY KEY,
    game_id                  BIGINT NOT NULL REFERENCES games(id),
    team_id                  BIGINT NOT NULL REFERENCES teams(id),
    is_home                  BOOLEAN NOT NULL,
    points                   INTEGER NOT NULL DEFAULT 0,
    field_goals_made         INTEGER NOT NULL DEFAULT 0,
    field_goals_attempted    INTEGER NOT NULL DEFAULT 0,
    three_points_made        INTEGER NOT NULL DEFAULT 0,
    three_points_attempted   INTEGER NOT NULL DEFAULT 0,
    free_throws_made         INTEGER NOT NULL DEFAULT 0,
    free_throws_attempted    INTEGER NOT NULL DEFAULT 0,
    offensive_rebounds       INTEGER NOT NULL DEFAULT 0,
    defensive_rebounds       INTEGER NOT NULL DEFAULT 0,
    assists                  INTEGER NOT NULL DEFAULT 0,
    turnovers                INTEGER NOT NULL DEFAULT 0,
    possessions              INTEGER,
    field_goal_pct           DOUBLE PRECISION,
    three_point_pct          DOUBLE PRECISION,
    free_throw_pct           DOUBLE PRECISION,
    free_throw_rate          DOUBLE PRECISION,
    assist_to_turnover_ratio DOUBLE PRECISION,
    offensive_rating         DOUBLE PRECISION,
    defensive_rating         DOUBLE PRECISION,
    net_rating               DOUBLE PRECISION,
    updated_at               TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (game_id, team_id)
);

CREATE TABLE IF NOT EXISTS backfill_jobs (
    job_id           UUID PRIMARY KEY,
    sport            TEXT NOT NULL,
    job_type         TEXT NOT NULL CHECK (job_type IN ('season', 'date_range', 'game')),
    season_id        BIGINT REFERENCES seasons(id),
    start_date       DATE,
    end_date         DATE,
    game_ids         TEXT[] NOT NULL DEFAULT '{}',
    dry_run          BOOLEAN NOT NULL DEFAULT false,
    status           TEXT NOT NULL DEFAULT 'queued' CHECK (status IN ('queued', 'running', 'completed', 'failed', 'cancelled')),
    progress_current  INTEGER NOT NULL DEFAULT 0,
    progress_total    INTEGER NOT NULL DEFAULT 0,
    status_message   TEXT,
    last_error       TEXT,
    retry_count      INTEGER NOT NULL DEFAULT 0,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
    completed_at     TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_backfill_jobs_status ON backfill_jobs (status);
CREATE INDEX IF NOT EXISTS idx_backfill_jobs_created_at ON backfill_jobs (created_at DESC);

CREATE TABLE IF NOT EXISTS backfill_job_events (
    id               BIGSERIAL PRIMARY KEY,
    job_id           UUID NOT NULL REFERENCES backfill_jobs(job_id),
    event_type       TEXT NOT NULL,
    message          TEXT NOT NULL,
    progress_current INTEGER NOT NULL DEFAULT 0,
    progress_total   INTEGER NOT NULL DEFAULT 0,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_backfill_job_events_job ON backfill_job_events (job_id);

-- Generic `updated_at` maintenance, applied to every mutable table.
CREATE OR REPLACE FUNCTION set_updated_at() RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at := now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS trg_teams_updated_at ON teams;
CREATE TRIGGER trg_teams_updated_at BEFORE UPDATE ON teams
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

DROP TRIGGER IF EXISTS trg_players_updated_at ON players;
CREATE TRIGGER trg_players_updated_at BEFORE UPDATE ON players
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

DROP TRIGGER IF EXISTS trg_games_updated_at ON games;
CREATE TRIGGER trg_games_updated_at BEFORE UPDATE ON games
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

-- Box-score derivations. Division-by-zero guards leave the
-- column NULL rather than erroring.
CREATE OR REPLACE FUNCTION derive_player_game_stats() RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at := now();

    NEW.field_goal_pct := CASE WHEN NEW.field_goals_attempted > 0
        THEN NEW.field_goals_made::DOUBLE PRECISION / NEW.field_goals_attempted ELSE NULL END;
    NEW.three_point_pct := CASE WHEN NEW.three_points_attempted > 0
        THEN NEW.three_points_made::DOUBLE PRECISION / NEW.three_points_attempted ELSE NULL END;
    NEW.free_throw_pct := CASE WHEN NEW.free_throws_attempted > 0
        THEN NEW.free_throws_made::DOUBLE PRECISION / NEW.free_throws_attempted ELSE NULL END;

    NEW.true_shooting_pct := CASE WHEN (NEW.field_goals_attempted + 0.44 * NEW.free_throws_attempted) > 0
        THEN NEW.points::DOUBLE PRECISION / (2.0 * (NEW.field_goals_attempted + 0.44 * NEW.free_throws_attempted))
        ELSE NULL END;

    NEW.effective_fg_pct := CASE WHEN NEW.field_goals_attempted > 0
        THEN (NEW.field_goals_made + 0.5 * NEW.three_points_made)::DOUBLE PRECISION / NEW.field_goals_attempted
        ELSE NULL END;

    NEW.game_score :=
          NEW.points
        + 0.4 * NEW.field_goals_made
        - 0.7 * NEW.field_goals_attempted
        - 0.4 * (NEW.free_throws_attempted - NEW.free_throws_made)
        + 0.7 * NEW.offensive_rebounds
        + 0.3 * NEW.defensive_rebounds
        + NEW.steals
        + 0.7 * NEW.assists
        + 0.7 * NEW.blocks
        - 0.4 * NEW.personal_fouls
        - NEW.turnovers;

    NEW.net_rating := CASE WHEN NEW.offensive_rating IS NOT NULL AND NEW.defensive_rating IS NOT NULL
        THEN NEW.offensive_rating - NEW.defensive_rating ELSE NULL END;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS trg_player_game_stats_derive ON player_game_stats;
CREATE TRIGGER trg_player_game_stats_derive BEFORE INSERT OR UPDATE ON player_game_stats
    FOR EACH ROW EXECUTE FUNCTION derive_player_game_stats();

CREATE OR REPLACE FUNCTION derive_team_game_stats() RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at := now();

    NEW.field_goal_pct := CASE WHEN NEW.field_goals_attempted > 0
        THEN NEW.field_goals_made::DOUBLE PRECISION / NEW.field_goals_attempted ELSE NULL END;
    NEW.three_point_pct := CASE WHEN NEW.three_points_attempted > 0
        THEN NEW.three_points_made::DOUBLE PRECISION / NEW.three_points_attempted ELSE NULL END;
    NEW.free_throw_pct := CASE WHEN NEW.free_throws_attempted > 0
        THEN NEW.free_throws_made::DOUBLE PRECISION / NEW.free_throws_attempted ELSE NULL END;
    NEW.free_throw_rate := CASE WHEN NEW.field_goals_attempted > 0
        THEN NEW.free_throws_attempted::DOUBLE PRECISION / NEW.field_goals_attempted ELSE NULL END;
    NEW.assist_to_turnover_ratio := CASE WHEN NEW.turnovers > 0
        THEN NEW.assists::DOUBLE PRECISION / NEW.turnovers ELSE NULL END;
    NEW.offensive_rating := CASE WHEN NEW.possessions IS NOT NULL AND NEW.possessions > 0
        THEN 100.0 * NEW.points::DOUBLE PRECISION / NEW.possessions ELSE NULL END;
    NEW.net_rating := CASE WHEN NEW.offensive_rating IS NOT NULL AND NEW.defensive_rating IS NOT NULL
        THEN NEW.offensive_rating - NEW.defensive_rating ELSE NULL END;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS trg_team_game_stats_derive ON team_game_stats;
CREATE TRIGGER trg_team_game_stats_derive BEFORE INSERT OR UPDATE ON team_game_stats
    FOR EACH ROW EXECUTE FUNCTION derive_team_game_stats();

-- Refreshed out-of-band; definition kept here so its shape ships with the
-- rest of the schema.
CREATE MATERIALIZED VIEW IF NOT EXISTS player_season_averages AS
SELECT
    pgs.player_id,
    g.season_id,
    COUNT(*)                                   AS games_played,
    AVG(pgs.points)                            AS ppg,
    AVG(pgs.total_rebounds)                    AS rpg,
    AVG(pgs.assists)                           AS apg,
    AVG(pgs.field_goal_pct)                    AS fg_pct,
    AVG(pgs.three_point_pct)                   AS three_pt_pct,
    AVG(pgs.free_throw_pct)                    AS ft_pct
FROM player_game_stats pgs
JOIN games g ON g.id = pgs.game_id
WHERE g.status = 'final'
GROUP BY pgs.player_id, g.season_id;
"#;
