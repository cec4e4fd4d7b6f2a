//! Structured error taxonomy.
//!
//! Components use `IngestError` for conditions that the pipeline needs to
//! branch on (retry vs. skip vs. fail-the-job); everything else uses
//! `anyhow::Result` with `.context(...)`, matching the split already present
//! in the surrounding client/config code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("upstream rejected the request (returned HTML instead of JSON): {0}")]
    UpstreamRejected(String),

    #[error("upstream response could not be parsed: {reason} (payload prefix: {payload_prefix:?})")]
    UpstreamMalformed {
        reason: String,
        payload_prefix: String,
    },

    #[error("unknown team abbreviation or external id: {0}")]
    UnknownTeam(String),

    #[error("could not resolve a season for this unit of work: {0}")]
    UnknownSeason(String),

    #[error("reconciliation conflict detected for game {external_game_id}")]
    ConflictDetected { external_game_id: String },

    #[error("database constraint violated: {0}")]
    ConstraintViolation(#[source] sqlx::Error),

    #[error("cancellation requested")]
    CancellationRequested,

    #[error("reconciliation called with both sources absent")]
    ErrBothSourcesNil,

    #[error("backfill request was underspecified (no game_ids, no date range, no season)")]
    Underspecified,
}

impl IngestError {
    /// Whether this error is worth retrying within the current unit of work's
    /// retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::UpstreamTimeout(_))
    }

    /// Whether this error should fail the containing unit of work outright
    /// (a date, a game, a backfill job) rather than being logged and skipped.
    pub fn is_fatal_for_unit(&self) -> bool {
        matches!(
            self,
            IngestError::UnknownSeason(_)
                | IngestError::ConstraintViolation(_)
                | IngestError::CancellationRequested
                | IngestError::ErrBothSourcesNil
                | IngestError::Underspecified
        )
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(e: sqlx::Error) -> Self {
        IngestError::ConstraintViolation(e)
    }
}
