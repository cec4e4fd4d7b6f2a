//! Backfill Service (C9). A single-worker queue backed by `backfill_jobs`,
//! reusing the live ingester's game/date processing so backfilled and
//! live-polled data pass through identical reconciliation and persistence.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::db::models::{BackfillJob, BackfillJobType, BackfillRequest};
use crate::db::Database;
use crate::error::IngestError;
use crate::ingest::LiveIngester;
use crate::resolve::SeasonResolver;
use crate::sport::Sport;

const EMPTY_QUEUE_POLL_INTERVAL: Duration = Duration::from_secs(3);
const STUCK_JOB_THRESHOLD: chrono::Duration = chrono::Duration::hours(6);

pub struct BackfillService {
    db: Database,
    ingester: Arc<LiveIngester>,
    season_resolver: SeasonResolver,
}

/// Terminal disposition of a job execution, distinguishing a shutdown that
/// arrived mid-iteration from a run that finished all its work.
enum JobOutcome {
    Completed,
    Cancelled,
}

/// `{active_job, recent_jobs}` for the status API, `recent_jobs` capped at
/// 10 and ordered `created_at DESC`.
pub struct BackfillStatus {
    pub active_job: Option<BackfillJob>,
    pub recent_jobs: Vec<BackfillJob>,
}

impl BackfillService {
    pub fn new(db: Database, ingester: Arc<LiveIngester>) -> Self {
        let season_resolver = SeasonResolver::new(db.clone());
        Self {
            db,
            ingester,
            season_resolver,
        }
    }

    /// Enqueues a backfill job, pre-computing `progress_total` from the
    /// request shape before the row is written.
    pub async fn enqueue(
        &self,
        sport: Sport,
        request: BackfillRequest,
    ) -> Result<BackfillJob, IngestError> {
        let progress_total = if !request.game_ids.is_empty() {
            request.game_ids.len() as i32
        } else if let (Some(start), Some(end)) = (request.start_date, request.end_date) {
            day_count(start, end)
        } else if let Some(season_id) = request.season_id {
            let season = self
                .db
                .seasons()
                .get_by_id(season_id)
                .await?
                .ok_or_else(|| IngestError::UnknownSeason(format!("no season row for id {season_id}")))?;
            day_count(season.start_date, season.end_date)
        } else {
            return Err(IngestError::Underspecified);
        };

        let job = self
            .db
            .backfill_jobs()
            .enqueue(sport, &request, progress_total)
            .await?;
        self.db
            .backfill_jobs()
            .record_event(job.job_id, "queued", "job enqueued", 0, progress_total)
            .await?;
        info!(job_id = %job.job_id, job_type = ?job.job_type, progress_total, "backfill job enqueued");
        Ok(job)
    }

    pub async fn status(&self) -> Result<BackfillStatus, IngestError> {
        let recent = self.db.backfill_jobs().list_recent(10).await?;
        let active_job = recent
            .iter()
            .find(|j| j.status == crate::db::models::BackfillJobStatus::Running)
            .cloned();
        Ok(BackfillStatus {
            active_job,
            recent_jobs: recent,
        })
    }

    /// Spawns the worker loop: a crash-recovery reset pass, then claim →
    /// execute → sleep-when-empty until `shutdown` fires.
    pub fn spawn_worker(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tokio::spawn(async move {
            match self.db.backfill_jobs().reset_running_jobs_on_startup().await {
                Ok(0) => {}
                Ok(n) => warn!(count = n, "reset orphaned running backfill jobs at startup"),
                Err(e) => error!(error = %e, "failed to reset orphaned backfill jobs"),
            }

            loop {
                if *shutdown.borrow() {
                    break;
                }

                if let Err(e) = self.db.backfill_jobs().reap_stuck_jobs(STUCK_JOB_THRESHOLD).await {
                    warn!(error = %e, "failed to reap stuck backfill jobs");
                }

                match self.db.backfill_jobs().claim_next().await {
                    Ok(Some(job)) => {
                        let job_id = job.job_id;
                        match self.execute_job(&job, &shutdown).await {
                            Ok(JobOutcome::Completed) => {
                                let _ = self.db.backfill_jobs().mark_completed(job_id).await;
                                let _ = self
                                    .db
                                    .backfill_jobs()
                                    .record_event(job_id, "completed", "job completed", 0, 0)
                                    .await;
                            }
                            Ok(JobOutcome::Cancelled) => {
                                info!(job_id = %job_id, "backfill job cancelled by shutdown signal");
                            }
                            Err(e) => {
                                error!(job_id = %job_id, error = %e, "backfill job failed");
                                let _ = self
                                    .db
                                    .backfill_jobs()
                                    .mark_failed(job_id, &e.to_string())
                                    .await;
                                let _ = self
                                    .db
                                    .backfill_jobs()
                                    .record_event(job_id, "failed", &e.to_string(), 0, 0)
                                    .await;
                            }
                        }
                    }
                    Ok(None) => {
                        tokio::select! {
                            _ = tokio::time::sleep(EMPTY_QUEUE_POLL_INTERVAL) => {}
                            _ = shutdown.changed() => break,
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "failed to claim next backfill job");
                        tokio::time::sleep(EMPTY_QUEUE_POLL_INTERVAL).await;
                    }
                }
            }
            info!("backfill worker shutting down");
        });
    }

    async fn execute_job(
        &self,
        job: &BackfillJob,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<JobOutcome, IngestError> {
        if job.dry_run {
            self.db
                .backfill_jobs()
                .update_progress(job.job_id, 0, job.progress_total, "Dry-run mode")
                .await?;
            return Ok(JobOutcome::Completed);
        }

        match job.job_type {
            BackfillJobType::Game => self.execute_game_job(job, shutdown).await,
            BackfillJobType::Season | BackfillJobType::DateRange => {
                self.execute_date_job(job, shutdown).await
            }
        }
    }

    /// Writes `status=cancelled` and logs a cancellation event for `job`,
    /// called once a shutdown signal is observed between iterations.
    async fn cancel_job(&self, job: &BackfillJob, current: i32, total: i32) -> Result<(), IngestError> {
        self.db.backfill_jobs().mark_cancelled(job.job_id).await?;
        self.db
            .backfill_jobs()
            .record_event(job.job_id, "cancelled", "job cancelled by shutdown", current, total)
            .await?;
        info!(job_id = %job.job_id, "backfill job observed shutdown, marked cancelled");
        Ok(())
    }

    async fn execute_game_job(
        &self,
        job: &BackfillJob,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<JobOutcome, IngestError> {
        for (i, external_game_id) in job.game_ids.iter().enumerate() {
            if *shutdown.borrow() {
                self.cancel_job(job, i as i32, job.progress_total).await?;
                return Ok(JobOutcome::Cancelled);
            }

            self.ingester
                .ingest_game_by_id(job.sport, job.season_id, external_game_id)
                .await?;

            let current = (i + 1) as i32;
            self.db
                .backfill_jobs()
                .update_progress(
                    job.job_id,
                    current,
                    job.progress_total,
                    &format!("ingested game {external_game_id}"),
                )
                .await?;
            self.db
                .backfill_jobs()
                .record_event(
                    job.job_id,
                    "game",
                    &format!("ingested game {external_game_id}"),
                    current,
                    job.progress_total,
                )
                .await?;
        }
        Ok(JobOutcome::Completed)
    }

    /// Re-detects the season on every date for a date-range job (handles a
    /// regular-season-to-playoffs boundary crossing); a season job already
    /// knows its season id and skips re-detection.
    async fn execute_date_job(
        &self,
        job: &BackfillJob,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<JobOutcome, IngestError> {
        let (start, end, fixed_season_id) = match job.job_type {
            BackfillJobType::Season => {
                let season_id = job
                    .season_id
                    .ok_or_else(|| IngestError::Underspecified)?;
                let season = self
                    .db
                    .seasons()
                    .get_by_id(season_id)
                    .await?
                    .ok_or_else(|| {
                        IngestError::UnknownSeason(format!("no season row for id {season_id}"))
                    })?;
                (season.start_date, season.end_date, Some(season_id))
            }
            BackfillJobType::DateRange => {
                let start = job.start_date.ok_or_else(|| IngestError::Underspecified)?;
                let end = job.end_date.ok_or_else(|| IngestError::Underspecified)?;
                (start, end, None)
            }
            BackfillJobType::Game => unreachable!("handled by execute_game_job"),
        };

        let total_days = day_count(start, end);
        let mut current = 0;
        let mut date = start;
        while date <= end {
            if *shutdown.borrow() {
                self.cancel_job(job, current, total_days).await?;
                return Ok(JobOutcome::Cancelled);
            }

            if fixed_season_id.is_none() {
                // Re-detection failure for one date shouldn't abort the
                // whole range; log and skip that date's games.
                if let Err(e) = self
                    .season_resolver
                    .resolve_for_date(job.sport, date, None)
                    .await
                {
                    warn!(date = %date, error = %e, "could not resolve season for date, skipping");
                    date = date.succ_opt().expect("date within supported range");
                    current += 1;
                    continue;
                }
            }

            let ingested = self.ingester.ingest_games_for_date(job.sport, date).await?;

            current += 1;
            self.db
                .backfill_jobs()
                .update_progress(
                    job.job_id,
                    current,
                    total_days,
                    &format!("ingested {ingested} games for {date}"),
                )
                .await?;
            self.db
                .backfill_jobs()
                .record_event(
                    job.job_id,
                    "date",
                    &format!("ingested {ingested} games for {date}"),
                    current,
                    total_days,
                )
                .await?;

            date = match date.succ_opt() {
                Some(d) => d,
                None => break,
            };
        }

        Ok(JobOutcome::Completed)
    }
}

/// Inclusive day count between two dates, at least 1.
fn day_count(start: NaiveDate, end: NaiveDate) -> i32 {
    ((end - start).num_days() + 1).max(1) as i32
}

/// `"YYYY-YY"` -> `Oct 1 YYYY .. Jul 1 YYYY+1`, the calendar convention a
/// season-year string expands to when a request names a season without an
/// internal `season_id`.
pub fn season_year_to_date_interval(season_year: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (start_year, _) = season_year.split_once('-')?;
    let start_year: i32 = start_year.parse().ok()?;
    let start = NaiveDate::from_ymd_opt(start_year, 10, 1)?;
    let end = NaiveDate::from_ymd_opt(start_year + 1, 7, 1)?;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_count_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(day_count(start, end), 5);
        assert_eq!(day_count(start, start), 1);
    }

    #[test]
    fn season_year_expands_to_oct_jul_interval() {
        let (start, end) = season_year_to_date_interval("2024-25").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }
}
