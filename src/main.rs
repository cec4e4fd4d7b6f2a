use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

mod backfill;
mod clients;
mod config;
mod db;
mod error;
mod ingest;
mod parsing;
mod publish;
mod reconcile;
mod resolve;
mod sport;

use backfill::BackfillService;
use clients::{FastClient, PrimaryClient};
use config::{Command, Config};
use db::models::BackfillRequest;
use db::Database;
use ingest::{LiveIngester, LiveIngesterConfig};
use publish::Publisher;
use reconcile::ReconciliationMetrics;
use resolve::TeamPlayerResolver;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::connect(&config.database_url).await?;
    info!("database connected and schema applied");

    if let Some(season_year) = &config.current_season {
        seed_current_season(&db, config.sport, season_year).await?;
    }

    let resolver = Arc::new(TeamPlayerResolver::new(db.clone()));
    let metrics = Arc::new(ReconciliationMetrics::default());
    let primary = PrimaryClient::new(config.primary_base_url.clone());
    let fast = FastClient::new(config.fast_base_url.clone());
    let publisher = Publisher::connect(&config.redis_url).await?;

    let ingester = Arc::new(LiveIngester::new(
        db.clone(),
        primary,
        fast,
        resolver,
        metrics,
        publisher,
        LiveIngesterConfig {
            sport: config.sport,
            live_poll_interval: config.live_poll_interval(),
            daily_ingestion_hour: config.daily_ingestion_hour,
            strategy: config.reconciliation_strategy.into(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        },
    ));

    let backfill_service = Arc::new(BackfillService::new(db.clone(), ingester.clone()));

    if let Some(Command::Backfill {
        season,
        start,
        end,
        game_ids,
        dry_run,
    }) = config.command.clone()
    {
        let request =
            build_backfill_request(&db, config.sport, season, start, end, game_ids, dry_run).await?;
        let job = backfill_service.enqueue(config.sport, request).await?;
        info!(job_id = %job.job_id, "backfill job enqueued, exiting");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if config.enable_live_polling {
        ingester.clone().spawn_live_poll_loop(shutdown_rx.clone());
    }

    if config.enable_daily_ingestion {
        let daily_ingester = ingester.clone();
        let daily_backfill = backfill_service.clone();
        ingester
            .clone()
            .spawn_daily_backfill_hook(shutdown_rx.clone(), move || {
                let ingester = daily_ingester.clone();
                let backfill_service = daily_backfill.clone();
                tokio::spawn(async move {
                    let sport = ingester.sport();
                    let yesterday = chrono::Utc::now().date_naive() - chrono::Duration::days(1);
                    let request = BackfillRequest {
                        sport: Some(sport),
                        start_date: Some(yesterday),
                        end_date: Some(yesterday),
                        ..Default::default()
                    };
                    match backfill_service.enqueue(sport, request).await {
                        Ok(job) => {
                            info!(job_id = %job.job_id, "daily backfill hook enqueued yesterday's games")
                        }
                        Err(e) => error!(error = %e, "daily backfill hook failed to enqueue"),
                    }
                })
            });
    }

    backfill_service.clone().spawn_worker(shutdown_rx.clone());

    info!("hoopscore-core running; press ctrl-c to shut down");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    // Give spawned tasks a moment to observe the shutdown signal and finish
    // their in-flight work before the process exits.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    Ok(())
}

/// Seeds (or refreshes) the `current_season` row the resolver should prefer
/// before falling back to date-interval matching, expanding the "YYYY-YY"
/// config value into a regular-season date window.
async fn seed_current_season(db: &Database, sport: sport::Sport, season_year: &str) -> Result<()> {
    let (start, end) = backfill::season_year_to_date_interval(season_year)
        .ok_or_else(|| anyhow::anyhow!("current_season must look like \"YYYY-YY\""))?;
    db.seasons()
        .upsert(sport, season_year, db::models::SeasonType::Regular, start, end)
        .await?;
    info!(season_year, "seeded current season");
    Ok(())
}

/// Builds a `BackfillRequest` from the CLI subcommand's arguments, resolving
/// a `--season` string to its surrogate `season_id` first since the request
/// itself only carries the internal key.
async fn build_backfill_request(
    db: &Database,
    sport: sport::Sport,
    season: Option<String>,
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
    game_ids: Vec<String>,
    dry_run: bool,
) -> Result<BackfillRequest> {
    let mut request = BackfillRequest {
        sport: Some(sport),
        dry_run,
        game_ids,
        ..Default::default()
    };

    if let Some(season_year) = season {
        let resolver = resolve::SeasonResolver::new(db.clone());
        let season_row = resolver.resolve_for_season_year(sport, &season_year).await?;
        request.season_id = Some(season_row.id);
    } else if let (Some(start), Some(end)) = (start, end) {
        request.start_date = Some(start);
        request.end_date = Some(end);
    } else if request.game_ids.is_empty() {
        anyhow::bail!("backfill requires --season, --start/--end, or one or more --game ids");
    }

    Ok(request)
}
