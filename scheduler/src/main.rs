// Reel posting service entry point
//
// Modes:
//   scheduler             continuous: wake at the two configured daily times
//   scheduler --dry-run   scan and report candidates, post nothing
//   scheduler --run-now   one immediate dispatch, then exit

use anyhow::Context;
use common::config::Settings;
use common::content::ContentScanner;
use common::ledger::{LedgerPool, PostRecordRepository};
use common::media::StaticMediaHost;
use common::meta::MetaClient;
use common::probe::FfprobeDurationProbe;
use common::publisher::Publisher;
use common::scheduler::{Scheduler, SchedulerConfig, SchedulerEngine};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

enum Mode {
    Run,
    DryRun,
    RunNow,
}

fn parse_mode() -> Result<Mode, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => Ok(Mode::Run),
        Some("--dry-run") => Ok(Mode::DryRun),
        Some("--run-now") => Ok(Mode::RunNow),
        Some(other) => Err(format!(
            "unknown argument '{}' (expected --dry-run or --run-now)",
            other
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scheduler=info,common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reel posting service");

    let mode = parse_mode().map_err(|e| anyhow::anyhow!(e))?;

    let settings = Settings::load().context("failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("configuration invalid: {}", e))?;

    info!(
        input_dir = %settings.folders.input_dir.display(),
        processed_dir = %settings.folders.processed_dir.display(),
        database = %settings.database.path.display(),
        ig_enabled = settings.platforms.ig_enabled,
        fb_enabled = settings.platforms.fb_enabled,
        schedule_1 = %settings.schedule.time_1,
        schedule_2 = %settings.schedule.time_2,
        timezone = %settings.schedule.timezone,
        "Configuration loaded"
    );

    let ledger_pool = LedgerPool::new(&settings.database)
        .await
        .context("failed to initialize ledger")?;
    let ledger = Arc::new(PostRecordRepository::new(ledger_pool.clone()));

    let meta = Arc::new(
        MetaClient::connect(&settings.meta)
            .await
            .context("failed to initialize Meta client")?,
    );
    let media = Arc::new(StaticMediaHost::new(&settings.media));

    let scanner = ContentScanner::new(
        settings.folders.input_dir.clone(),
        Arc::new(FfprobeDurationProbe),
    );
    let publisher = Publisher::new(
        meta,
        media,
        ledger.clone(),
        settings.platforms.clone(),
        &settings.folders,
    );

    let scheduler_config = SchedulerConfig::from_settings(&settings.schedule)
        .map_err(|e| anyhow::anyhow!("schedule invalid: {}", e))?;
    let engine = Arc::new(SchedulerEngine::new(
        scheduler_config,
        scanner,
        publisher,
        ledger,
        settings.content.allow_empty_description,
    ));

    match mode {
        Mode::DryRun => {
            info!("Dry run: scanning only, nothing will be posted");
            engine
                .dry_run()
                .await
                .map_err(|e| anyhow::anyhow!("dry run failed: {}", e))?;
        }
        Mode::RunNow => {
            info!("Run-now: dispatching immediately");
            engine
                .dispatch_once()
                .await
                .map_err(|e| anyhow::anyhow!("dispatch failed: {}", e))?;
            info!("Run-now complete");
        }
        Mode::Run => {
            let engine_for_shutdown = engine.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for shutdown signal");
                    return;
                }
                info!("Received shutdown signal");
                engine_for_shutdown.stop().await;
            });

            engine
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("scheduler error: {}", e))?;
        }
    }

    ledger_pool.close().await;
    Ok(())
}
