// Scheduler engine
//
// Two fixed daily trigger times, evaluated in the configured timezone. The
// dispatch state machine is an explicit value advanced on every tick, not a
// module-level singleton:
//
//   Idle -> Dispatching    when the wall clock reaches the next trigger
//                          (misfires older than the grace period are skipped)
//   Dispatching -> CoolingDown   after exactly one dispatch attempt
//   CoolingDown -> Idle    once the trigger window elapses

use crate::content::ContentScanner;
use crate::ledger::PostRecordRepository;
use crate::models::{ContentItem, DispatchReport};
use crate::publisher::Publisher;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    schedules: Vec<CronSchedule>,
    timezone: Tz,
    pub poll_interval: Duration,
    pub trigger_window: ChronoDuration,
    pub misfire_grace: ChronoDuration,
}

impl SchedulerConfig {
    /// Build from parsed trigger times; one cron schedule per daily time
    pub fn new(
        trigger_times: &[NaiveTime],
        timezone: Tz,
        poll_interval_seconds: u64,
        trigger_window_seconds: u64,
        misfire_grace_seconds: u64,
    ) -> Result<Self, String> {
        let schedules = trigger_times
            .iter()
            .map(|t| {
                let expression = format!("0 {} {} * * *", t.minute(), t.hour());
                CronSchedule::from_str(&expression)
                    .map_err(|e| format!("invalid trigger time {}: {}", t, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if schedules.is_empty() {
            return Err("at least one trigger time is required".to_string());
        }

        Ok(Self {
            schedules,
            timezone,
            poll_interval: Duration::from_secs(poll_interval_seconds),
            trigger_window: ChronoDuration::seconds(trigger_window_seconds as i64),
            misfire_grace: ChronoDuration::seconds(misfire_grace_seconds as i64),
        })
    }

    pub fn from_settings(schedule: &crate::config::ScheduleConfig) -> Result<Self, String> {
        Self::new(
            &schedule.trigger_times()?,
            schedule.tz()?,
            schedule.poll_interval_seconds,
            schedule.trigger_window_seconds,
            schedule.misfire_grace_seconds,
        )
    }

    /// Earliest upcoming trigger strictly after `after`, in UTC
    pub fn next_trigger(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let local = after.with_timezone(&self.timezone);
        self.schedules
            .iter()
            .filter_map(|s| s.after(&local).next())
            .map(|t| t.with_timezone(&Utc))
            .min()
            .expect("daily cron schedules always have a next occurrence")
    }

    /// Advance the state machine by one tick. Pure: the caller owns the
    /// state value and performs the actual dispatch when the machine enters
    /// Dispatching.
    pub fn advance(&self, state: DispatchState, now: DateTime<Utc>) -> DispatchState {
        match state {
            DispatchState::Idle { next_fire } if now >= next_fire => {
                if now - next_fire > self.misfire_grace {
                    warn!(
                        missed_trigger = %next_fire,
                        "Trigger missed beyond grace period, skipping"
                    );
                    DispatchState::Idle {
                        next_fire: self.next_trigger(now),
                    }
                } else {
                    DispatchState::Dispatching { fired_at: now }
                }
            }
            DispatchState::Idle { .. } => state,
            DispatchState::Dispatching { fired_at } => DispatchState::CoolingDown {
                until: fired_at + self.trigger_window,
            },
            DispatchState::CoolingDown { until } if now >= until => DispatchState::Idle {
                next_fire: self.next_trigger(now),
            },
            DispatchState::CoolingDown { .. } => state,
        }
    }
}

/// Dispatch state machine value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Waiting for the next trigger time
    Idle { next_fire: DateTime<Utc> },
    /// A trigger fired; one dispatch is owed
    Dispatching { fired_at: DateTime<Utc> },
    /// Dispatch done; absorbing further ticks inside the trigger window
    CoolingDown { until: DateTime<Utc> },
}

/// Scheduler trait for the dispatch loop
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Run the polling loop until a shutdown signal arrives
    async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Stop the loop gracefully
    async fn stop(&self);

    /// Perform exactly one dispatch: scan, select, publish, finalize
    async fn dispatch_once(
        &self,
    ) -> Result<Option<DispatchReport>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Main scheduler engine implementation
pub struct SchedulerEngine {
    config: SchedulerConfig,
    scanner: ContentScanner,
    publisher: Publisher,
    ledger: Arc<PostRecordRepository>,
    allow_empty_description: bool,
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

impl SchedulerEngine {
    pub fn new(
        config: SchedulerConfig,
        scanner: ContentScanner,
        publisher: Publisher,
        ledger: Arc<PostRecordRepository>,
        allow_empty_description: bool,
    ) -> Self {
        let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            scanner,
            publisher,
            ledger,
            allow_empty_description,
            shutdown_tx,
        }
    }

    pub fn shutdown_receiver(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// First item in scan order that is ready and still has an enabled
    /// target without a settled record
    async fn select_candidate(
        &self,
        items: &[ContentItem],
    ) -> Result<Option<ContentItem>, crate::errors::LedgerError> {
        let targets = self.publisher.enabled_targets();

        for item in items {
            if !item.is_ready(self.allow_empty_description) {
                debug!(
                    folder_id = %item.folder_id,
                    "Item not ready: empty description and policy disallows it"
                );
                continue;
            }

            let settled = self.ledger.settled_targets(&item.folder_id).await?;
            if targets.iter().any(|t| !settled.contains(t)) {
                return Ok(Some(item.clone()));
            }
            debug!(folder_id = %item.folder_id, "All enabled surfaces settled, skipping");
        }

        Ok(None)
    }

    /// Scan only: report candidates and readiness, write nothing
    #[instrument(skip(self))]
    pub async fn dry_run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let items = self.scanner.scan().await?;
        for item in &items {
            let settled = self.ledger.settled_targets(&item.folder_id).await?;
            info!(
                folder_id = %item.folder_id,
                title = %item.title,
                duration_seconds = item.duration_seconds,
                ready = item.is_ready(self.allow_empty_description),
                settled_surfaces = settled.len(),
                "Candidate"
            );
        }
        info!(candidate_count = items.len(), "Dry run complete");
        Ok(())
    }
}

#[async_trait]
impl Scheduler for SchedulerEngine {
    #[instrument(skip(self))]
    async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = DispatchState::Idle {
            next_fire: self.config.next_trigger(Utc::now()),
        };
        if let DispatchState::Idle { next_fire } = state {
            info!(next_fire = %next_fire, "Scheduler started, waiting for next trigger");
        }

        let mut poll = interval(self.config.poll_interval);
        let mut shutdown_rx = self.shutdown_receiver();

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    let now = Utc::now();
                    let next = self.config.advance(state, now);
                    if next != state {
                        debug!(state = ?next, "Scheduler state changed");
                    }
                    state = next;

                    if let DispatchState::Dispatching { .. } = state {
                        info!("Trigger fired, dispatching");
                        match self.dispatch_once().await {
                            Ok(Some(report)) => {
                                info!(
                                    folder_id = %report.folder_id,
                                    outcome_count = report.outcomes.len(),
                                    "Dispatch complete"
                                );
                            }
                            Ok(None) => {
                                info!("No pending candidates, nothing dispatched");
                            }
                            Err(e) => {
                                error!(error = %e, "Dispatch failed");
                            }
                        }
                        // One attempt per window, success or failure
                        state = self.config.advance(state, Utc::now());
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    #[instrument(skip(self))]
    async fn dispatch_once(
        &self,
    ) -> Result<Option<DispatchReport>, Box<dyn std::error::Error + Send + Sync>> {
        let dispatch_id = Uuid::new_v4();
        info!(dispatch_id = %dispatch_id, "Dispatch started");

        let items = self.scanner.scan().await?;
        let Some(item) = self.select_candidate(&items).await? else {
            info!(dispatch_id = %dispatch_id, "No unposted ready candidates");
            return Ok(None);
        };

        info!(
            dispatch_id = %dispatch_id,
            folder_id = %item.folder_id,
            title = %item.title,
            duration_seconds = item.duration_seconds,
            "Selected candidate"
        );

        let report = self.publisher.dispatch(&item).await?;
        for (target, status) in &report.outcomes {
            info!(dispatch_id = %dispatch_id, target = %target, status = %status, "Outcome");
        }

        self.publisher.finalize(&item, &report).await;
        Ok(Some(report))
    }
}
