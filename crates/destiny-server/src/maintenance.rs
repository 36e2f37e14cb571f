//! Daily housekeeping: expire old image buckets and stale usage records.

use std::time::Duration;

use destiny_images::CleanupReport;
use destiny_metrics::{
    ERROR_IMAGE_STORE, ERROR_USAGE_STORE, record_cleanup, record_error, record_usage_swept,
    set_maintenance_last_run,
};
use destiny_usage::{SweepReport, UsageError};
use time::Date;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Result of one maintenance pass.
#[derive(Debug)]
pub struct MaintenanceReport {
    pub images: CleanupReport,
    pub usage: Result<SweepReport, UsageError>,
}

/// Run image cleanup and the usage sweep once.
pub async fn run_maintenance(state: &AppState) -> MaintenanceReport {
    let images = state.images.cleanup(state.retention_days).await;
    record_cleanup(
        images.buckets_removed as u64,
        images.files_removed as u64,
        images.failed.len() as u64,
    );
    if !images.is_complete() {
        record_error(ERROR_IMAGE_STORE);
        warn!(
            failed = images.failed.len(),
            scan_error = images.scan_error.as_deref().unwrap_or(""),
            "image cleanup incomplete"
        );
    }

    let usage = state.limiter.sweep_expired().await;
    match &usage {
        Ok(report) => record_usage_swept(report.removed as u64),
        Err(e) => {
            record_error(ERROR_USAGE_STORE);
            warn!(error = %e, "usage sweep failed");
        }
    }

    set_maintenance_last_run(state.clock.now().unix_timestamp());
    info!(
        retention_days = state.retention_days,
        buckets_removed = images.buckets_removed,
        files_removed = images.files_removed,
        usage_removed = usage.as_ref().map_or(0, |r| r.removed),
        "maintenance complete"
    );
    MaintenanceReport { images, usage }
}

/// Spawn the maintenance loop.
///
/// Runs once immediately, then checks every `check_interval` and runs again
/// whenever the calendar day has changed. Stops when `shutdown` is cancelled.
pub fn spawn_maintenance(
    state: AppState,
    check_interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_day: Date = state.clock.today();
        run_maintenance(&state).await;

        let mut ticker = tokio::time::interval(check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("maintenance task shutting down");
                    return;
                }

                _ = ticker.tick() => {
                    let today = state.clock.today();
                    if today != last_day {
                        info!(%today, "calendar day changed, running maintenance");
                        last_day = today;
                        run_maintenance(&state).await;
                    }
                }
            }
        }
    })
}
