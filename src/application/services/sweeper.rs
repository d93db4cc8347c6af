//! Background task that reclaims lapsed reservation holds.
//!
//! Runs in a tokio::spawn loop, periodically flipping unconfirmed holds
//! whose review deadline has passed to `Expired`. Expiry is a bookkeeping
//! pass, not a capacity event: availability math already ignores lapsed
//! holds, so nothing depends on how promptly the sweeper runs. The booking
//! calendar is never touched here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Duration;
use tracing::{info, warn};

use crate::domain::{DomainResult, RepositoryProvider, ReservationRepository};
use crate::shared::shutdown::ShutdownSignal;

/// Start the expiry sweeper background task.
///
/// Every `check_interval_secs` the task expires overdue holds in one bulk
/// update. A failed pass is logged and simply retried on the next tick;
/// missed work is picked up then because the deadline filter is absolute.
pub fn start_expiry_sweeper_task(
    repos: Arc<dyn RepositoryProvider>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "📅 Expiry sweeper task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = run_sweep_once(&repos, Utc::now()).await {
                        warn!(error = %e, "Expiry sweep error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("📅 Expiry sweeper task shutting down");
                    break;
                }
            }
        }

        info!("📅 Expiry sweeper task stopped");
    });
}

/// One sweep pass at `reference_time`. Returns how many holds were expired.
///
/// Idempotent: flipped rows fall out of the filter, so overlapping or
/// repeated passes never double-count.
pub async fn run_sweep_once(
    repos: &Arc<dyn RepositoryProvider>,
    reference_time: DateTime<Utc>,
) -> DomainResult<u64> {
    let expired = repos.reservations().sweep_expired(reference_time).await?;

    if expired > 0 {
        metrics::counter!("allocation_holds_expired_total").increment(expired);
        info!(count = expired, "Expired overdue reservation holds");
    }

    Ok(expired)
}

// ── Tests ──────────────────────────────────────────────────────
