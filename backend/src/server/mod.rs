//! Server wiring helpers shared by `main` and the integration tests.

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::ports::IdempotencyStore;

/// How often the reaper sweeps expired idempotency records.
pub const REAPER_PERIOD: Duration = Duration::from_secs(24 * 3600);

/// Spawn the periodic idempotency-record reaper.
///
/// Deletes durable records older than `retention` every `period`. Purely
/// advisory housekeeping: failures are logged and the next tick tries
/// again, and nothing on the hot path ever waits for it.
pub fn spawn_reaper(
    store: Arc<dyn IdempotencyStore>,
    retention: Duration,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately; that is fine, startup is a good
        // time to sweep.
        loop {
            ticker.tick().await;
            let cutoff = Utc::now()
                - chrono::Duration::from_std(retention)
                    .unwrap_or_else(|_| chrono::Duration::days(30));
            match store.delete_older_than(cutoff).await {
                Ok(deleted) if deleted > 0 => {
                    info!(deleted, %cutoff, "reaped expired idempotency records");
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%error, "idempotency reaper sweep failed; will retry next period");
                }
            }
        }
    })
}
