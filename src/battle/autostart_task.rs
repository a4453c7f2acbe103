use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument};

use super::service::BattleService;

/// Configuration for the auto-start task
#[derive(Debug, Clone)]
pub struct AutoStartConfig {
    /// How often to scan for eligible battles
    pub poll_interval: Duration,
}

impl Default for AutoStartConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// Starts the background task that force-starts full lobbies whose grace
/// period has elapsed.
///
/// This replaces the cron-triggered HTTP self-call of a typical web stack:
/// the scheduler invokes the battle service directly in-process, so there
/// is no network round-trip to fail. Failures are logged and the loop
/// keeps running; the scan itself is idempotent.
#[instrument(skip(battle_service))]
pub async fn start_auto_start_task(battle_service: Arc<BattleService>, config: AutoStartConfig) {
    info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting battle auto-start background task"
    );

    let mut poll_interval = interval(config.poll_interval);

    loop {
        poll_interval.tick().await;

        match battle_service.auto_start().await {
            Ok(0) => {}
            Ok(started) => {
                info!(started = started, "Auto-start pass completed");
            }
            Err(e) => {
                error!(error = %e, "Auto-start pass failed");
            }
        }
    }
}
