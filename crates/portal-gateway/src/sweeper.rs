use portal_shortener::LinkService;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Runs [`LinkService::sweep_expired`] every `period` until `shutdown`
/// flips to `true` or its sender is dropped.
pub fn spawn_sweeper(
    links: LinkService,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "expiry sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match links.sweep_expired().await {
                        Ok(expired) => debug!(count = expired.len(), "expiry sweep finished"),
                        Err(e) => warn!(error = %e, kind = %e.kind(), "expiry sweep failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("expiry sweeper stopped");
    })
}
