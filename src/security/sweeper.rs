//! Periodic cleanup of expired gateway state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::security::gateway::SecurityGateway;

pub struct Sweeper {
    gateway: Arc<SecurityGateway>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(gateway: Arc<SecurityGateway>, interval: Duration) -> Self {
        Self { gateway, interval }
    }

    /// Run on the current runtime until `shutdown` fires.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sweeper starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing to sweep yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.gateway.sweep();
                    if report.rate_limit_entries > 0 || report.csrf_tokens > 0 {
                        tracing::debug!(
                            rate_limit_entries = report.rate_limit_entries,
                            csrf_tokens = report.csrf_tokens,
                            "Sweep removed expired entries"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
