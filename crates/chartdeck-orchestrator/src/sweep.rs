//! Background removal of orphaned projects.

use chartdeck_core::SweepConfig;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::orchestrator::Orchestrator;

impl Orchestrator {
    /// Run [`sweep_orphans`](Self::sweep_orphans) every `config.interval`
    /// until `shutdown` fires.
    pub async fn run_sweeper(&self, config: SweepConfig, mut shutdown: watch::Receiver<bool>) {
        if !config.enabled {
            info!("orphan sweep disabled");
            return;
        }
        info!(
            interval_secs = config.interval.as_secs(),
            max_age_secs = config.max_age.as_secs(),
            "orphan sweeper started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(config.interval) => {
                    if let Err(e) = self.sweep_orphans(config.max_age).await {
                        warn!(error = %e, "orphan sweep failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("orphan sweeper shutting down");
                    break;
                }
            }
        }
    }
}
