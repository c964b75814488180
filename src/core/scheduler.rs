//! Periodic global simplification.

use crate::core::services::LedgerService;
use crate::core::simplifier::SimplifyScope;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use crate::settlement::dispatcher::stop_requested;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

pub struct SimplifyScheduler<L: LoggingService, S: Storage> {
    service: Arc<LedgerService<L, S>>,
    period: Duration,
}

impl<L, S> SimplifyScheduler<L, S>
where
    L: LoggingService + 'static,
    S: Storage + 'static,
{
    pub fn new(service: Arc<LedgerService<L, S>>, period: Duration) -> Self {
        Self { service, period }
    }

    /// Runs a global simplification every period until shutdown is signalled.
    /// The first run happens one full period after start.
    pub fn start(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let service = self.service.clone();
        let period = self.period;

        tokio::spawn(async move {
            info!(period_secs = period.as_secs(), "simplify scheduler started");
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = service.simplify(SimplifyScope::Global).await {
                            error!(error = %e, "periodic simplification failed");
                        }
                    }
                    _ = stop_requested(&mut shutdown) => break,
                }
            }
            info!("simplify scheduler stopped");
        })
    }
}
