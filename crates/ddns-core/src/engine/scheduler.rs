//! Fixed-interval pass scheduling
//!
//! The first pass runs immediately so the record is correct right after
//! startup, then one pass runs per interval on a single timeline. A pass is
//! never interrupted: shutdown is only observed between passes.

use super::{ReconcileEvent, Reconciler};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{error, info};

/// Drives [`Reconciler::reconcile_all`] on a fixed interval
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler with the given polling interval
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(engine: &EngineConfig) -> Self {
        Self::new(engine.interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run passes until a pass fails
    ///
    /// Only returns on a fatal pass error.
    pub async fn run(&self, reconciler: &mut Reconciler) -> Result<()> {
        self.run_until(reconciler, std::future::pending()).await
    }

    /// Run passes until `shutdown` resolves or a pass fails
    ///
    /// # Returns
    ///
    /// - `Ok(())`: `shutdown` resolved
    /// - `Err(Error)`: A pass returned a fatal error; no further passes ran
    pub async fn run_until<F>(&self, reconciler: &mut Reconciler, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if self.interval.is_zero() {
            return Err(Error::config("Polling interval must be > 0"));
        }

        let mut interval = tokio::time::interval(self.interval);
        // A slow pass pushes the schedule back instead of causing a burst
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        info!("Scheduler started (interval={:?})", self.interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    reconciler.emit_event(ReconcileEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    return Ok(());
                }

                Some(_) = ticks.next() => {
                    if let Err(e) = reconciler.reconcile_all().await {
                        error!("Reconciliation stopped: {}", e);
                        reconciler.emit_event(ReconcileEvent::Stopped {
                            reason: e.to_string(),
                        });
                        return Err(e);
                    }
                }
            }
        }
    }
}
