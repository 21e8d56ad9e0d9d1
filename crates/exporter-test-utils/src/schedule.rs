//! Sweep schedules that make the poller loop deterministic.

use ado_exporter::tasks::SweepSchedule;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lets the poller run a fixed number of sweeps, then cancels it.
///
/// Waits return immediately until the last one, which cancels the token and
/// never completes, so the poller observes the cancellation.
pub struct ScriptedSchedule {
    sweeps: usize,
    waits: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl ScriptedSchedule {
    /// Allow `sweeps` sweeps (at least one always runs).
    pub fn sweeps(sweeps: usize, cancel: CancellationToken) -> Self {
        Self {
            sweeps,
            waits: Arc::new(AtomicUsize::new(0)),
            cancel,
        }
    }

    /// Shared counter of waits observed, readable after the schedule is moved.
    pub fn wait_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.waits)
    }
}

#[async_trait::async_trait]
impl SweepSchedule for ScriptedSchedule {
    async fn wait(&mut self) {
        let done = self.waits.fetch_add(1, Ordering::SeqCst) + 1;
        if done >= self.sweeps {
            self.cancel.cancel();
            std::future::pending::<()>().await;
        }
    }
}
