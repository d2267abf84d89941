use std::sync::{Arc, Mutex};
use std::time::Duration;

use exam_core::model::Transition;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::controller::SessionController;

/// Controller shared between the countdown task and the host.
pub type SharedController = Arc<Mutex<SessionController>>;

/// Cadence of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownConfig {
    period: Duration,
}

impl CountdownConfig {
    /// # Panics
    ///
    /// Panics if `period` is zero.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        assert!(!period.is_zero(), "countdown period must be non-zero");
        Self { period }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
        }
    }
}

/// Why the countdown task stopped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStop {
    /// The countdown reached zero and completed the session.
    Expired,
    /// The session had already ended some other way.
    SessionEnded,
    /// The controller lock was poisoned.
    Poisoned,
}

/// Recurring one-tick-per-period task driving `SessionController::tick`.
pub struct Countdown;

impl Countdown {
    /// Spawn the countdown on the current tokio runtime.
    ///
    /// The first tick fires one full period after spawning.
    #[must_use]
    pub fn spawn(controller: SharedController, config: CountdownConfig) -> CountdownHandle {
        let task = tokio::spawn(run(controller, config.period()));
        CountdownHandle { task: Some(task) }
    }
}

async fn run(controller: SharedController, period: Duration) -> CountdownStop {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let result = match controller.lock() {
            Ok(mut controller) => controller.tick(),
            Err(_) => {
                warn!("session lock poisoned; stopping countdown");
                return CountdownStop::Poisoned;
            }
        };
        match result {
            Ok(Transition::Continued) => {}
            Ok(Transition::Ended(_)) => return CountdownStop::Expired,
            Err(_) => {
                debug!("session already ended; stopping countdown");
                return CountdownStop::SessionEnded;
            }
        }
    }
}

/// Owning handle to a running countdown.
///
/// Dropping the handle cancels the task, so a torn-down host never leaves a
/// tick callback behind.
#[derive(Debug)]
pub struct CountdownHandle {
    task: Option<JoinHandle<CountdownStop>>,
}

impl CountdownHandle {
    /// Stop delivering ticks. Safe to call more than once.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the task to end. Returns `None` if it was cancelled.
    pub async fn join(mut self) -> Option<CountdownStop> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
