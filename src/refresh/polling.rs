use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Owner of the one recurring timer a session may have.
///
/// Each `start` is tagged with a run id; ticks carry it so a tick that races
/// a `stop` can be recognised and ignored by the receiver.
#[derive(Debug, Default)]
pub struct PollingHandle {
    task: Option<JoinHandle<()>>,
    run_id: u64,
}

impl PollingHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Id of the current run, if the timer is running.
    pub fn current_run(&self) -> Option<u64> {
        self.is_running().then_some(self.run_id)
    }

    /// Starts ticking every `period`, first tick one period from now.
    ///
    /// `on_tick` returns `false` to end the timer. No-op when already running.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F) -> bool
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        if self.is_running() {
            return false;
        }

        self.run_id = self.run_id.wrapping_add(1);
        let run_id = self.run_id;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                tracing::debug!(run_id, "Polling tick");
                if !on_tick(run_id) {
                    break;
                }
            }
        }));

        tracing::debug!(run_id, period_ms = period.as_millis() as u64, "Polling started");
        true
    }

    /// Releases the timer. No-op when not running.
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.abort();
        tracing::debug!(run_id = self.run_id, "Polling stopped");
        true
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
