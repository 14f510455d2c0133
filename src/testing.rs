//! Fakes shared by unit tests.

use crate::api::Fetcher;
use crate::core::notifications::{NotificationSink, Severity};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted answer: the value (or error message) and how long it takes.
pub struct Step<T> {
    pub result: Result<T, String>,
    pub delay: Duration,
}

/// Fetcher that replays a script, repeating the last step once exhausted.
pub struct ScriptedFetcher<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    last: Mutex<Option<Result<T, String>>>,
    calls: Arc<AtomicUsize>,
}

impl<T: Clone> ScriptedFetcher<T> {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ok(self, value: T) -> Self {
        self.push(Ok(value), Duration::ZERO)
    }

    pub fn err(self, message: &str) -> Self {
        self.push(Err(message.to_string()), Duration::ZERO)
    }

    pub fn slow_ok(self, value: T, delay: Duration) -> Self {
        self.push(Ok(value), delay)
    }

    fn push(self, result: Result<T, String>, delay: Duration) -> Self {
        self.steps
            .lock()
            .unwrap()
            .push_back(Step { result, delay });
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl<T> Fetcher<T> for ScriptedFetcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn fetch(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (result, delay) = {
            let next = self.steps.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(step) => {
                    *last = Some(step.result.clone());
                    (step.result, step.delay)
                }
                None => (
                    last.clone().unwrap_or_else(|| Err("script exhausted".to_string())),
                    Duration::ZERO,
                ),
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result.map_err(|message| anyhow::anyhow!(message))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}
