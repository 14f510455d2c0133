use anyhow::Result;
use notify_rust::Notification;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "smart-refresh";
const DISPLAY_MS: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "Success",
            Severity::Info => "Info",
            Severity::Error => "Error",
        }
    }
}

/// Fire-and-forget sink for transient user-facing messages.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// Writes messages to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!(%message, "Notification"),
            Severity::Success | Severity::Info => {
                tracing::info!(severity = severity.label(), %message, "Notification")
            }
        }
    }
}

/// Shows messages as desktop notifications, falling back to the log when the
/// notification daemon is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn show(severity: Severity, message: &str) -> Result<()> {
        Notification::new()
            .summary(&format!("Marketplace {}", severity.label()))
            .body(message)
            .appname(APP_NAME)
            .timeout(notify_rust::Timeout::Milliseconds(DISPLAY_MS))
            .show()?;

        Ok(())
    }

    fn deliver(severity: Severity, message: &str) {
        if let Err(e) = Self::show(severity, message) {
            tracing::warn!(error = %e, "Failed to show desktop notification");
            LogNotifier.notify(severity, message);
            return;
        }

        tracing::debug!(severity = severity.label(), %message, "Sent desktop notification");
    }
}

impl NotificationSink for DesktopNotifier {
    /// The D-Bus call blocks; inside a runtime it runs on the blocking pool.
    fn notify(&self, severity: Severity, message: &str) {
        let message = message.to_string();
        off_runtime(move || Self::deliver(severity, &message));
    }
}

/// Runs `job` on the blocking pool when called from a runtime, inline
/// otherwise.
fn off_runtime(job: impl FnOnce() + Send + 'static) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(job);
        }
        Err(_) => job(),
    }
}
