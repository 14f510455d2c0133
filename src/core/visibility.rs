//! Host signals for whether the consumer is currently shown.

use crate::core::watcher::FileWatcher;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

pub trait VisibilitySignal: Send + Sync {
    fn is_hidden(&self) -> bool;
    fn subscribe(&self) -> watch::Receiver<bool>;
}

#[derive(Clone)]
pub struct SharedVisibility {
    tx: Arc<watch::Sender<bool>>,
}

impl SharedVisibility {
    pub fn new(hidden: bool) -> Self {
        let (tx, _rx) = watch::channel(hidden);
        Self { tx: Arc::new(tx) }
    }

    pub fn visible() -> Self {
        Self::new(false)
    }

    /// Publishes only actual transitions.
    pub fn set_hidden(&self, hidden: bool) {
        self.tx.send_if_modified(|current| {
            if *current == hidden {
                return false;
            }
            *current = hidden;
            true
        });
    }
}

impl VisibilitySignal for SharedVisibility {
    fn is_hidden(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Hidden while a marker file exists, e.g. `touch ~/.cache/smart-refresh/paused`.
pub struct PauseFileVisibility {
    shared: SharedVisibility,
    _watcher: FileWatcher,
}

impl PauseFileVisibility {
    pub fn start(path: PathBuf) -> Result<Self> {
        let shared = SharedVisibility::new(path.exists());
        let (watcher, mut change_rx) = FileWatcher::start(&path)?;

        let signal = shared.clone();
        tokio::spawn(async move {
            while change_rx.recv().await.is_some() {
                let hidden = path.exists();
                tracing::info!(hidden, "Pause marker changed");
                signal.set_hidden(hidden);
            }
        });

        Ok(Self {
            shared,
            _watcher: watcher,
        })
    }
}

impl VisibilitySignal for PauseFileVisibility {
    fn is_hidden(&self) -> bool {
        self.shared.is_hidden()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.subscribe()
    }
}
