//! Sources of the signed-in user a refresh session is bound to.

use crate::core::models::{Identity, UserRole};
use crate::core::watcher::FileWatcher;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Identity>;
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// In-process identity, switched explicitly by the embedding application.
#[derive(Clone)]
pub struct SharedIdentity {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl SharedIdentity {
    pub fn new(initial: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn signed_out() -> Self {
        Self::new(None)
    }

    pub fn sign_in(&self, identity: Identity) {
        self.tx.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}

impl IdentityProvider for SharedIdentity {
    fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

#[derive(Debug, Deserialize)]
struct SessionFile {
    access_token: String,
    #[allow(dead_code)]
    token_type: Option<String>,
    user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    id: String,
    name: Option<String>,
    role: Option<UserRole>,
}

/// Identity read from the login token file written by the web client.
///
/// A missing or unreadable file means nobody is signed in. The file is
/// re-read whenever it changes on disk.
pub struct SessionFileIdentity {
    shared: SharedIdentity,
    _watcher: FileWatcher,
}

impl SessionFileIdentity {
    pub fn start(path: PathBuf) -> Result<Self> {
        let shared = SharedIdentity::new(read_session_file(&path));
        let (watcher, mut change_rx) = FileWatcher::start(&path)?;

        let tx = shared.tx.clone();
        tokio::spawn(async move {
            while change_rx.recv().await.is_some() {
                let identity = read_session_file(&path);
                let changed = tx.send_if_modified(|current| {
                    if *current == identity {
                        return false;
                    }
                    *current = identity.clone();
                    true
                });
                if changed {
                    tracing::info!(
                        user = identity.as_ref().map(|i| i.key.as_str()),
                        "Session identity changed"
                    );
                }
            }
        });

        Ok(Self {
            shared,
            _watcher: watcher,
        })
    }
}

impl IdentityProvider for SessionFileIdentity {
    fn current(&self) -> Option<Identity> {
        self.shared.current()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.shared.subscribe()
    }
}

/// Identity stored in a session file, or `None` when absent or unreadable.
pub fn read_session_file(path: &Path) -> Option<Identity> {
    if !path.exists() {
        return None;
    }

    match load_session(path) {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable session file");
            None
        }
    }
}

fn load_session(path: &Path) -> Result<Identity> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file: {}", path.display()))?;
    let session: SessionFile =
        serde_json::from_str(&content).context("Failed to parse session file")?;

    Ok(Identity {
        key: session.user.id,
        name: session.user.name,
        role: session.user.role,
        access_token: Some(session.access_token),
    })
}
