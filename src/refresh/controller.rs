use crate::api::Fetcher;
use crate::core::change::has_changed;
use crate::core::error::RefreshError;
use crate::core::identity::IdentityProvider;
use crate::core::models::{Identity, RefreshState};
use crate::core::notifications::{NotificationSink, Severity};
use crate::core::visibility::VisibilitySignal;
use crate::refresh::polling::PollingHandle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

pub type ChangeCallback<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;
pub type LoadCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Everything a session is started with. Re-initializing is the only way to
/// change the fetcher, interval or callback.
pub struct RefreshConfig<T> {
    pub fetcher: Arc<dyn Fetcher<T>>,
    pub interval: Duration,
    /// Called as `(new, previous)` when a fetched payload differs from the
    /// cached one. Never called for the first payload of a session.
    pub on_change: Option<ChangeCallback<T>>,
    /// Called with the first payload of every session, including sessions
    /// restarted by an identity change.
    pub on_load: Option<LoadCallback<T>>,
    /// No recurring timer; updates come from `refresh` or visibility changes.
    pub silent: bool,
}

impl<T> RefreshConfig<T> {
    pub fn new(fetcher: impl Fetcher<T> + 'static) -> Self {
        Self::from_arc(Arc::new(fetcher))
    }

    pub fn from_arc(fetcher: Arc<dyn Fetcher<T>>) -> Self {
        Self {
            fetcher,
            interval: DEFAULT_INTERVAL,
            on_change: None,
            on_load: None,
            silent: false,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            tracing::warn!(
                default_ms = DEFAULT_INTERVAL.as_millis() as u64,
                "Ignoring zero polling interval"
            );
            return self;
        }
        self.interval = interval;
        self
    }

    pub fn on_change(mut self, callback: impl Fn(&T, &T) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(callback));
        self
    }

    pub fn on_load(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Arc::new(callback));
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

impl<T> Clone for RefreshConfig<T> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            interval: self.interval,
            on_change: self.on_change.clone(),
            on_load: self.on_load.clone(),
            silent: self.silent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Initial,
    Background,
    Manual,
}

/// What a consumer renders from.
#[derive(Debug)]
pub struct RefreshSnapshot<T> {
    pub data: Option<Arc<T>>,
    pub loading: bool,
    pub is_refreshing: bool,
    pub error: Option<RefreshError>,
    pub state: RefreshState,
    pub last_updated: Option<DateTime<Utc>>,
    pub polling: bool,
}

struct Session<T> {
    config: Option<RefreshConfig<T>>,
    identity: Option<Identity>,
    /// Bumped on every (re)initialize and teardown; results from an older
    /// epoch are dropped.
    epoch: u64,
    next_token: u64,
    in_flight: HashMap<u64, FetchKind>,
    data: Option<Arc<T>>,
    last_error: Option<RefreshError>,
    last_updated: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    outcome: RefreshState,
    polling: PollingHandle,
}

impl<T> Session<T> {
    fn new() -> Self {
        Self {
            config: None,
            identity: None,
            epoch: 0,
            next_token: 0,
            in_flight: HashMap::new(),
            data: None,
            last_error: None,
            last_updated: None,
            consecutive_failures: 0,
            outcome: RefreshState::Idle,
            polling: PollingHandle::new(),
        }
    }

    fn is_active(&self) -> bool {
        self.config.is_some() && self.identity.is_some() && self.outcome != RefreshState::Stopped
    }

    fn is_silent(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.silent)
    }

    fn loading(&self) -> bool {
        self.in_flight.values().any(|k| *k == FetchKind::Initial)
    }

    fn is_refreshing(&self) -> bool {
        self.in_flight.values().any(|k| *k == FetchKind::Manual)
    }

    fn state(&self) -> RefreshState {
        if self.outcome == RefreshState::Stopped {
            RefreshState::Stopped
        } else if self.loading() {
            RefreshState::Loading
        } else if !self.in_flight.is_empty() {
            RefreshState::Refreshing
        } else {
            self.outcome
        }
    }

    /// Drops all per-identity state and invalidates outstanding fetches.
    fn reset(&mut self) {
        self.polling.stop();
        self.epoch = self.epoch.wrapping_add(1);
        self.in_flight.clear();
        self.data = None;
        self.last_error = None;
        self.last_updated = None;
        self.consecutive_failures = 0;
        self.identity = None;
    }
}

struct Shared<T> {
    session: RwLock<Session<T>>,
    identity: Arc<dyn IdentityProvider>,
    visibility: Option<Arc<dyn VisibilitySignal>>,
    notifier: Arc<dyn NotificationSink>,
    /// Never sent on; receivers see it close when the controller is dropped.
    closed: watch::Sender<()>,
}

/// Keeps a change-aware cache of one remote resource fresh for the
/// signed-in user.
///
/// Clones share the same session.
pub struct RefreshController<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for RefreshController<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> RefreshController<T>
where
    T: Serialize + Send + Sync + 'static,
{
    /// `visibility` may be absent, in which case the session always polls.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        visibility: Option<Arc<dyn VisibilitySignal>>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let (closed, _) = watch::channel(());
        Self {
            shared: Arc::new(Shared {
                session: RwLock::new(Session::new()),
                identity,
                visibility,
                notifier,
                closed,
            }),
        }
    }

    /// Starts a fresh session: releases any running timer, performs one
    /// immediate fetch and, unless silent or hidden, starts polling.
    ///
    /// With nobody signed in the session stays idle and nothing is fetched.
    pub async fn initialize(&self, config: RefreshConfig<T>) {
        let identity = self.shared.identity.current();
        self.initialize_with(config, identity).await;
    }

    async fn initialize_with(&self, config: RefreshConfig<T>, identity: Option<Identity>) {
        {
            let mut session = self.shared.session.write().await;
            session.reset();
            session.outcome = RefreshState::Idle;
            session.config = Some(config);

            let Some(identity) = identity else {
                tracing::info!("No signed-in user, refresh session idle");
                return;
            };

            tracing::info!(user = %identity.key, "Refresh session initialized");
            session.identity = Some(identity);

            if !session.is_silent() && !self.is_hidden() {
                self.start_polling_locked(&mut session);
            }
        }

        self.fetch(FetchKind::Initial).await;
    }

    /// Manual fetch. Failures keep the cached payload and are shown through
    /// the notification sink. Overlapping calls are not coalesced.
    pub async fn refresh(&self) {
        self.fetch(FetchKind::Manual).await;
    }

    pub async fn start_polling(&self) -> bool {
        let mut session = self.shared.session.write().await;
        self.start_polling_locked(&mut session)
    }

    pub async fn stop_polling(&self) -> bool {
        self.shared.session.write().await.polling.stop()
    }

    /// Unmount: stops polling and discards the session, including its config.
    pub async fn teardown(&self) {
        let mut session = self.shared.session.write().await;
        session.reset();
        session.config = None;
        session.outcome = RefreshState::Stopped;
        tracing::info!("Refresh session torn down");
    }

    /// Turning silent mode off on a live, visible session starts polling
    /// right away; turning it on releases the timer.
    pub async fn set_silent(&self, silent: bool) {
        let mut session = self.shared.session.write().await;
        let Some(config) = session.config.as_mut() else {
            return;
        };
        config.silent = silent;

        if silent {
            session.polling.stop();
        } else if !self.is_hidden() {
            self.start_polling_locked(&mut session);
        }
    }

    /// Hidden suspends polling; becoming visible fetches once and resumes
    /// polling unless silent.
    pub async fn on_visibility_change(&self, hidden: bool) {
        if hidden {
            if self.stop_polling().await {
                tracing::info!("Consumer hidden, polling suspended");
            }
            return;
        }

        {
            let mut session = self.shared.session.write().await;
            if !session.is_active() {
                return;
            }
            tracing::info!("Consumer visible, resuming refresh");
            if !session.is_silent() {
                self.start_polling_locked(&mut session);
            }
        }

        self.fetch(FetchKind::Background).await;
    }

    /// A different user (or none) discards the session; a new user starts a
    /// fresh one with the same config.
    pub async fn on_identity_change(&self, identity: Option<Identity>) {
        let config = {
            let mut session = self.shared.session.write().await;
            let previous = session.identity.as_ref().map(|i| i.key.clone());
            let next = identity.as_ref().map(|i| i.key.as_str());
            if previous.as_deref() == next {
                return;
            }
            if session.outcome == RefreshState::Stopped {
                return;
            }
            let Some(config) = session.config.clone() else {
                return;
            };

            session.reset();
            session.outcome = RefreshState::Idle;
            tracing::info!(
                previous = previous.as_deref(),
                next,
                "Identity changed, discarding cached data"
            );
            config
        };

        if identity.is_some() {
            self.initialize_with(config, identity).await;
        }
    }

    /// Spawns the task that applies identity and visibility changes. It ends
    /// when every handle to this controller is dropped.
    ///
    /// May be called before `initialize`; changes seen before a config is
    /// set are ignored and `initialize` reads the current identity itself.
    pub fn spawn_reactions(&self) -> JoinHandle<()> {
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        let mut identity_rx = self.shared.identity.subscribe();
        let mut visibility_rx = self.shared.visibility.as_ref().map(|v| v.subscribe());
        let mut closed_rx = self.shared.closed.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = closed_rx.changed() => break,
                    changed = identity_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let identity = identity_rx.borrow_and_update().clone();
                        let Some(shared) = weak.upgrade() else {
                            break;
                        };
                        RefreshController { shared }.on_identity_change(identity).await;
                    }
                    hidden = next_visibility(&mut visibility_rx) => {
                        let Some(shared) = weak.upgrade() else {
                            break;
                        };
                        RefreshController { shared }.on_visibility_change(hidden).await;
                    }
                }
            }
            tracing::debug!("Refresh reactions ended");
        })
    }

    pub async fn snapshot(&self) -> RefreshSnapshot<T> {
        let session = self.shared.session.read().await;
        RefreshSnapshot {
            data: session.data.clone(),
            loading: session.loading(),
            is_refreshing: session.is_refreshing(),
            error: session.last_error.clone(),
            state: session.state(),
            last_updated: session.last_updated,
            polling: session.polling.is_running(),
        }
    }

    pub async fn data(&self) -> Option<Arc<T>> {
        self.shared.session.read().await.data.clone()
    }

    pub async fn last_error(&self) -> Option<RefreshError> {
        self.shared.session.read().await.last_error.clone()
    }

    pub async fn state(&self) -> RefreshState {
        self.shared.session.read().await.state()
    }

    pub async fn is_loading(&self) -> bool {
        self.shared.session.read().await.loading()
    }

    pub async fn is_refreshing(&self) -> bool {
        self.shared.session.read().await.is_refreshing()
    }

    pub async fn is_polling(&self) -> bool {
        self.shared.session.read().await.polling.is_running()
    }

    fn is_hidden(&self) -> bool {
        self.shared
            .visibility
            .as_ref()
            .is_some_and(|v| v.is_hidden())
    }

    fn start_polling_locked(&self, session: &mut Session<T>) -> bool {
        if !session.is_active() {
            tracing::debug!("Not polling: no active session");
            return false;
        }
        let Some(interval) = session.config.as_ref().map(|c| c.interval) else {
            return false;
        };

        let weak = Arc::downgrade(&self.shared);
        let started = session.polling.start(interval, move |run_id| {
            let Some(shared) = weak.upgrade() else {
                return false;
            };
            let controller = RefreshController { shared };
            tokio::spawn(async move {
                controller.tick(run_id).await;
            });
            true
        });

        if started {
            tracing::info!(interval_ms = interval.as_millis() as u64, "Polling started");
        }
        started
    }

    async fn tick(&self, run_id: u64) {
        {
            let session = self.shared.session.read().await;
            if session.polling.current_run() != Some(run_id) {
                tracing::debug!(run_id, "Ignoring tick from a released timer");
                return;
            }
        }
        self.fetch(FetchKind::Background).await;
    }

    async fn fetch(&self, kind: FetchKind) {
        let (token, epoch, fetcher) = {
            let mut session = self.shared.session.write().await;
            if !session.is_active() {
                let reason = if session.outcome == RefreshState::Stopped {
                    RefreshError::Stopped
                } else {
                    RefreshError::MissingIdentity
                };
                tracing::debug!(?kind, reason = %reason, "Skipping fetch");
                return;
            }
            let Some(fetcher) = session.config.as_ref().map(|c| Arc::clone(&c.fetcher)) else {
                return;
            };

            let token = session.next_token;
            session.next_token = session.next_token.wrapping_add(1);
            session.in_flight.insert(token, kind);
            (token, session.epoch, fetcher)
        };

        let result = fetcher.fetch().await;
        self.complete(token, epoch, kind, result).await;
    }

    async fn complete(&self, token: u64, epoch: u64, kind: FetchKind, result: anyhow::Result<T>) {
        let mut changed: Option<(ChangeCallback<T>, Arc<T>, Arc<T>)> = None;
        let mut loaded: Option<(LoadCallback<T>, Arc<T>)> = None;
        let mut failure: Option<(RefreshError, u32)> = None;

        {
            let mut session = self.shared.session.write().await;
            let tracked = session.in_flight.remove(&token).is_some();
            if !tracked || session.epoch != epoch {
                tracing::debug!(token, "Discarding result from a previous session");
                return;
            }

            match result {
                Ok(value) => {
                    session.last_error = None;
                    session.consecutive_failures = 0;
                    session.last_updated = Some(Utc::now());
                    session.outcome = RefreshState::Ready;

                    if has_changed(session.data.as_deref(), &value) {
                        let next = Arc::new(value);
                        let previous = session.data.replace(Arc::clone(&next));
                        let config = session.config.as_ref();
                        match previous {
                            Some(previous) => {
                                changed = config
                                    .and_then(|c| c.on_change.clone())
                                    .map(|callback| (callback, next, previous));
                            }
                            None => {
                                loaded = config
                                    .and_then(|c| c.on_load.clone())
                                    .map(|callback| (callback, next));
                            }
                        }
                        tracing::debug!(?kind, "Fetched payload changed");
                    } else {
                        tracing::debug!(?kind, "Fetched payload unchanged");
                    }
                }
                Err(e) => {
                    let error = RefreshError::fetch(&e);
                    session.last_error = Some(error.clone());
                    session.consecutive_failures = session.consecutive_failures.saturating_add(1);
                    session.outcome = RefreshState::Error;
                    failure = Some((error, session.consecutive_failures));
                }
            }
        }

        if let Some((callback, next, previous)) = changed {
            callback(&next, &previous);
        }
        if let Some((callback, value)) = loaded {
            callback(&value);
        }

        if let Some((error, consecutive)) = failure {
            match kind {
                FetchKind::Manual => {
                    tracing::warn!(error = %error, consecutive, "Manual refresh failed");
                    self.shared
                        .notifier
                        .notify(Severity::Error, &format!("Refresh failed: {error}"));
                }
                FetchKind::Initial | FetchKind::Background => {
                    tracing::warn!(
                        ?kind,
                        error = %error,
                        consecutive,
                        "Background fetch failed, keeping cached data"
                    );
                }
            }
        }
    }
}

async fn next_visibility(rx: &mut Option<watch::Receiver<bool>>) -> bool {
    if let Some(inner) = rx {
        if inner.changed().await.is_ok() {
            return *inner.borrow_and_update();
        }
        *rx = None;
    }
    std::future::pending().await
}
