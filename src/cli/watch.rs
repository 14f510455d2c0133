use anyhow::{Context, Result};
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use smart_refresh::api::MarketplaceClient;
use smart_refresh::core::alerts::ChangeAlert;
use smart_refresh::core::identity::{IdentityProvider, SessionFileIdentity};
use smart_refresh::core::models::{DashboardStats, FoodItem, Order, Resource, UnreadCount, UserRole};
use smart_refresh::core::notifications::{
    DesktopNotifier, LogNotifier, NotificationSink, Severity,
};
use smart_refresh::core::settings::Settings;
use smart_refresh::core::visibility::{PauseFileVisibility, VisibilitySignal};
use smart_refresh::{RefreshConfig, RefreshController, RefreshSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

type AlertFn<T> = fn(&T, &T, Option<UserRole>) -> Vec<(Severity, String)>;

pub struct WatchOptions {
    pub resource: Resource,
    pub interval_ms: Option<u64>,
    pub silent: bool,
    pub json: bool,
}

struct Environment {
    settings: Settings,
    client: MarketplaceClient,
    identity: Arc<dyn IdentityProvider>,
    visibility: Option<Arc<dyn VisibilitySignal>>,
    notifier: Arc<dyn NotificationSink>,
}

pub async fn run(options: WatchOptions) -> Result<()> {
    let settings = Settings::load()?;
    let client = MarketplaceClient::new(&settings.api)?;

    let session_path = settings
        .session_file()
        .context("Could not determine session file location")?;
    let identity: Arc<dyn IdentityProvider> = Arc::new(SessionFileIdentity::start(session_path)?);

    let visibility = settings.pause_file().and_then(|path| {
        match PauseFileVisibility::start(path) {
            Ok(signal) => Some(Arc::new(signal) as Arc<dyn VisibilitySignal>),
            Err(e) => {
                tracing::warn!(error = %e, "Pause marker unavailable, polling continuously");
                None
            }
        }
    });

    let notifier: Arc<dyn NotificationSink> = if settings.notifications.desktop {
        Arc::new(DesktopNotifier)
    } else {
        Arc::new(LogNotifier)
    };

    let env = Environment {
        settings,
        client,
        identity,
        visibility,
        notifier,
    };

    match options.resource {
        Resource::FoodItems => watch::<Vec<FoodItem>>(env, &options, alerts_for()).await,
        Resource::Orders => watch::<Vec<Order>>(env, &options, alerts_for()).await,
        Resource::Stats => watch::<DashboardStats>(env, &options, alerts_for()).await,
        Resource::Unread => watch::<UnreadCount>(env, &options, alerts_for()).await,
        Resource::Recipients | Resource::RatingSummary | Resource::Ratings => {
            watch::<Value>(env, &options, None).await
        }
    }
}

fn alerts_for<T: ChangeAlert>() -> Option<AlertFn<T>> {
    Some(T::alerts)
}

async fn watch<T>(env: Environment, options: &WatchOptions, alerts: Option<AlertFn<T>>) -> Result<()>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    let resource = options.resource;
    let interval = options
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| env.settings.interval_for(resource));
    let silent = options.silent || env.settings.refresh.silent;
    let json = options.json;

    let controller: RefreshController<T> = RefreshController::new(
        Arc::clone(&env.identity),
        env.visibility.clone(),
        Arc::clone(&env.notifier),
    );

    let alert_sink = env
        .settings
        .notifications
        .enabled
        .then(|| Arc::clone(&env.notifier));
    let alert_identity = Arc::clone(&env.identity);

    let config = RefreshConfig::new(env.client.fetcher::<T>(resource, Arc::clone(&env.identity)))
        .interval(interval)
        .silent(silent)
        .on_load(move |payload: &T| print_payload(resource, payload, json))
        .on_change(move |current: &T, previous: &T| {
            print_payload(resource, current, json);
            if let (Some(alerts), Some(sink)) = (alerts, &alert_sink) {
                let role = alert_identity.current().and_then(|i| i.role);
                for (severity, message) in alerts(current, previous, role) {
                    sink.notify(severity, &message);
                }
            }
        });

    tracing::info!(
        resource = resource.name(),
        interval_ms = interval.as_millis() as u64,
        silent,
        "Watching resource"
    );

    // Reactions subscribe before initialize reads the identity.
    let reactions = controller.spawn_reactions();
    controller.initialize(config).await;
    report(&controller.snapshot().await, json);

    if env.identity.current().is_none() {
        eprintln!("Not signed in; waiting for a session file");
    }
    if !json {
        eprintln!("Press Enter to refresh, Ctrl-C to quit");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                break;
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => {
                        controller.refresh().await;
                        print_current(&controller, resource, json).await;
                    }
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read stdin");
                        stdin_open = false;
                    }
                }
            }
        }
    }

    reactions.abort();
    controller.teardown().await;
    Ok(())
}

async fn print_current<T: Serialize + Send + Sync + 'static>(
    controller: &RefreshController<T>,
    resource: Resource,
    json: bool,
) {
    let snapshot = controller.snapshot().await;
    if let Some(data) = &snapshot.data {
        print_payload(resource, data.as_ref(), json);
    }
    report(&snapshot, json);
}

/// Shows the last error, if there is one, with the session state.
fn report<T>(snapshot: &RefreshSnapshot<T>, json: bool) {
    if json {
        return;
    }
    match error_line(snapshot) {
        Some(line) => eprintln!("{line}"),
        None => tracing::debug!(state = snapshot.state.label(), "Session state"),
    }
}

fn error_line<T>(snapshot: &RefreshSnapshot<T>) -> Option<String> {
    let error = snapshot.error.as_ref()?;
    Some(format!(
        "{} ({}, {})",
        error,
        error.error_code(),
        snapshot.state.label()
    ))
}

fn print_payload<T: Serialize>(resource: Resource, payload: &T, json: bool) {
    let value = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize payload for display");
            return;
        }
    };

    if json {
        println!("{}", value);
    } else {
        println!(
            "[{}] {}: {}",
            Local::now().format("%H:%M:%S"),
            resource.name(),
            summarize(&value)
        );
    }
}

/// One-line description of a payload: entry counts for lists, scalar fields
/// for objects.
fn summarize(value: &Value) -> String {
    match value {
        Value::Array(items) => match items.len() {
            1 => "1 entry".to_string(),
            n => format!("{n} entries"),
        },
        Value::Object(fields) => fields
            .iter()
            .filter(|(_, v)| !v.is_object() && !v.is_array())
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}
