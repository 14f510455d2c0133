use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use smart_refresh::api::MarketplaceClient;
use smart_refresh::core::identity::read_session_file;
use smart_refresh::core::models::Resource;
use smart_refresh::core::retry::{retry_with_backoff, RetryState};
use smart_refresh::core::settings::Settings;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Serialize)]
struct StatusOutput {
    resource: &'static str,
    user: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    fetched_at: DateTime<Utc>,
    data: Value,
}

pub async fn run(resource: Resource, json: bool) -> Result<()> {
    let settings = Settings::load()?;
    let session_path = settings
        .session_file()
        .context("Could not determine session file location")?;

    let Some(identity) = read_session_file(&session_path) else {
        anyhow::bail!(
            "Not signed in. Log in through the web client or write {}",
            session_path.display()
        );
    };

    let client = MarketplaceClient::new(&settings.api)?;
    let data: Value = retry_with_backoff(MAX_ATTEMPTS, RetryState::new(), || {
        client.get::<Value>(resource, &identity)
    })
    .await
    .with_context(|| format!("Failed to fetch {} after {MAX_ATTEMPTS} attempts", resource.name()))?;

    let output = StatusOutput {
        resource: resource.name(),
        user: identity.key.clone(),
        fetched_at: Utc::now(),
        data,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

fn print_text_output(output: &StatusOutput) {
    println!("{} (user {})", output.resource, output.user);

    match &output.data {
        Value::Array(items) => {
            println!("  {} entries", items.len());
            for item in items {
                println!("  - {}", describe_entry(item));
            }
        }
        Value::Object(fields) => {
            for (key, value) in fields {
                println!("  {:<18} {}", format!("{key}:"), value);
            }
        }
        other => println!("  {}", other),
    }
}

fn describe_entry(item: &Value) -> String {
    let field = |name: &str| item.get(name).and_then(Value::as_str);

    let label = field("title")
        .or_else(|| field("food_item_title"))
        .or_else(|| field("name"))
        .or_else(|| field("id"))
        .unwrap_or("?");

    match field("status") {
        Some(status) => format!("{label} [{status}]"),
        None => label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_food_item() {
        let item = json!({"id": "f1", "title": "Vegetable curry", "status": "available"});
        assert_eq!(describe_entry(&item), "Vegetable curry [available]");
    }

    #[test]
    fn test_describe_falls_back_to_id() {
        let item = json!({"id": "o9", "total_amount": 0.0});
        assert_eq!(describe_entry(&item), "o9");
        assert_eq!(describe_entry(&json!(3)), "?");
    }
}
