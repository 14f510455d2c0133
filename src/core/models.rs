use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The signed-in marketplace user a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id; any change starts a fresh session.
    pub key: String,
    pub name: Option<String>,
    pub role: Option<UserRole>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

impl Identity {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: None,
            role: None,
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Donor,
    Recipient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefreshState {
    Idle,
    Loading,
    Refreshing,
    Ready,
    Error,
    Stopped,
}

impl RefreshState {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshState::Idle => "idle",
            RefreshState::Loading => "loading",
            RefreshState::Refreshing => "refreshing",
            RefreshState::Ready => "ready",
            RefreshState::Error => "error",
            RefreshState::Stopped => "stopped",
        }
    }
}

/// Marketplace endpoints that dashboards keep fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    FoodItems,
    Orders,
    Stats,
    Recipients,
    RatingSummary,
    Ratings,
    Unread,
}

impl Resource {
    pub fn name(&self) -> &'static str {
        match self {
            Resource::FoodItems => "food-items",
            Resource::Orders => "orders",
            Resource::Stats => "stats",
            Resource::Recipients => "recipients",
            Resource::RatingSummary => "rating-summary",
            Resource::Ratings => "ratings",
            Resource::Unread => "unread",
        }
    }

    /// Request path relative to the API base URL.
    pub fn path(&self, identity: &Identity) -> String {
        match self {
            Resource::FoodItems => "/food-items".to_string(),
            Resource::Orders => "/orders".to_string(),
            Resource::Stats => "/dashboard/stats".to_string(),
            Resource::Recipients => "/donors/recipients".to_string(),
            Resource::RatingSummary => format!("/donors/{}/rating-summary", identity.key),
            Resource::Ratings => "/ratings".to_string(),
            Resource::Unread => "/chat/unread-count".to_string(),
        }
    }

    pub fn default_interval(&self) -> Duration {
        match self {
            Resource::FoodItems => Duration::from_millis(5000),
            Resource::Orders => Duration::from_millis(3000),
            Resource::Stats => Duration::from_millis(10000),
            Resource::Recipients => Duration::from_millis(15000),
            Resource::RatingSummary => Duration::from_millis(30000),
            Resource::Ratings => Duration::from_millis(60000),
            Resource::Unread => Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodType {
    Donation,
    Sale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodStatus {
    Available,
    Claimed,
    Sold,
    Expired,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub quantity: String,
    pub expiry_time: DateTime<Utc>,
    pub pickup_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub donor_id: String,
    pub food_type: FoodType,
    pub price: Option<f64>,
    #[serde(default)]
    pub delivery_available: bool,
    pub status: FoodStatus,
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default)]
    pub donor_average_rating: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl FoodItem {
    pub fn is_available(&self) -> bool {
        self.status == FoodStatus::Available
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub food_item_id: String,
    pub recipient_id: String,
    pub donor_id: String,
    pub order_type: String,
    pub total_amount: f64,
    pub payment_status: String,
    pub delivery_method: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub food_item_title: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// `/dashboard/stats` answers with a different shape per role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DashboardStats {
    Donor {
        active_listings: u64,
        total_donations: u64,
        total_sales: u64,
    },
    Recipient {
        claimed_items: u64,
        purchased_items: u64,
        total_spent: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread_count: u64,
}
