//! Short user-facing summaries of what changed between two payloads.
//!
//! Some resources alert differently per role: donors hear about new orders,
//! recipients about their orders being confirmed.

use crate::core::models::{DashboardStats, FoodItem, Order, OrderStatus, UnreadCount, UserRole};
use crate::core::notifications::Severity;

pub trait ChangeAlert {
    fn alerts(current: &Self, previous: &Self, role: Option<UserRole>) -> Vec<(Severity, String)>;
}

impl ChangeAlert for Vec<FoodItem> {
    fn alerts(current: &Self, previous: &Self, _role: Option<UserRole>) -> Vec<(Severity, String)> {
        let available = |items: &[FoodItem]| items.iter().filter(|i| i.is_available()).count();

        if available(current) > available(previous) {
            vec![(Severity::Success, "New food items available!".to_string())]
        } else {
            Vec::new()
        }
    }
}

impl ChangeAlert for Vec<Order> {
    fn alerts(current: &Self, previous: &Self, role: Option<UserRole>) -> Vec<(Severity, String)> {
        match role {
            Some(UserRole::Donor) if current.len() > previous.len() => {
                vec![(Severity::Info, "New order received!".to_string())]
            }
            Some(UserRole::Recipient) => confirmed_orders(current, previous),
            _ => Vec::new(),
        }
    }
}

/// Orders present in both lists whose status moved to confirmed.
fn confirmed_orders(current: &[Order], previous: &[Order]) -> Vec<(Severity, String)> {
    current
        .iter()
        .filter(|order| order.status == OrderStatus::Confirmed)
        .filter(|order| {
            previous
                .iter()
                .find(|old| old.id == order.id)
                .is_some_and(|old| old.status != order.status)
        })
        .map(|order| {
            (
                Severity::Info,
                format!("Order #{} confirmed by donor", short_id(&order.id)),
            )
        })
        .collect()
}

/// Last eight characters of an id.
fn short_id(id: &str) -> &str {
    let start = id
        .char_indices()
        .rev()
        .nth(7)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &id[start..]
}

impl ChangeAlert for DashboardStats {
    fn alerts(current: &Self, previous: &Self, _role: Option<UserRole>) -> Vec<(Severity, String)> {
        let mut alerts = Vec::new();
        let mut grew = |now: u64, before: u64, message: &str| {
            if now > before {
                alerts.push((Severity::Success, message.to_string()));
            }
        };

        match (current, previous) {
            (
                DashboardStats::Donor {
                    total_donations,
                    total_sales,
                    ..
                },
                DashboardStats::Donor {
                    total_donations: prev_donations,
                    total_sales: prev_sales,
                    ..
                },
            ) => {
                grew(*total_donations, *prev_donations, "New donation completed!");
                grew(*total_sales, *prev_sales, "New sale completed!");
            }
            (
                DashboardStats::Recipient {
                    claimed_items,
                    purchased_items,
                    ..
                },
                DashboardStats::Recipient {
                    claimed_items: prev_claimed,
                    purchased_items: prev_purchased,
                    ..
                },
            ) => {
                grew(*claimed_items, *prev_claimed, "New item claimed!");
                grew(*purchased_items, *prev_purchased, "New purchase completed!");
            }
            _ => {}
        }

        alerts
    }
}

impl ChangeAlert for UnreadCount {
    fn alerts(current: &Self, previous: &Self, _role: Option<UserRole>) -> Vec<(Severity, String)> {
        let new_messages = current.unread_count.saturating_sub(previous.unread_count);
        match new_messages {
            0 => Vec::new(),
            1 => vec![(Severity::Info, "1 new message".to_string())],
            n => vec![(Severity::Info, format!("{n} new messages"))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{FoodStatus, FoodType};
    use chrono::Utc;

    fn food(id: &str, status: FoodStatus) -> FoodItem {
        FoodItem {
            id: id.to_string(),
            title: "Bread".to_string(),
            description: None,
            quantity: "10 loaves".to_string(),
            expiry_time: Utc::now(),
            pickup_address: "1 Baker St".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            donor_id: "d1".to_string(),
            food_type: FoodType::Donation,
            price: None,
            delivery_available: false,
            status,
            donor_name: None,
            donor_average_rating: None,
            updated_at: Utc::now(),
        }
    }

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            food_item_id: "f1".to_string(),
            recipient_id: "r1".to_string(),
            donor_id: "d1".to_string(),
            order_type: "claim".to_string(),
            total_amount: 0.0,
            payment_status: "pending".to_string(),
            delivery_method: "pickup".to_string(),
            status,
            food_item_title: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_more_available_food_alerts() {
        let previous = vec![food("1", FoodStatus::Available)];
        let current = vec![
            food("1", FoodStatus::Available),
            food("2", FoodStatus::Available),
        ];
        let alerts = ChangeAlert::alerts(&current, &previous, None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].0, Severity::Success);
    }

    #[test]
    fn test_claimed_food_does_not_alert() {
        let previous = vec![food("1", FoodStatus::Available)];
        let current = vec![food("1", FoodStatus::Claimed), food("2", FoodStatus::Sold)];
        assert!(ChangeAlert::alerts(&current, &previous, None).is_empty());
    }

    #[test]
    fn test_new_order_alerts_donor_only() {
        let previous = vec![order("o1", OrderStatus::Pending)];
        let current = vec![
            order("o1", OrderStatus::Pending),
            order("o2", OrderStatus::Pending),
        ];
        assert_eq!(
            ChangeAlert::alerts(&current, &previous, Some(UserRole::Donor)),
            vec![(Severity::Info, "New order received!".to_string())]
        );
        assert!(ChangeAlert::alerts(&current, &previous, Some(UserRole::Recipient)).is_empty());
        assert!(ChangeAlert::alerts(&current, &previous, None).is_empty());
    }

    #[test]
    fn test_recipient_hears_about_confirmed_orders() {
        let previous = vec![
            order("3f2a9c10-0000-4b7e-9d1c-a1b2c3d4e5f6", OrderStatus::Pending),
            order("o2", OrderStatus::Confirmed),
        ];
        let current = vec![
            order("3f2a9c10-0000-4b7e-9d1c-a1b2c3d4e5f6", OrderStatus::Confirmed),
            order("o2", OrderStatus::Confirmed),
            order("o3", OrderStatus::Confirmed),
        ];
        assert_eq!(
            ChangeAlert::alerts(&current, &previous, Some(UserRole::Recipient)),
            vec![(Severity::Info, "Order #c3d4e5f6 confirmed by donor".to_string())]
        );
    }

    #[test]
    fn test_other_status_changes_do_not_alert_recipient() {
        let previous = vec![order("o1", OrderStatus::Confirmed)];
        let current = vec![order("o1", OrderStatus::Completed)];
        assert!(ChangeAlert::alerts(&current, &previous, Some(UserRole::Recipient)).is_empty());
    }

    #[test]
    fn test_short_id_keeps_short_ids_whole() {
        assert_eq!(short_id("o1"), "o1");
        assert_eq!(short_id("0123456789"), "23456789");
    }

    #[test]
    fn test_donor_stats_alerts() {
        let previous = DashboardStats::Donor {
            active_listings: 3,
            total_donations: 1,
            total_sales: 0,
        };
        let current = DashboardStats::Donor {
            active_listings: 2,
            total_donations: 2,
            total_sales: 1,
        };
        let messages: Vec<String> = ChangeAlert::alerts(&current, &previous, Some(UserRole::Donor))
            .into_iter()
            .map(|(_, m)| m)
            .collect();
        assert_eq!(
            messages,
            vec!["New donation completed!", "New sale completed!"]
        );
    }

    #[test]
    fn test_recipient_stats_alerts() {
        let previous = DashboardStats::Recipient {
            claimed_items: 0,
            purchased_items: 0,
            total_spent: 0.0,
        };
        let current = DashboardStats::Recipient {
            claimed_items: 1,
            purchased_items: 1,
            total_spent: 5.0,
        };
        let messages: Vec<String> = ChangeAlert::alerts(&current, &previous, None)
            .into_iter()
            .map(|(_, m)| m)
            .collect();
        assert_eq!(messages, vec!["New item claimed!", "New purchase completed!"]);
        assert!(ChangeAlert::alerts(&previous, &previous, None).is_empty());
    }

    #[test]
    fn test_unread_count_alerts() {
        let previous = UnreadCount { unread_count: 1 };
        let current = UnreadCount { unread_count: 4 };
        assert_eq!(
            ChangeAlert::alerts(&current, &previous, None),
            vec![(Severity::Info, "3 new messages".to_string())]
        );
        assert!(ChangeAlert::alerts(&previous, &current, None).is_empty());
    }
}
