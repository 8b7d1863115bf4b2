//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use super::cart::Cart;
use crate::domain::value_objects::Phone;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<OrderLine>,
    pub total_price: i64,
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Price is captured when the order is placed and never follows later product edits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine { pub product_id: String, pub name: String, pub size: String, pub quantity: u32, pub price: i64 }

impl OrderLine {
    pub fn line_total(&self) -> i64 { self.price * i64::from(self.quantity) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Confirmed, Processing, Shipped, Delivered }

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [Self::Confirmed, Self::Processing, Self::Shipped, Self::Delivered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl Order {
    /// Snapshots the cart into a confirmed order. The id is assigned by the store on insert.
    pub fn place(customer_id: Option<String>, customer_name: &str, phone: &Phone, cart: &Cart, now: DateTime<Utc>) -> Self {
        let items = cart.lines().iter().map(|l| OrderLine {
            product_id: l.product_id.clone(), name: l.name.clone(), size: l.selected_size.clone(),
            quantity: l.quantity, price: l.price,
        }).collect();
        Self {
            id: String::new(), customer_id, customer_name: customer_name.trim().to_string(),
            customer_phone: phone.as_str().to_string(), items, total_price: cart.total(),
            status: OrderStatus::Confirmed, created_at: now, updated_at: now,
        }
    }

    /// Any status may follow any other.
    pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;

    #[test]
    fn test_place_snapshots_cart() {
        let mut cart = Cart::new();
        cart.add(&sample("P1", 5000, &[("M", 3)]), "M", 2, "");
        cart.add(&sample("P2", 15000, &[("S", 3)]), "S", 1, "Blue");
        let phone = Phone::parse("08012345678").unwrap();
        let order = Order::place(None, " Ada ", &phone, &cart, Utc::now());
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.customer_name, "Ada");
        assert_eq!(order.total_price, 25000);
        assert_eq!(order.items.iter().map(OrderLine::line_total).sum::<i64>(), order.total_price);
        assert_eq!(order.items[1].size, "S");
        assert_eq!(order.item_count(), 3);
    }

    #[test]
    fn test_any_transition_is_allowed() {
        let mut cart = Cart::new();
        cart.add(&sample("P1", 5000, &[("M", 3)]), "M", 1, "");
        let phone = Phone::parse("8012345678").unwrap();
        let placed = Utc::now();
        let mut order = Order::place(Some("u1".into()), "Ada", &phone, &cart, placed);
        order.set_status(OrderStatus::Delivered, placed);
        order.set_status(OrderStatus::Confirmed, placed + chrono::Duration::minutes(1));
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert!(order.updated_at > order.created_at);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert!("pending".parse::<OrderStatus>().is_err());
    }
}
