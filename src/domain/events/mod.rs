//! Domain events
use crate::domain::aggregates::{OrderStatus, RatingSummary};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "lowercase")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    StockDecremented { product_id: String, size: String, before: u32, after: u32 },
    RatingRecomputed { product_id: String, summary: RatingSummary },
    Deleted { product_id: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: String, customer_name: String, customer_phone: String, total_price: i64, item_count: u32 },
    StatusChanged { order_id: String, status: OrderStatus },
    Deleted { order_id: String },
}

impl DomainEvent {
    /// Message bus subject, relative to the configured prefix.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::StockDecremented { .. }) => "product.stock_decremented",
            Self::Product(ProductEvent::RatingRecomputed { .. }) => "product.rating_recomputed",
            Self::Product(ProductEvent::Deleted { .. }) => "product.deleted",
            Self::Order(OrderEvent::Placed { .. }) => "order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "order.status_changed",
            Self::Order(OrderEvent::Deleted { .. }) => "order.deleted",
        }
    }
}
