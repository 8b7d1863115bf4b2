//! Admin order management, customer order tracking and dashboard figures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Phone;
use crate::services::events::{publish_detached, EventPublisher};
use crate::store::{self, Direction, DocumentStore, Fields, Query, StoreError, ORDERS, PRODUCTS};

/// Orders shown on the dashboard.
const RECENT_ORDERS: usize = 5;

#[derive(Debug, Error)]
pub enum OrderAdminError {
    #[error("Order {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteReport {
    pub deleted: usize,
    pub failed: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListing {
    pub orders: Vec<Order>,
    /// Per-status counts over all orders, regardless of the filter.
    pub counts: BTreeMap<OrderStatus, usize>,
    pub total: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    pub total_orders: usize,
    pub today_orders: usize,
    pub total_revenue: i64,
    pub recent_orders: Vec<Order>,
}

pub struct OrderAdmin {
    store: Arc<dyn DocumentStore>,
    events: Arc<dyn EventPublisher>,
}

impl OrderAdmin {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    async fn all(&self) -> Result<Vec<Order>, StoreError> {
        let query = Query::new().order_by("createdAt", Direction::Desc);
        store::fetch_all(self.store.as_ref(), ORDERS, &query).await
    }

    /// All orders newest first, optionally narrowed to one status.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<OrderListing, StoreError> {
        let all = self.all().await?;
        let mut counts: BTreeMap<OrderStatus, usize> = OrderStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for order in &all {
            *counts.entry(order.status).or_default() += 1;
        }
        let total = all.len();
        let orders = match status {
            Some(status) => all.into_iter().filter(|o| o.status == status).collect(),
            None => all,
        };
        Ok(OrderListing { orders, counts, total })
    }

    pub async fn get(&self, order_id: &str) -> Result<Order, OrderAdminError> {
        store::fetch(self.store.as_ref(), ORDERS, order_id).await?
            .ok_or_else(|| OrderAdminError::NotFound(order_id.to_string()))
    }

    /// Overwrites the status unconditionally; any status may follow any other.
    pub async fn set_status(&self, order_id: &str, status: OrderStatus) -> Result<(), OrderAdminError> {
        let mut patch = Fields::new();
        patch.insert("status".into(), status.as_str().into());
        patch.insert("updatedAt".into(), Utc::now().timestamp_millis().into());
        match self.store.update(ORDERS, order_id, patch).await {
            Ok(()) => {}
            Err(StoreError::NotFound { .. }) => return Err(OrderAdminError::NotFound(order_id.to_string())),
            Err(e) => {
                tracing::error!(order_id, error = %e, "Error updating order status");
                return Err(e.into());
            }
        }
        tracing::info!(order_id, status = %status, "order status changed");
        publish_detached(&self.events, DomainEvent::Order(OrderEvent::StatusChanged { order_id: order_id.to_string(), status }));
        Ok(())
    }

    pub async fn delete_one(&self, order_id: &str) -> Result<(), StoreError> {
        self.store.delete(ORDERS, order_id).await.map_err(|e| {
            tracing::error!(order_id, error = %e, "Error deleting order");
            e
        })?;
        tracing::info!(order_id, "order deleted");
        publish_detached(&self.events, DomainEvent::Order(OrderEvent::Deleted { order_id: order_id.to_string() }));
        Ok(())
    }

    /// Deletes every order one document at a time. Not atomic: failures are
    /// collected and the remaining deletes still run.
    pub async fn delete_all(&self) -> Result<BulkDeleteReport, StoreError> {
        let ids: Vec<String> = self.store.query(ORDERS, &Query::new()).await?.into_iter().map(|d| d.id).collect();
        let mut report = BulkDeleteReport::default();
        for id in ids {
            match self.delete_one(&id).await {
                Ok(()) => report.deleted += 1,
                Err(_) => report.failed.push(id),
            }
        }
        tracing::info!(deleted = report.deleted, failed = report.failed.len(), "bulk order delete finished");
        Ok(report)
    }

    /// Orders placed with this phone number, newest first. Input is normalized first.
    pub async fn track_by_phone(&self, raw_phone: &str) -> Result<Vec<Order>, StoreError> {
        let query = Query::new()
            .eq("customerPhone", Phone::normalize(raw_phone))
            .order_by("createdAt", Direction::Desc);
        store::fetch_all(self.store.as_ref(), ORDERS, &query).await
    }

    pub async fn dashboard(&self, now: DateTime<Utc>) -> Result<DashboardStats, StoreError> {
        let total_products = self.store.query(PRODUCTS, &Query::new()).await?.len();
        let orders = self.all().await?;
        let today = now.date_naive();
        Ok(DashboardStats {
            total_products,
            total_orders: orders.len(),
            today_orders: orders.iter().filter(|o| o.created_at.date_naive() == today).count(),
            total_revenue: orders.iter().map(|o| o.total_price).sum(),
            recent_orders: orders.into_iter().take(RECENT_ORDERS).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;
    use crate::domain::aggregates::Cart;
    use crate::services::events::testing::RecordingPublisher;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    async fn seed(store: &MemoryStore, phone: &str, total: i64, at: DateTime<Utc>) -> String {
        let mut cart = Cart::new();
        cart.add(&sample("P1", total, &[("M", 10)]), "M", 1, "");
        let order = Order::place(None, "Ada", &Phone::parse(phone).unwrap(), &cart, at);
        store.insert(ORDERS, store::encode(&order).unwrap()).await.unwrap()
    }

    fn admin(store: &Arc<MemoryStore>) -> OrderAdmin {
        OrderAdmin::new(store.clone(), Arc::new(RecordingPublisher::default()))
    }

    #[tokio::test]
    async fn test_set_status_and_filtered_list() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let first = seed(&store, "08012345678", 5000, now - Duration::hours(2)).await;
        let second = seed(&store, "08012345678", 7000, now).await;
        let orders = admin(&store);

        orders.set_status(&first, OrderStatus::Shipped).await.unwrap();
        assert_eq!(orders.get(&first).await.unwrap().status, OrderStatus::Shipped);
        // Backwards moves are allowed.
        orders.set_status(&first, OrderStatus::Processing).await.unwrap();

        let listing = orders.list(None).await.unwrap();
        assert_eq!(listing.orders[0].id, second);
        assert_eq!(listing.counts[&OrderStatus::Processing], 1);
        assert_eq!(listing.counts[&OrderStatus::Confirmed], 1);
        assert_eq!(listing.counts[&OrderStatus::Delivered], 0);

        let processing = orders.list(Some(OrderStatus::Processing)).await.unwrap();
        assert_eq!(processing.orders.len(), 1);
        assert_eq!(processing.total, 2);

        assert!(matches!(orders.set_status("missing", OrderStatus::Delivered).await, Err(OrderAdminError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_all_reports_partial_failure() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let a = seed(&store, "08012345678", 5000, now).await;
        let _b = seed(&store, "08012345678", 5000, now).await;
        let _c = seed(&store, "08012345678", 5000, now).await;
        store.inject_fault(format!("{ORDERS}/{a}"));

        let report = admin(&store).delete_all().await.unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(report.failed, vec![a]);
        assert_eq!(store.len(ORDERS), 1);
    }

    #[tokio::test]
    async fn test_track_by_phone_normalizes_input() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed(&store, "08012345678", 5000, now - Duration::days(1)).await;
        let latest = seed(&store, "+234 801 234 5678", 6000, now).await;
        seed(&store, "08099999999", 5000, now).await;

        let found = admin(&store).track_by_phone("0801-234-5678").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, latest);
        assert!(admin(&store).track_by_phone("07000000000").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_counts_today_in_utc() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        seed(&store, "08012345678", 5000, now - Duration::days(1)).await;
        for hour in 0..6 {
            seed(&store, "08012345678", 1000, now - Duration::hours(hour)).await;
        }
        store.set(PRODUCTS, "P1", store::encode(&sample("P1", 5000, &[("M", 1)])).unwrap()).await.unwrap();

        let stats = admin(&store).dashboard(now).await.unwrap();
        assert_eq!(stats.total_products, 1);
        assert_eq!(stats.total_orders, 7);
        assert_eq!(stats.today_orders, 6);
        assert_eq!(stats.total_revenue, 11000);
        assert_eq!(stats.recent_orders.len(), 5);
        assert_eq!(stats.recent_orders[0].created_at, now);
    }
}
