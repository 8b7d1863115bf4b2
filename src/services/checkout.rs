//! Checkout pipeline.
//!
//! 1. validate the cart and contact details (nothing is written on failure)
//! 2. normalize the phone number
//! 3. insert the order document: the commit point
//! 4. decrement stock line by line, each line independent of the others
//! 5. build the notification handoff and publish the order event
//! 6. clear the cart
//!
//! Only step 3 can fail the checkout. Steps 4 and 5 are side effects whose
//! outcomes are reported in the receipt but never undo the order.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::domain::aggregates::product::not_blank;
use crate::domain::aggregates::{Order, OrderLine, Product, User};
use crate::domain::events::{DomainEvent, OrderEvent, ProductEvent};
use crate::domain::value_objects::Phone;
use crate::services::cart::CartState;
use crate::services::events::{publish_detached, EventPublisher};
use crate::services::field_messages;
use crate::services::notify::handoff_for;
use crate::services::settings::SettingsService;
use crate::store::{self, DocumentStore, StoreError, ORDERS, PRODUCTS};

/// Attempts per line when another writer changes the same product mid-update.
const MAX_STOCK_ATTEMPTS: usize = 5;

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct CheckoutForm {
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(custom = "valid_phone")]
    pub phone: String,
}

fn valid_phone(raw: &str) -> Result<(), ValidationError> {
    Phone::parse(raw).map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("phone");
        err.message = Some(e.to_string().into());
        err
    })
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("Please fix the errors in the form")]
    Invalid(BTreeMap<String, String>),
    #[error("Failed to place order: {0}")]
    Store(#[from] StoreError),
}

/// What happened to one line's stock counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StockOutcome {
    Decremented { before: u32, after: u32 },
    /// Fewer units were on hand than ordered; stock is now zero.
    Shortfall { before: u32, requested: u32 },
    ProductMissing,
    SizeMissing,
    Failed { error: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub product_id: String,
    pub size: String,
    pub quantity: u32,
    #[serde(flatten)]
    pub outcome: StockOutcome,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub order: Order,
    pub stock: Vec<StockUpdate>,
    /// Messaging deep link for the caller to open; `None` when notifications are off.
    pub notification_url: Option<String>,
}

impl CheckoutReceipt {
    /// Lines whose stock could not be reconciled with the order.
    pub fn stock_issues(&self) -> impl Iterator<Item = &StockUpdate> {
        self.stock.iter().filter(|s| !matches!(s.outcome, StockOutcome::Decremented { .. }))
    }
}

pub struct CheckoutService {
    store: Arc<dyn DocumentStore>,
    settings: Arc<SettingsService>,
    events: Arc<dyn EventPublisher>,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn DocumentStore>, settings: Arc<SettingsService>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, settings, events }
    }

    pub async fn place_order(&self, cart: &mut CartState, form: &CheckoutForm, customer: Option<&User>) -> Result<CheckoutReceipt, CheckoutError> {
        if cart.is_empty() { return Err(CheckoutError::EmptyCart); }
        form.validate().map_err(|e| CheckoutError::Invalid(field_messages(&e)))?;
        let phone = Phone::parse(&form.phone).map_err(|e| CheckoutError::Invalid(BTreeMap::from([("phone".to_string(), e.to_string())])))?;

        let mut order = Order::place(customer.map(|u| u.id.clone()), &form.name, &phone, cart.cart(), Utc::now());
        order.id = self.store.insert(ORDERS, store::encode(&order)?).await.map_err(|e| {
            tracing::error!(error = %e, "Error placing order");
            e
        })?;
        tracing::info!(order_id = %order.id, total = order.total_price, items = order.items.len(), "order placed");

        let mut stock = Vec::with_capacity(order.items.len());
        for line in &order.items {
            let outcome = self.decrement_line(line).await;
            let change = match &outcome {
                StockOutcome::Decremented { before, after } => Some((*before, *after)),
                StockOutcome::Shortfall { before, .. } => {
                    tracing::warn!(order_id = %order.id, product_id = %line.product_id, size = %line.size, before, requested = line.quantity, "stock shortfall");
                    Some((*before, 0))
                }
                other => {
                    tracing::error!(order_id = %order.id, product_id = %line.product_id, size = %line.size, outcome = ?other, "Error updating stock for product");
                    None
                }
            };
            if let Some((before, after)) = change {
                publish_detached(&self.events, DomainEvent::Product(ProductEvent::StockDecremented {
                    product_id: line.product_id.clone(), size: line.size.clone(), before, after,
                }));
            }
            stock.push(StockUpdate { product_id: line.product_id.clone(), size: line.size.clone(), quantity: line.quantity, outcome });
        }

        let settings = self.settings.load_or_default().await;
        let notification_url = handoff_for(&order, &settings);
        publish_detached(&self.events, DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id.clone(), customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(), total_price: order.total_price, item_count: order.item_count(),
        }));

        cart.clear_cart();
        Ok(CheckoutReceipt { order, stock, notification_url })
    }

    async fn decrement_line(&self, line: &OrderLine) -> StockOutcome {
        for attempt in 1..=MAX_STOCK_ATTEMPTS {
            let doc = match self.store.get(PRODUCTS, &line.product_id).await {
                Ok(Some(doc)) => doc,
                Ok(None) => return StockOutcome::ProductMissing,
                Err(e) => return StockOutcome::Failed { error: e.to_string() },
            };
            let expected = doc.field("sizes").cloned().unwrap_or(Value::Null);
            let mut product: Product = match doc.decode(PRODUCTS) {
                Ok(p) => p,
                Err(e) => return StockOutcome::Failed { error: e.to_string() },
            };
            let Some(change) = product.take_stock(&line.size, line.quantity) else {
                return StockOutcome::SizeMissing;
            };
            let sizes = match serde_json::to_value(&product.sizes) {
                Ok(v) => v,
                Err(e) => return StockOutcome::Failed { error: e.to_string() },
            };
            match self.store.compare_and_set(PRODUCTS, &line.product_id, "sizes", &expected, sizes).await {
                Ok(true) if change.is_shortfall(line.quantity) => {
                    return StockOutcome::Shortfall { before: change.before, requested: line.quantity };
                }
                Ok(true) => return StockOutcome::Decremented { before: change.before, after: change.after },
                Ok(false) => tracing::debug!(product_id = %line.product_id, attempt, "stock changed concurrently, retrying"),
                Err(e) => return StockOutcome::Failed { error: e.to_string() },
            }
        }
        StockOutcome::Failed { error: format!("stock kept changing after {MAX_STOCK_ATTEMPTS} attempts") }
    }
}
