//! Cart state persisted to local durable storage.

use std::sync::Arc;

use crate::domain::aggregates::{Cart, CartLine, Product};
use crate::local::{self, LocalStore};

pub const CART_KEY: &str = "liluxe_cart";

/// A cart bound to its storage key. Every mutation rewrites the stored list.
pub struct CartState {
    key: String,
    local: Arc<dyn LocalStore>,
    cart: Cart,
}

impl CartState {
    /// Rehydrates the cart stored under `key`; corrupt data loads as an empty cart.
    pub fn load(local: Arc<dyn LocalStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let cart = Cart::from_lines(local::load_list(local.as_ref(), &key));
        Self { key, local, cart }
    }

    pub fn key(&self) -> &str { &self.key }
    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn lines(&self) -> &[CartLine] { self.cart.lines() }
    pub fn count(&self) -> u32 { self.cart.count() }
    pub fn total(&self) -> i64 { self.cart.total() }
    pub fn is_empty(&self) -> bool { self.cart.is_empty() }

    pub fn add_to_cart(&mut self, product: &Product, size: &str, quantity: u32, color: &str) {
        self.cart.add(product, size, quantity, color);
        self.persist();
    }

    pub fn update_quantity(&mut self, product_id: &str, size: &str, quantity: i64, color: &str) {
        self.cart.update_quantity(product_id, size, quantity, color);
        self.persist();
    }

    pub fn remove_from_cart(&mut self, product_id: &str, size: &str, color: &str) {
        self.cart.remove(product_id, size, color);
        self.persist();
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = local::save_list(self.local.as_ref(), &self.key, self.cart.lines()) {
            tracing::error!(key = %self.key, error = %e, "Error saving cart");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;
    use crate::local::MemoryLocalStore;

    #[test]
    fn test_mutations_survive_reload() {
        let local: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        let mut state = CartState::load(Arc::clone(&local), CART_KEY);
        state.add_to_cart(&sample("P1", 5000, &[("M", 4)]), "M", 2, "Black");
        state.add_to_cart(&sample("P2", 8000, &[("S", 1)]), "S", 1, "");
        state.remove_from_cart("P2", "S", "");

        let reloaded = CartState::load(Arc::clone(&local), CART_KEY);
        assert_eq!(reloaded.cart(), state.cart());
        assert_eq!(reloaded.count(), 2);
        assert_eq!(reloaded.lines()[0].selected_color, "Black");
    }

    #[test]
    fn test_corrupt_storage_loads_empty() {
        let local = Arc::new(MemoryLocalStore::new());
        local.write(CART_KEY, "[{\"id\": 12").unwrap();
        let state = CartState::load(local, CART_KEY);
        assert!(state.is_empty());
    }

    #[test]
    fn test_clear_persists_empty_list() {
        let local: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        let mut state = CartState::load(Arc::clone(&local), "liluxe_cart.s1");
        state.add_to_cart(&sample("P1", 5000, &[("M", 4)]), "M", 1, "");
        state.clear_cart();
        assert_eq!(local.read("liluxe_cart.s1").unwrap().as_deref(), Some("[]"));
    }
}
