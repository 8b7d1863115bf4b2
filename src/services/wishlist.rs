//! Wishlist state: local set of product ids, mirrored to the signed-in user's profile.

use serde_json::Value;
use std::sync::Arc;

use crate::local::{self, LocalStore};
use crate::store::{DocumentStore, USERS};

pub const WISHLIST_KEY: &str = "liluxe_wishlist";

/// Remote copy of the wishlist on a user document.
#[derive(Clone, Copy)]
pub struct WishlistMirror<'a> {
    pub store: &'a dyn DocumentStore,
    pub user_id: &'a str,
}

/// Local state is authoritative. Remote writes are best-effort and never rolled back locally.
pub struct WishlistState {
    key: String,
    local: Arc<dyn LocalStore>,
    ids: Vec<String>,
}

impl WishlistState {
    pub fn load(local: Arc<dyn LocalStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let mut ids: Vec<String> = local::load_list(local.as_ref(), &key);
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        Self { key, local, ids }
    }

    pub fn ids(&self) -> &[String] { &self.ids }
    pub fn count(&self) -> usize { self.ids.len() }
    pub fn is_member(&self, product_id: &str) -> bool { self.ids.iter().any(|id| id == product_id) }

    pub async fn add(&mut self, product_id: &str, mirror: Option<WishlistMirror<'_>>) {
        if self.is_member(product_id) { return; }
        self.ids.push(product_id.to_string());
        self.persist();
        if let Some(m) = mirror {
            if let Err(e) = m.store.array_add(USERS, m.user_id, "wishlist", Value::from(product_id)).await {
                tracing::error!(user_id = m.user_id, product_id, error = %e, "Error syncing wishlist");
            }
        }
    }

    pub async fn remove(&mut self, product_id: &str, mirror: Option<WishlistMirror<'_>>) {
        self.ids.retain(|id| id != product_id);
        self.persist();
        if let Some(m) = mirror {
            if let Err(e) = m.store.array_remove(USERS, m.user_id, "wishlist", Value::from(product_id)).await {
                tracing::error!(user_id = m.user_id, product_id, error = %e, "Error syncing wishlist");
            }
        }
    }

    /// Adds when absent, removes when present. Returns whether the product is now a member.
    pub async fn toggle(&mut self, product_id: &str, mirror: Option<WishlistMirror<'_>>) -> bool {
        if self.is_member(product_id) {
            self.remove(product_id, mirror).await;
            false
        } else {
            self.add(product_id, mirror).await;
            true
        }
    }

    fn persist(&self) {
        if let Err(e) = local::save_list(self.local.as_ref(), &self.key, &self.ids) {
            tracing::error!(key = %self.key, error = %e, "Error saving wishlist");
        }
    }
}
