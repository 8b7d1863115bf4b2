//! HTTP surface.

pub mod admin;
pub mod error;
pub mod extract;
pub mod storefront;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::local::LocalStore;
use crate::media::{BlobStore, MAX_IMAGE_BYTES};
use crate::services::cart::{CartState, CART_KEY};
use crate::services::catalog::Catalog;
use crate::services::checkout::CheckoutService;
use crate::services::events::EventPublisher;
use crate::services::orders::OrderAdmin;
use crate::services::products::ProductAdmin;
use crate::services::reviews::ReviewService;
use crate::services::settings::SettingsService;
use crate::services::users::UserService;
use crate::services::wishlist::{WishlistState, WISHLIST_KEY};
use crate::store::DocumentStore;
use error::ApiError;

/// A shopper's cart and wishlist, keyed by the client-chosen session id.
pub struct Session {
    pub cart: CartState,
    pub wishlist: WishlistState,
}

/// Sessions idle longer than this are dropped from memory by [`Sessions::sweep`].
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct OpenSession {
    session: Arc<Mutex<Session>>,
    last_used: Instant,
}

/// Sessions are loaded from local storage on first mutation and cached until idle.
/// Every mutation is persisted, so an evicted session reloads unchanged.
#[derive(Clone)]
pub struct Sessions {
    local: Arc<dyn LocalStore>,
    open: Arc<DashMap<String, OpenSession>>,
}

pub fn is_valid_session_id(id: &str) -> bool {
    (1..=64).contains(&id.len()) && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

impl Sessions {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self { local, open: Arc::new(DashMap::new()) }
    }

    /// Session for a mutation. Loaded and cached on first use.
    pub async fn get(&self, id: &str) -> Result<Arc<Mutex<Session>>, ApiError> {
        if let Some(session) = self.cached(id)? {
            return Ok(session);
        }
        let loaded = Arc::new(Mutex::new(self.load(id).await?));
        let entry = self.open.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!(session = id, "session opened");
            OpenSession { session: loaded, last_used: Instant::now() }
        });
        Ok(Arc::clone(&entry.session))
    }

    /// Session for a read. An uncached session is loaded but not kept.
    pub async fn view(&self, id: &str) -> Result<Arc<Mutex<Session>>, ApiError> {
        match self.cached(id)? {
            Some(session) => Ok(session),
            None => Ok(Arc::new(Mutex::new(self.load(id).await?))),
        }
    }

    /// Drops sessions idle for at least `idle` that no request is holding. Returns how many went.
    pub fn sweep(&self, idle: Duration) -> usize {
        let before = self.open.len();
        self.open.retain(|_, open| open.last_used.elapsed() < idle || Arc::strong_count(&open.session) > 1);
        let evicted = before.saturating_sub(self.open.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.open.len(), "idle sessions evicted");
        }
        evicted
    }

    pub fn open_count(&self) -> usize { self.open.len() }

    fn cached(&self, id: &str) -> Result<Option<Arc<Mutex<Session>>>, ApiError> {
        if !is_valid_session_id(id) {
            return Err(ApiError::BadRequest(format!("invalid session id {id:?}")));
        }
        Ok(self.open.get_mut(id).map(|mut open| {
            open.last_used = Instant::now();
            Arc::clone(&open.session)
        }))
    }

    async fn load(&self, id: &str) -> Result<Session, ApiError> {
        let local = Arc::clone(&self.local);
        let (cart_key, wishlist_key) = (format!("{CART_KEY}.{id}"), format!("{WISHLIST_KEY}.{id}"));
        tokio::task::spawn_blocking(move || Session {
            cart: CartState::load(Arc::clone(&local), cart_key),
            wishlist: WishlistState::load(local, wishlist_key),
        })
        .await
        .map_err(|e| ApiError::Internal(format!("session load failed: {e}")))
    }
}

/// Evicts idle sessions every `every` until the runtime shuts down.
pub fn spawn_session_sweeper(sessions: Sessions, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        loop {
            tick.tick().await;
            sessions.sweep(SESSION_IDLE_TTL);
        }
    })
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub sessions: Sessions,
    pub catalog: Arc<Catalog>,
    pub checkout: Arc<CheckoutService>,
    pub reviews: Arc<ReviewService>,
    pub orders: Arc<OrderAdmin>,
    pub products: Arc<ProductAdmin>,
    pub settings: Arc<SettingsService>,
    pub users: Arc<UserService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        local: Arc<dyn LocalStore>,
        blobs: Arc<dyn BlobStore>,
        events: Arc<dyn EventPublisher>,
        store_contact: &str,
        products_per_page: usize,
    ) -> Self {
        let settings = Arc::new(SettingsService::new(Arc::clone(&store), store_contact));
        Self {
            sessions: Sessions::new(local),
            catalog: Arc::new(Catalog::new(Arc::clone(&store), products_per_page)),
            checkout: Arc::new(CheckoutService::new(Arc::clone(&store), Arc::clone(&settings), Arc::clone(&events))),
            reviews: Arc::new(ReviewService::new(Arc::clone(&store), Arc::clone(&events))),
            orders: Arc::new(OrderAdmin::new(Arc::clone(&store), Arc::clone(&events))),
            products: Arc::new(ProductAdmin::new(Arc::clone(&store), blobs, events)),
            users: Arc::new(UserService::new(Arc::clone(&store))),
            settings,
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "liluxe-store"})) }))
        .route("/api/v1/products", get(storefront::list_products))
        .route("/api/v1/products/:id", get(storefront::get_product))
        .route("/api/v1/products/:id/reviews", get(storefront::list_reviews).post(storefront::submit_review))
        .route("/api/v1/cart/:session", get(storefront::get_cart).post(storefront::add_to_cart).put(storefront::update_cart).delete(storefront::clear_cart))
        .route("/api/v1/cart/:session/items", delete(storefront::remove_from_cart))
        .route("/api/v1/wishlist/:session", get(storefront::get_wishlist))
        .route("/api/v1/wishlist/:session/toggle", post(storefront::toggle_wishlist))
        .route("/api/v1/checkout/:session", post(storefront::checkout))
        .route("/api/v1/orders/track", get(storefront::track_orders))
        .route("/api/v1/users", post(storefront::ensure_profile))
        .route("/api/v1/users/me", get(storefront::me))
        .route("/api/v1/admin/orders", get(admin::list_orders).delete(admin::delete_all_orders))
        .route("/api/v1/admin/orders/:id", delete(admin::delete_order))
        .route("/api/v1/admin/orders/:id/status", put(admin::set_order_status))
        .route("/api/v1/admin/products", post(admin::create_product))
        .route("/api/v1/admin/products/:id", put(admin::update_product).delete(admin::delete_product))
        .route("/api/v1/admin/products/:id/images", post(admin::upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES * 2)))
        .route("/api/v1/admin/settings", get(admin::get_settings).put(admin::save_settings))
        .route("/api/v1/admin/dashboard", get(admin::dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;
    use crate::local::MemoryLocalStore;

    #[test]
    fn test_session_ids() {
        assert!(is_valid_session_id("abc-123_XYZ"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("../etc"));
        assert!(!is_valid_session_id(&"a".repeat(65)));
    }

    fn sessions() -> Sessions { Sessions::new(Arc::new(MemoryLocalStore::new())) }

    #[tokio::test]
    async fn test_reads_do_not_cache_unknown_sessions() {
        let sessions = sessions();
        for n in 0..20 {
            let session = sessions.view(&format!("visitor-{n}")).await.unwrap();
            assert!(session.lock().await.cart.is_empty());
        }
        assert_eq!(sessions.open_count(), 0);
        assert!(matches!(sessions.view("../x").await, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_mutations_share_one_cached_session() {
        let sessions = sessions();
        let a = sessions.get("s1").await.unwrap();
        let b = sessions.get("s1").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &sessions.view("s1").await.unwrap()));
        assert_eq!(sessions.open_count(), 1);
    }

    #[tokio::test]
    async fn test_sweep_evicts_idle_sessions_and_reload_keeps_state() {
        let sessions = sessions();
        {
            let session = sessions.get("s1").await.unwrap();
            session.lock().await.cart.add_to_cart(&sample("P1", 5000, &[("M", 3)]), "M", 2, "");
        }
        let held = sessions.get("s2").await.unwrap();

        assert_eq!(sessions.sweep(Duration::from_secs(3600)), 0);
        assert_eq!(sessions.sweep(Duration::ZERO), 1);
        assert_eq!(sessions.open_count(), 1);
        drop(held);
        assert_eq!(sessions.sweep(Duration::ZERO), 1);
        assert_eq!(sessions.open_count(), 0);

        let reloaded = sessions.view("s1").await.unwrap();
        assert_eq!(reloaded.lock().await.cart.count(), 2);
    }
}
