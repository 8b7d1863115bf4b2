//! Shopper-facing handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::extract::{CurrentUser, MaybeUser, UserId};
use super::AppState;
use crate::domain::aggregates::{CartLine, Order, Product, Review, User};
use crate::services::cart::CartState;
use crate::services::catalog::{CatalogFilter, CatalogListing, CatalogParams};
use crate::services::checkout::{CheckoutForm, CheckoutReceipt};
use crate::services::reviews::ReviewForm;
use crate::services::wishlist::WishlistMirror;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub async fn list_products(State(s): State<AppState>, Query(p): Query<CatalogParams>) -> Result<Json<CatalogListing>, ApiError> {
    let filter = CatalogFilter::from_params(&p)?;
    Ok(Json(s.catalog.browse(&filter, p.page.unwrap_or(1)).await))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>, ApiError> {
    Ok(Json(s.catalog.product(&id).await?))
}

pub async fn list_reviews(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(s.reviews.list(&id).await?))
}

pub async fn submit_review(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(form): Json<ReviewForm>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.reviews.submit(&id, &user, &form).await?)))
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub count: u32,
    pub total: i64,
}

impl From<&CartState> for CartView {
    fn from(cart: &CartState) -> Self {
        Self { items: cart.lines().to_vec(), count: cart.count(), total: cart.total() }
    }
}

fn default_quantity() -> u32 { 1 }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: String,
    pub size: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    pub product_id: String,
    pub size: String,
    pub quantity: i64,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRef {
    pub product_id: String,
    pub size: String,
    #[serde(default)]
    pub color: String,
}

pub async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<CartView>, ApiError> {
    let session = s.sessions.view(&session).await?;
    let session = session.lock().await;
    Ok(Json(CartView::from(&session.cart)))
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<AddToCartRequest>,
) -> Result<Json<CartView>, ApiError> {
    if r.quantity == 0 {
        return Err(ApiError::BadRequest("Quantity must be at least 1".into()));
    }
    let product = s.catalog.product(&r.product_id).await?;
    if !product.sizes.iter().any(|entry| entry.size == r.size) {
        return Err(ApiError::BadRequest("Please select a size".into()));
    }
    if !r.color.is_empty() && !product.colors.iter().any(|c| c.name == r.color) {
        return Err(ApiError::BadRequest("Please select a valid color".into()));
    }
    let session = s.sessions.get(&session).await?;
    let mut session = session.lock().await;
    let in_cart = session.cart.lines().iter().any(|l| l.product_id == product.id && l.selected_size == r.size && l.selected_color == r.color);
    if !in_cart {
        // New lines start within the size's stock; merges into an existing line are not capped.
        match product.stock_for(&r.size) {
            0 => return Err(ApiError::BadRequest("This size is out of stock".into())),
            stock if r.quantity > stock => return Err(ApiError::BadRequest(format!("Only {stock} left in this size"))),
            _ => {}
        }
    }
    session.cart.add_to_cart(&product, &r.size, r.quantity, &r.color);
    Ok(Json(CartView::from(&session.cart)))
}

pub async fn update_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let session = s.sessions.get(&session).await?;
    let mut session = session.lock().await;
    session.cart.update_quantity(&r.product_id, &r.size, r.quantity, &r.color);
    Ok(Json(CartView::from(&session.cart)))
}

pub async fn remove_from_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<CartLineRef>,
) -> Result<Json<CartView>, ApiError> {
    let session = s.sessions.get(&session).await?;
    let mut session = session.lock().await;
    session.cart.remove_from_cart(&r.product_id, &r.size, &r.color);
    Ok(Json(CartView::from(&session.cart)))
}

pub async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<StatusCode, ApiError> {
    let session = s.sessions.get(&session).await?;
    session.lock().await.cart.clear_cart();
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Wishlist
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WishlistView {
    pub items: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub product_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub product_id: String,
    pub in_wishlist: bool,
    pub count: usize,
}

pub async fn get_wishlist(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<WishlistView>, ApiError> {
    let session = s.sessions.view(&session).await?;
    let session = session.lock().await;
    Ok(Json(WishlistView { items: session.wishlist.ids().to_vec(), count: session.wishlist.count() }))
}

pub async fn toggle_wishlist(
    State(s): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(session): Path<String>,
    Json(r): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let session = s.sessions.get(&session).await?;
    let mut session = session.lock().await;
    let mirror = user.as_ref().map(|u| WishlistMirror { store: s.store.as_ref(), user_id: &u.id });
    let in_wishlist = session.wishlist.toggle(&r.product_id, mirror).await;
    Ok(Json(ToggleResponse { product_id: r.product_id, in_wishlist, count: session.wishlist.count() }))
}

// ---------------------------------------------------------------------------
// Checkout and tracking
// ---------------------------------------------------------------------------

pub async fn checkout(
    State(s): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(session): Path<String>,
    Json(form): Json<CheckoutForm>,
) -> Result<(StatusCode, Json<CheckoutReceipt>), ApiError> {
    let session = s.sessions.get(&session).await?;
    let mut session = session.lock().await;
    let receipt = s.checkout.place_order(&mut session.cart, &form, user.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    #[serde(default)]
    pub phone: String,
}

pub async fn track_orders(State(s): State<AppState>, Query(p): Query<TrackParams>) -> Result<Json<Vec<Order>>, ApiError> {
    if p.phone.trim().is_empty() {
        return Err(ApiError::BadRequest("Please enter a phone number".into()));
    }
    Ok(Json(s.orders.track_by_phone(&p.phone).await?))
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub email: String,
    pub name: Option<String>,
}

pub async fn ensure_profile(
    State(s): State<AppState>,
    UserId(id): UserId,
    Json(r): Json<ProfileRequest>,
) -> Result<Json<User>, ApiError> {
    if r.email.trim().is_empty() {
        return Err(ApiError::BadRequest("Email is required".into()));
    }
    Ok(Json(s.users.ensure_profile(&id, r.email.trim(), r.name.as_deref()).await?))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
