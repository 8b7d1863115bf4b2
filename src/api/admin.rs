//! Admin handlers. Every handler takes `AdminUser`, so non-admins get 403.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::ApiError;
use super::extract::AdminUser;
use super::AppState;
use crate::domain::aggregates::{NotificationSettings, OrderStatus, Product, ProductDraft};
use crate::domain::value_objects::{Phone, PhoneError};
use crate::services::orders::{BulkDeleteReport, DashboardStats, OrderListing};

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
}

fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.parse::<OrderStatus>().map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub async fn list_orders(State(s): State<AppState>, _admin: AdminUser, Query(f): Query<OrderFilter>) -> Result<Json<OrderListing>, ApiError> {
    let status = f.status.as_deref().map(str::trim).filter(|v| !v.is_empty() && *v != "all").map(parse_status).transpose()?;
    Ok(Json(s.orders.list(status).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn set_order_status(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(r): Json<StatusRequest>,
) -> Result<StatusCode, ApiError> {
    let status = parse_status(&r.status)?;
    s.orders.set_status(&id, status).await?;
    tracing::debug!(admin = %admin.id, order_id = %id, "status set by admin");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_order(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    s.orders.delete_one(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all_orders(State(s): State<AppState>, _admin: AdminUser) -> Result<Json<BulkDeleteReport>, ApiError> {
    Ok(Json(s.orders.delete_all().await?))
}

pub async fn dashboard(State(s): State<AppState>, _admin: AdminUser) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(s.orders.dashboard(Utc::now()).await?))
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub async fn create_product(State(s): State<AppState>, _admin: AdminUser, Json(draft): Json<ProductDraft>) -> Result<(StatusCode, Json<Product>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.products.create(draft).await?)))
}

pub async fn update_product(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(s.products.update(&id, draft).await?))
}

pub async fn delete_product(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    s.products.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

pub async fn upload_image(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Query(p): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    let url = s.products.upload_image(&id, &p.name, content_type, &body).await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub async fn get_settings(State(s): State<AppState>, _admin: AdminUser) -> Result<Json<NotificationSettings>, ApiError> {
    Ok(Json(s.settings.load().await?))
}

/// The contact number is validated and stored in `+234` form.
pub async fn save_settings(
    State(s): State<AppState>,
    _admin: AdminUser,
    Json(mut settings): Json<NotificationSettings>,
) -> Result<Json<NotificationSettings>, ApiError> {
    let phone = Phone::parse(&settings.phone_number).map_err(|e| {
        let message = match e {
            PhoneError::Missing => "WhatsApp number is required",
            PhoneError::Invalid => "Please enter a valid phone number",
        };
        ApiError::Invalid {
            message: "Please fix the errors in the form".into(),
            fields: BTreeMap::from([("phoneNumber".to_string(), message.to_string())]),
        }
    })?;
    settings.phone_number = phone.to_string();
    s.settings.save(&settings).await?;
    Ok(Json(settings))
}
