//! Liluxe Store
//!
//! Back end for a small Nigerian fashion storefront.
//!
//! ## Features
//! - Product catalog browsing, filtering and pagination
//! - Per-session cart and wishlist kept in local durable storage
//! - Checkout with stock reconciliation and a chat notification handoff
//! - Customer reviews with a running rating aggregate
//! - Order tracking by phone number
//! - Admin product, order and settings management

pub mod api;
pub mod config;
pub mod domain;
pub mod local;
pub mod media;
pub mod services;
pub mod store;

use thiserror::Error;

use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderAdminError;
use crate::services::products::ProductError;
use crate::services::reviews::ReviewError;

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Local(#[from] local::LocalStoreError),

    #[error(transparent)]
    Blob(#[from] media::BlobError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    OrderAdmin(#[from] OrderAdminError),

    #[error(transparent)]
    Product(#[from] ProductError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
