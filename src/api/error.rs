//! HTTP error mapping.
//!
//! Handlers return `Result<T, ApiError>`. Server-side failures are logged here
//! and answered with a generic message; everything else echoes the domain error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::local::LocalStoreError;
use crate::media::BlobError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderAdminError;
use crate::services::products::ProductError;
use crate::services::reviews::ReviewError;
use crate::store::StoreError;
use crate::StorefrontError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Please sign in to continue")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Invalid { message: String, fields: BTreeMap<String, String> },

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    App(#[from] StorefrontError),
}

macro_rules! via_storefront_error {
    ($($source:ty),* $(,)?) => {
        $(impl From<$source> for ApiError {
            fn from(e: $source) -> Self { Self::App(e.into()) }
        })*
    };
}

via_storefront_error!(StoreError, LocalStoreError, BlobError, CatalogError, CheckoutError, ReviewError, OrderAdminError, ProductError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn blob_status(e: &BlobError) -> StatusCode {
    match e {
        BlobError::Empty | BlobError::UnsupportedType(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BlobError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        BlobError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        BlobError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        use StorefrontError as E;
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Invalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::App(app) => match app {
                E::Store(e) | E::Catalog(CatalogError::Store(e)) | E::Checkout(CheckoutError::Store(e))
                | E::Review(ReviewError::Store(e)) | E::OrderAdmin(OrderAdminError::Store(e))
                | E::Product(ProductError::Store(e)) => store_status(e),
                E::Blob(e) | E::Product(ProductError::Blob(e)) => blob_status(e),
                E::Catalog(CatalogError::NotFound(_)) | E::OrderAdmin(OrderAdminError::NotFound(_))
                | E::Product(ProductError::NotFound(_)) | E::Review(ReviewError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
                E::Catalog(_) | E::Checkout(CheckoutError::EmptyCart) => StatusCode::BAD_REQUEST,
                E::Checkout(CheckoutError::Invalid(_)) | E::Product(ProductError::Invalid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
                E::Review(ReviewError::AlreadyReviewed) => StatusCode::CONFLICT,
                E::Review(_) => StatusCode::UNPROCESSABLE_ENTITY,
                E::Config(_) | E::Local(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn fields(&self) -> Option<BTreeMap<String, String>> {
        match self {
            Self::Invalid { fields, .. }
            | Self::App(StorefrontError::Checkout(CheckoutError::Invalid(fields)))
            | Self::App(StorefrontError::Product(ProductError::Invalid(fields))) => Some(fields.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error, fields: self.fields() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(CheckoutError::EmptyCart).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(ReviewError::AlreadyReviewed).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(ReviewError::MissingRating).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::from(OrderAdminError::NotFound("o1".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(CheckoutError::Store(StoreError::Unavailable("down".into()))).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::from(StoreError::not_found("orders", "o1")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(ProductError::Blob(BlobError::TooLarge(6 << 20))).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::Internal("session load failed".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_fields_are_exposed_for_form_errors() {
        let fields = BTreeMap::from([("phone".to_string(), "Phone number is required".to_string())]);
        let err = ApiError::from(CheckoutError::Invalid(fields.clone()));
        assert_eq!(err.fields(), Some(fields));
        assert!(ApiError::Forbidden.fields().is_none());
    }
}
