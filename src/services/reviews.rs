//! Review submission and the product rating aggregate.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::aggregates::{RatingSummary, Review, User};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{Rating, RatingError};
use crate::services::events::{publish_detached, EventPublisher};
use crate::store::{self, Direction, DocumentStore, Fields, Query, StoreError, PRODUCTS, REVIEWS};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Please select a rating")]
    MissingRating,
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("Please write a review")]
    EmptyComment,
    #[error("Product {0} not found")]
    ProductNotFound(String),
    #[error("You have already reviewed this product")]
    AlreadyReviewed,
    #[error("Failed to submit review: {0}")]
    Store(#[from] StoreError),
}

impl From<RatingError> for ReviewError {
    fn from(e: RatingError) -> Self {
        match e {
            RatingError::Missing => Self::MissingRating,
            RatingError::OutOfRange(v) => Self::InvalidRating(v),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

pub struct ReviewService {
    store: Arc<dyn DocumentStore>,
    events: Arc<dyn EventPublisher>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Reviews for a product, newest first.
    pub async fn list(&self, product_id: &str) -> Result<Vec<Review>, StoreError> {
        let query = Query::new().eq("productId", product_id).order_by("createdAt", Direction::Desc);
        store::fetch_all(self.store.as_ref(), REVIEWS, &query).await
    }

    pub async fn has_reviewed(&self, product_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let query = Query::new().eq("productId", product_id).eq("userId", user_id);
        Ok(!self.store.query(REVIEWS, &query).await?.is_empty())
    }

    /// Stores the review and refreshes the product's rating aggregate.
    ///
    /// The review id is derived from the product and user, so two concurrent
    /// submissions by one user cannot both land.
    pub async fn submit(&self, product_id: &str, user: &User, form: &ReviewForm) -> Result<Review, ReviewError> {
        let rating = Rating::new(form.rating)?;
        let comment = form.comment.trim();
        if comment.is_empty() { return Err(ReviewError::EmptyComment); }

        if self.store.get(PRODUCTS, product_id).await?.is_none() {
            return Err(ReviewError::ProductNotFound(product_id.to_string()));
        }
        if self.has_reviewed(product_id, &user.id).await? {
            return Err(ReviewError::AlreadyReviewed);
        }

        let review = Review {
            id: Review::key(product_id, &user.id),
            product_id: product_id.to_string(),
            user_id: user.id.clone(),
            user_name: user.display_name().to_string(),
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        };
        match self.store.create(REVIEWS, &review.id, store::encode(&review)?).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => return Err(ReviewError::AlreadyReviewed),
            Err(e) => {
                tracing::error!(product_id, user_id = %user.id, error = %e, "Error submitting review");
                return Err(e.into());
            }
        }
        tracing::info!(product_id, user_id = %user.id, rating = rating.value(), "review submitted");

        self.recompute(product_id).await?;
        Ok(review)
    }

    /// Rebuilds `{averageRating, reviewCount}` from every stored review of the product.
    pub async fn recompute(&self, product_id: &str) -> Result<RatingSummary, StoreError> {
        let query = Query::new().eq("productId", product_id);
        let reviews: Vec<Review> = store::fetch_all(self.store.as_ref(), REVIEWS, &query).await?;
        let summary = RatingSummary::from_ratings(reviews.iter().map(|r| r.rating));

        let mut patch = Fields::new();
        patch.insert("averageRating".into(), summary.average_rating.into());
        patch.insert("reviewCount".into(), summary.review_count.into());
        self.store.update(PRODUCTS, product_id, patch).await?;

        publish_detached(&self.events, DomainEvent::Product(ProductEvent::RatingRecomputed {
            product_id: product_id.to_string(), summary,
        }));
        Ok(summary)
    }
}
