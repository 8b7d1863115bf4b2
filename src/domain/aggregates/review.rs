//! Review Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::Rating;

/// A customer's review. Immutable once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    pub user_name: String,
    pub rating: Rating,
    pub comment: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Document id for the (product, user) pair; at most one review exists per pair.
    pub fn key(product_id: &str, user_id: &str) -> String { format!("{product_id}__{user_id}") }
}

/// Running rating aggregate stored on the product.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary { pub average_rating: f64, pub review_count: u32 }

impl RatingSummary {
    /// Mean of all ratings rounded to one decimal; zero for no ratings.
    pub fn from_ratings<I: IntoIterator<Item = Rating>>(ratings: I) -> Self {
        let (sum, count) = ratings.into_iter().fold((0u64, 0u32), |(s, c), r| (s + u64::from(r.value()), c + 1));
        if count == 0 { return Self { average_rating: 0.0, review_count: 0 }; }
        let mean = sum as f64 / f64::from(count);
        Self { average_rating: (mean * 10.0).round() / 10.0, review_count: count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(values: &[u8]) -> Vec<Rating> { values.iter().map(|v| Rating::new(*v).unwrap()).collect() }

    #[test]
    fn test_average_of_five_three_four() {
        let summary = RatingSummary::from_ratings(ratings(&[5, 3, 4]));
        assert_eq!(summary, RatingSummary { average_rating: 4.0, review_count: 3 });
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        assert_eq!(RatingSummary::from_ratings(ratings(&[5, 4, 4])).average_rating, 4.3);
        assert_eq!(RatingSummary::from_ratings(ratings(&[5, 5, 4])).average_rating, 4.7);
        assert_eq!(RatingSummary::from_ratings(ratings(&[])).review_count, 0);
    }
}
