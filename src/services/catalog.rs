//! Catalog queries: one backend query, then price / size / text filters and
//! pagination over the fetched list.

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::aggregates::{Category, Product};
use crate::store::{self, Direction, DocumentStore, Query, StoreError, PRODUCTS};

pub const PRODUCTS_PER_PAGE: usize = 12;

/// Price bucket used by the shop filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceRange {
    /// Inclusive on both ends, written `min-max`.
    Between(i64, i64),
    /// Open-ended top bucket, written `min+`.
    AtLeast(i64),
}

impl PriceRange {
    pub fn contains(&self, price: i64) -> bool {
        match *self {
            Self::Between(min, max) => price >= min && price <= max,
            Self::AtLeast(min) => price >= min,
        }
    }
}

impl FromStr for PriceRange {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidPriceRange(s.to_string());
        let s = s.trim();
        if let Some(min) = s.strip_suffix('+') {
            return min.trim().parse().map(Self::AtLeast).map_err(|_| invalid());
        }
        let (min, max) = s.split_once('-').ok_or_else(invalid)?;
        let min: i64 = min.trim().parse().map_err(|_| invalid())?;
        let max: i64 = max.trim().parse().map_err(|_| invalid())?;
        if min > max { return Err(invalid()); }
        Ok(Self::Between(min, max))
    }
}

impl<'de> Deserialize<'de> for PriceRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy { #[default] Newest, PriceLow, PriceHigh, Popular }

impl SortBy {
    /// The backend can only order by one key at a time.
    fn order_by(self) -> (&'static str, Direction) {
        match self {
            Self::Newest => ("createdAt", Direction::Desc),
            Self::PriceLow => ("price", Direction::Asc),
            Self::PriceHigh => ("price", Direction::Desc),
            Self::Popular => ("reviewCount", Direction::Desc),
        }
    }
}

impl FromStr for SortBy {
    type Err = CatalogError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::from(s)).map_err(|_| CatalogError::InvalidSort(s.to_string()))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CatalogFilter {
    pub category: Option<Category>,
    pub price_range: Option<PriceRange>,
    pub size: Option<String>,
    pub rating: Option<u8>,
    pub sort_by: SortBy,
    pub search: Option<String>,
}

/// Raw shop query string. Empty values mean "no filter".
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogParams {
    pub category: Option<String>,
    pub price_range: Option<String>,
    pub size: Option<String>,
    pub rating: Option<String>,
    pub sort_by: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CatalogFilter {
    pub fn from_params(params: &CatalogParams) -> Result<Self, CatalogError> {
        let category = present(&params.category)
            .map(|c| serde_json::from_value(serde_json::Value::from(c)).map_err(|_| CatalogError::InvalidCategory(c.to_string())))
            .transpose()?;
        let rating = present(&params.rating)
            .map(|r| r.parse::<u8>().ok().filter(|v| *v <= 5).ok_or_else(|| CatalogError::InvalidRating(r.to_string())))
            .transpose()?;
        Ok(Self {
            category,
            price_range: present(&params.price_range).map(str::parse::<PriceRange>).transpose()?,
            size: present(&params.size).map(str::to_string),
            rating,
            sort_by: present(&params.sort_by).map(str::parse::<SortBy>).transpose()?.unwrap_or_default(),
            search: present(&params.search).map(str::to_string),
        })
    }

    /// Predicates and ordering the backend evaluates.
    pub fn backend_query(&self) -> Query {
        let mut query = Query::new();
        if let Some(category) = self.category {
            query = query.eq("category", category.as_str());
        }
        if let Some(rating) = self.rating.filter(|r| *r > 0) {
            query = query.gte("averageRating", rating);
        }
        let (field, direction) = self.sort_by.order_by();
        query.order_by(field, direction)
    }

    /// Price bucket, then size availability, then text search. Order is preserved.
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let needle = self.search.as_ref().map(|s| s.to_lowercase());
        products.into_iter()
            .filter(|p| self.price_range.map_or(true, |r| r.contains(p.price)))
            .filter(|p| self.size.as_ref().map_or(true, |s| p.has_stock_in(s)))
            .filter(|p| needle.as_ref().map_or(true, |n| p.matches_search(n)))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// 1-based window over an already filtered list.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);
    let items = items.into_iter().skip((page - 1).saturating_mul(per_page)).take(per_page).collect();
    Page { items, page, per_page, total_items, total_pages }
}

/// Result of a shop query. A backend failure leaves the list empty and sets `error`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogListing {
    #[serde(flatten)]
    pub page: Page<Product>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid price range {0:?}")]
    InvalidPriceRange(String),
    #[error("invalid rating {0:?}")]
    InvalidRating(String),
    #[error("invalid category {0:?}")]
    InvalidCategory(String),
    #[error("invalid sort order {0:?}")]
    InvalidSort(String),
    #[error("Product not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Catalog {
    store: Arc<dyn DocumentStore>,
    per_page: usize,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>, per_page: usize) -> Self { Self { store, per_page } }

    pub async fn browse(&self, filter: &CatalogFilter, page: usize) -> CatalogListing {
        match store::fetch_all::<Product>(self.store.as_ref(), PRODUCTS, &filter.backend_query()).await {
            Ok(products) => CatalogListing { page: paginate(filter.apply(products), page, self.per_page), error: None },
            Err(e) => {
                tracing::error!(error = %e, "Error fetching products");
                CatalogListing { page: paginate(Vec::new(), page, self.per_page), error: Some(e.to_string()) }
            }
        }
    }

    pub async fn product(&self, id: &str) -> Result<Product, CatalogError> {
        store::fetch(self.store.as_ref(), PRODUCTS, id).await?.ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}
