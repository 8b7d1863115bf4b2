//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use validator::{Validate, ValidationError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub category: Category,
    pub price: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
    #[serde(default)]
    pub colors: Vec<ColorOption>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeStock { pub size: String, pub stock: u32 }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorOption { pub name: String, pub hex: String }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category { Clothes, Bags, Shoes }

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Clothes => "clothes", Self::Bags => "bags", Self::Shoes => "shoes" }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Stock level of one size before and after a decrement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StockChange { pub before: u32, pub after: u32 }

impl StockChange {
    /// The requested quantity could not be fully covered by the stock on hand.
    pub fn is_shortfall(&self, requested: u32) -> bool { requested > self.before }
}

impl Product {
    /// Units on hand for `size`, zero when the product does not carry it.
    pub fn stock_for(&self, size: &str) -> u32 {
        self.sizes.iter().find(|s| s.size == size).map_or(0, |s| s.stock)
    }

    pub fn has_stock_in(&self, size: &str) -> bool { self.stock_for(size) > 0 }

    pub fn first_image(&self) -> Option<&str> { self.images.first().map(String::as_str) }

    /// Case-insensitive substring match on name or description. `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }

    /// Removes `quantity` units of `size`, never going below zero.
    /// Returns `None` if the product has no such size.
    pub fn take_stock(&mut self, size: &str, quantity: u32) -> Option<StockChange> {
        let entry = self.sizes.iter_mut().find(|s| s.size == size)?;
        let before = entry.stock;
        entry.stock = before.saturating_sub(quantity);
        Some(StockChange { before, after: entry.stock })
    }
}

/// Admin input for creating or replacing a product.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[validate(custom(function = "not_blank", message = "Product name is required"))]
    pub name: String,
    pub category: Category,
    #[validate(range(min = 1, message = "Valid price is required"))]
    pub price: i64,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "At least one image is required"))]
    pub images: Vec<String>,
    #[validate(length(min = 1, message = "At least one size is required"), custom = "valid_sizes")]
    pub sizes: Vec<SizeStock>,
    #[serde(default)]
    pub colors: Vec<ColorOption>,
}

impl ProductDraft {
    /// Builds a fresh product with an empty rating aggregate.
    pub fn into_product(self, id: String, now: DateTime<Utc>) -> Product {
        let mut product = Product {
            id, name: String::new(), category: self.category, price: 0, description: String::new(),
            images: vec![], sizes: vec![], colors: vec![], average_rating: 0.0, review_count: 0,
            created_at: now, updated_at: None,
        };
        self.apply_to(&mut product);
        product
    }

    /// Overwrites the editable fields. Rating aggregate and creation time are kept.
    pub fn apply_to(self, product: &mut Product) {
        product.name = self.name.trim().to_string();
        product.category = self.category;
        product.price = self.price;
        product.description = self.description.trim().to_string();
        product.images = self.images;
        product.sizes = self.sizes.into_iter().map(|s| SizeStock { size: s.size.trim().to_string(), stock: s.stock }).collect();
        product.colors = self.colors.into_iter().map(|c| ColorOption { name: c.name.trim().to_string(), hex: c.hex }).collect();
    }
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { Err(ValidationError::new("blank")) } else { Ok(()) }
}

fn valid_sizes(sizes: &[SizeStock]) -> Result<(), ValidationError> {
    if sizes.iter().any(|s| s.size.trim().is_empty()) {
        let mut err = ValidationError::new("size_name");
        err.message = Some("All sizes must have a name".into());
        return Err(err);
    }
    let mut seen = HashSet::new();
    if !sizes.iter().all(|s| seen.insert(s.size.trim())) {
        let mut err = ValidationError::new("size_unique");
        err.message = Some("Sizes must be unique".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample(id: &str, price: i64, sizes: &[(&str, u32)]) -> Product {
    Product {
        id: id.into(), name: format!("Item {id}"), category: Category::Clothes, price,
        description: String::new(), images: vec![format!("https://img/{id}.jpg")],
        sizes: sizes.iter().map(|(s, n)| SizeStock { size: (*s).into(), stock: *n }).collect(),
        colors: vec![], average_rating: 0.0, review_count: 0, created_at: Utc::now(), updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "  Ankara Wrap Dress ".into(), category: Category::Clothes, price: 25000,
            description: "Hand-dyed".into(), images: vec!["https://img/1.jpg".into()],
            sizes: vec![SizeStock { size: "M".into(), stock: 4 }], colors: vec![],
        }
    }

    #[test]
    fn test_take_stock_saturates() {
        let mut p = sample("p1", 1000, &[("S", 2), ("M", 5)]);
        assert_eq!(p.take_stock("S", 3), Some(StockChange { before: 2, after: 0 }));
        assert_eq!(p.take_stock("M", 1), Some(StockChange { before: 5, after: 4 }));
        assert_eq!(p.take_stock("XL", 1), None);
        assert!(StockChange { before: 2, after: 0 }.is_shortfall(3));
    }

    #[test]
    fn test_stock_lookup() {
        let p = sample("p1", 1000, &[("S", 0), ("M", 5)]);
        assert_eq!(p.stock_for("M"), 5);
        assert_eq!(p.stock_for("L"), 0);
        assert!(!p.has_stock_in("S"));
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft().validate().is_ok());

        let mut d = draft();
        d.name = "   ".into();
        d.price = 0;
        d.images.clear();
        let errors = d.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("images"));

        let mut d = draft();
        d.sizes.push(SizeStock { size: "M ".into(), stock: 1 });
        assert!(d.validate().unwrap_err().field_errors().contains_key("sizes"));
    }

    #[test]
    fn test_draft_into_product_trims_and_resets_rating() {
        let p = draft().into_product("p9".into(), Utc::now());
        assert_eq!(p.name, "Ankara Wrap Dress");
        assert_eq!(p.review_count, 0);
        assert_eq!(p.average_rating, 0.0);
    }

    #[test]
    fn test_serde_uses_camel_case_and_millis() {
        let p = sample("p1", 1000, &[("S", 1)]);
        let value = serde_json::to_value(&p).unwrap();
        assert!(value.get("averageRating").is_some());
        assert!(value["createdAt"].is_i64());
        assert_eq!(value["category"], "clothes");
    }
}
