//! Cart Aggregate

use serde::{Deserialize, Serialize};
use super::product::{Category, Product};

pub const PLACEHOLDER_IMAGE: &str = "/placeholder.png";

/// One (product, size, color) selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(rename = "id")]
    pub product_id: String,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub category: Category,
    pub selected_size: String,
    #[serde(default)]
    pub selected_color: String,
    pub quantity: u32,
    /// Stock of the selected size when the line was first added.
    pub max_stock: u32,
}

impl CartLine {
    pub fn line_total(&self) -> i64 { self.price * i64::from(self.quantity) }

    fn is(&self, product_id: &str, size: &str, color: &str) -> bool {
        self.product_id == product_id && self.selected_size == size && self.selected_color == color
    }
}

/// Ordered list of line items, unique by (product, size, color).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }
    pub fn from_lines(lines: Vec<CartLine>) -> Self { Self { lines } }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    /// Sum of quantities.
    pub fn count(&self) -> u32 { self.lines.iter().map(|l| l.quantity).sum() }

    /// Sum of price times quantity.
    pub fn total(&self) -> i64 { self.lines.iter().map(CartLine::line_total).sum() }

    /// Merges into an existing line with the same key, otherwise appends a new one.
    /// The merge path does not clamp against `max_stock`.
    pub fn add(&mut self, product: &Product, size: &str, quantity: u32, color: &str) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.is(&product.id, size, color)) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            return;
        }
        self.lines.push(CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.first_image().unwrap_or(PLACEHOLDER_IMAGE).to_string(),
            category: product.category,
            selected_size: size.to_string(),
            selected_color: color.to_string(),
            quantity,
            max_stock: product.stock_for(size),
        });
    }

    /// Quantities below one remove the line; otherwise the quantity is clamped to `max_stock`.
    pub fn update_quantity(&mut self, product_id: &str, size: &str, quantity: i64, color: &str) {
        if quantity < 1 { return self.remove(product_id, size, color); }
        if let Some(line) = self.lines.iter_mut().find(|l| l.is(product_id, size, color)) {
            let wanted = u32::try_from(quantity).unwrap_or(u32::MAX);
            line.quantity = wanted.min(line.max_stock);
        }
    }

    pub fn remove(&mut self, product_id: &str, size: &str, color: &str) {
        self.lines.retain(|l| !l.is(product_id, size, color));
    }

    pub fn clear(&mut self) { self.lines.clear(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;

    #[test]
    fn test_repeated_add_merges_without_clamp() {
        let p = sample("P1", 5000, &[("M", 2)]);
        let mut cart = Cart::new();
        cart.add(&p, "M", 1, "");
        cart.add(&p, "M", 2, "");
        cart.add(&p, "M", 4, "");
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 7);
        assert_eq!(cart.lines()[0].max_stock, 2);
    }

    #[test]
    fn test_key_includes_size_and_color() {
        let p = sample("P1", 5000, &[("M", 2), ("L", 3)]);
        let mut cart = Cart::new();
        cart.add(&p, "M", 1, "");
        cart.add(&p, "L", 1, "");
        cart.add(&p, "M", 1, "Red");
        assert_eq!(cart.lines().len(), 3);
        assert_eq!(cart.lines()[1].max_stock, 3);
    }

    #[test]
    fn test_missing_size_snapshots_zero_stock() {
        let p = sample("P1", 5000, &[("M", 2)]);
        let mut cart = Cart::new();
        cart.add(&p, "XXL", 1, "");
        assert_eq!(cart.lines()[0].max_stock, 0);
    }

    #[test]
    fn test_update_below_one_removes() {
        let p = sample("P1", 5000, &[("M", 2)]);
        let mut with_update = Cart::new();
        with_update.add(&p, "M", 2, "");
        let mut with_remove = with_update.clone();
        with_update.update_quantity("P1", "M", 0, "");
        with_remove.remove("P1", "M", "");
        assert_eq!(with_update, with_remove);
        assert!(with_update.is_empty());
    }

    #[test]
    fn test_update_clamps_to_max_stock() {
        let p = sample("P1", 5000, &[("M", 3)]);
        let mut cart = Cart::new();
        cart.add(&p, "M", 1, "");
        cart.update_quantity("P1", "M", 10, "");
        assert_eq!(cart.lines()[0].quantity, 3);
        cart.update_quantity("P1", "M", 2, "");
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_count_and_total() {
        let a = sample("A", 5000, &[("M", 9)]);
        let b = sample("B", 15000, &[("S", 9)]);
        let mut cart = Cart::new();
        cart.add(&a, "M", 2, "");
        cart.add(&b, "S", 3, "");
        assert_eq!(cart.count(), 5);
        assert_eq!(cart.total(), 2 * 5000 + 3 * 15000);
        cart.clear();
        assert_eq!((cart.count(), cart.total()), (0, 0));
    }

    #[test]
    fn test_lines_serialize_with_storefront_keys() {
        let p = sample("P1", 5000, &[("M", 2)]);
        let mut cart = Cart::new();
        cart.add(&p, "M", 1, "");
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json[0]["id"], "P1");
        assert_eq!(json[0]["selectedSize"], "M");
        assert_eq!(json[0]["maxStock"], 2);
    }
}
