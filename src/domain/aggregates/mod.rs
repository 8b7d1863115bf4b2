//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod review;
pub mod user;
pub mod settings;

pub use product::{Category, ColorOption, Product, ProductDraft, SizeStock, StockChange};
pub use order::{Order, OrderLine, OrderStatus, UnknownStatus};
pub use cart::{Cart, CartLine};
pub use review::{RatingSummary, Review};
pub use user::{Role, User};
pub use settings::NotificationSettings;
