//! Application services
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod events;
pub mod notify;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod users;
pub mod wishlist;

use std::collections::BTreeMap;
use validator::ValidationErrors;

/// Flattens validation errors to one message per field, the first one reported.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors.field_errors().into_iter()
        .filter_map(|(field, errs)| {
            let first = errs.first()?;
            let message = first.message.as_ref().map_or_else(|| first.code.to_string(), ToString::to_string);
            Some((field.to_string(), message))
        })
        .collect()
}
