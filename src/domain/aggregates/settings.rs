//! Store settings document

use serde::{Deserialize, Serialize};

/// Where the order notification handoff is addressed, and whether it fires at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub phone_number: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool { true }

impl NotificationSettings {
    pub fn new(phone_number: impl Into<String>) -> Self { Self { phone_number: phone_number.into(), enabled: true } }

    /// The contact in the bare-digit form used by messaging links.
    pub fn contact_digits(&self) -> String { self.phone_number.chars().filter(char::is_ascii_digit).collect() }
}
