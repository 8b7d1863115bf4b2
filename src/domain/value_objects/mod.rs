//! Value Objects for the storefront

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const COUNTRY_CODE: &str = "234";

/// Nigerian phone number in canonical form (`+234` followed by the subscriber digits).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Validates and normalizes user input.
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        if raw.trim().is_empty() { return Err(PhoneError::Missing); }
        if !Self::is_valid(raw) { return Err(PhoneError::Invalid); }
        Ok(Self(Self::normalize(raw)))
    }

    /// Accepts 10 bare digits, 11 digits with a leading zero, or 13 digits with the country code.
    /// Separators such as spaces, dashes and `+` are ignored.
    pub fn is_valid(raw: &str) -> bool {
        let digits = digits_of(raw);
        match digits.len() {
            10 => true,
            11 => digits.starts_with('0'),
            13 => digits.starts_with(COUNTRY_CODE),
            _ => false,
        }
    }

    /// Strips everything but digits, then a leading country code, then a leading zero,
    /// and prepends `+234`. Does not validate.
    pub fn normalize(raw: &str) -> String {
        let digits = digits_of(raw);
        let rest = digits.strip_prefix(COUNTRY_CODE).unwrap_or(&digits);
        let rest = rest.strip_prefix('0').unwrap_or(rest);
        format!("+{COUNTRY_CODE}{rest}")
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

fn digits_of(raw: &str) -> String { raw.chars().filter(char::is_ascii_digit).collect() }

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("Phone number is required")]
    Missing,
    #[error("Please enter a valid Nigerian phone number")]
    Invalid,
}

/// Star rating from 1 to 5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, RatingError> {
        match value {
            0 => Err(RatingError::Missing),
            1..=5 => Ok(Self(value)),
            _ => Err(RatingError::OutOfRange(value)),
        }
    }
    pub fn value(self) -> u8 { self.0 }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;
    fn try_from(value: u8) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self { rating.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error("Please select a rating")]
    Missing,
    #[error("Rating must be between 1 and 5, got {0}")]
    OutOfRange(u8),
}

/// Formats a whole-naira amount with thousands separators, e.g. `₦15,000`.
pub fn format_naira(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 { grouped.push(','); }
        grouped.push(ch);
    }
    if amount < 0 { format!("-₦{grouped}") } else { format!("₦{grouped}") }
}
