//! User profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Same as the identity provider's user id.
    #[serde(default)]
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub wishlist: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] Customer, Admin }

impl User {
    /// New customer profile. A missing name falls back to the email's local part.
    pub fn signup(id: impl Into<String>, email: &str, name: Option<&str>, now: DateTime<Utc>) -> Self {
        let name = name.map(str::trim).filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email))
            .to_string();
        Self { id: id.into(), email: email.to_string(), name, role: Role::Customer, created_at: now, wishlist: vec![] }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Name shown on reviews.
    pub fn display_name(&self) -> &str { if self.name.is_empty() { &self.email } else { &self.name } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_defaults() {
        let u = User::signup("uid-1", "ada@liluxe.ng", None, Utc::now());
        assert_eq!(u.name, "ada");
        assert_eq!(u.role, Role::Customer);
        assert!(!u.is_admin());
        let u = User::signup("uid-2", "bola@liluxe.ng", Some(" Bola "), Utc::now());
        assert_eq!(u.display_name(), "Bola");
    }
}
