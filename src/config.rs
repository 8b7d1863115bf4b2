//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `PORT` - Listen port on 0.0.0.0 (default: 8083)
//! - `DATABASE_URL` - `PostgreSQL` connection string; unset keeps documents in memory
//! - `NATS_URL` - Event bus; unset logs events instead of publishing them
//! - `DATA_DIR` - Local durable state for carts and wishlists (default: ./data)
//! - `MEDIA_DIR` - Uploaded image root (default: ./media)
//! - `MEDIA_BASE_URL` - Public URL prefix for uploaded images (default: /media)
//! - `STORE_CONTACT` - Default order notification number (default: +2348052465801)
//! - `PRODUCTS_PER_PAGE` - Catalog page size (default: 12)

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_STORE_CONTACT: &str = "+2348052465801";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub data_dir: PathBuf,
    pub media_dir: PathBuf,
    pub media_base_url: String,
    pub store_contact: String,
    pub products_per_page: usize,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = or_default("PORT", "8083").parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let products_per_page = or_default("PRODUCTS_PER_PAGE", "12").parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar("PRODUCTS_PER_PAGE".to_string(), e.to_string()))?;
        if products_per_page == 0 {
            return Err(ConfigError::InvalidEnvVar("PRODUCTS_PER_PAGE".to_string(), "must be at least 1".to_string()));
        }

        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            nats_url: get("NATS_URL"),
            data_dir: PathBuf::from(or_default("DATA_DIR", "./data")),
            media_dir: PathBuf::from(or_default("MEDIA_DIR", "./media")),
            media_base_url: or_default("MEDIA_BASE_URL", "/media"),
            store_contact: or_default("STORE_CONTACT", DEFAULT_STORE_CONTACT),
            products_per_page,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}
