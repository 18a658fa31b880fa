//! Configuration module for the studio backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("STUDIO_DB_PATH")
            .unwrap_or_else(|_| "./data/studio.sqlite".to_string())
            .into();

        let bind_addr = env::var("STUDIO_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string());
        let bind_addr = bind_addr.parse().map_err(|_| {
            AppError::Validation(format!("Invalid STUDIO_BIND_ADDR format: {}", bind_addr))
        })?;

        let log_level = env::var("STUDIO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("STUDIO_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_json,
        })
    }
}
