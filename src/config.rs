//! Runtime configuration read from the environment
//!
//! `.env` is loaded first (if present), then:
//!
//! - `PORT` - Port the front-end listens on (default: 3000)
//! - `BACKEND_URL` - Base URL of the shortener API (default: "http://localhost:8080")
//! - `STORAGE_PATH` - File holding the persisted session (default: "session.db")
//! - `REQUEST_TIMEOUT_SECS` - Timeout for API calls (default: 10)

use std::env;
use std::time::Duration;

use crate::api::normalize_base_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub backend_url: String,
    pub storage_path: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unparseable values
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let backend_url = lookup("BACKEND_URL")
            .filter(|v| !v.trim().is_empty())
            .map(|v| normalize_base_url(&v))
            .unwrap_or_else(|| "http://localhost:8080".to_string());

        let storage_path = lookup("STORAGE_PATH").unwrap_or_else(|| "session.db".to_string());

        let timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            port,
            backend_url,
            storage_path,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}
