//! API Configuration Module
//!
//! Listen address and CORS settings. Configuration is loaded from
//! environment variables with defaults suited to local development.

use std::net::SocketAddr;

use crate::error::{ApiError, ApiResult};

/// Origins allowed when `TODO_CORS_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost.tiangolo.com",
    "https://localhost.tiangolo.com",
    "http://localhost",
    "http://localhost:3000",
];

/// API configuration for the listener and CORS.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listen host.
    pub bind_host: String,

    /// Listen port.
    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            cors_allow_credentials: true,
            cors_max_age_secs: 600,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TODO_API_BIND`: listen host (default: 0.0.0.0)
    /// - `PORT` / `TODO_API_PORT`: listen port (default: 8000)
    /// - `TODO_CORS_ORIGINS`: comma-separated allowed origins
    /// - `TODO_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: true)
    /// - `TODO_CORS_MAX_AGE_SECS`: preflight cache duration (default: 600)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let bind_host = std::env::var("TODO_API_BIND").unwrap_or(defaults.bind_host);

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("TODO_API_PORT").ok())
        {
            Some(port_str) => port_str.trim().parse::<u16>().map_err(|_| {
                ApiError::invalid_input(format!("Invalid port value: {}", port_str))
            })?,
            None => defaults.port,
        };

        let cors_origins = std::env::var("TODO_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or(defaults.cors_origins);

        let cors_allow_credentials = std::env::var("TODO_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(defaults.cors_allow_credentials);

        let cors_max_age_secs = std::env::var("TODO_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        Ok(Self {
            bind_host,
            port,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
        })
    }

    /// Resolve the socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.cors_origins.iter().any(|allowed| allowed == "*" || allowed == origin)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
