//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; the storefront runs against a local backend
//! with no configuration at all.
//!
//! - `NEON_API_URL` - Backend API base URL (default: <http://localhost:8000>)
//! - `NEON_API_TIMEOUT_SECONDS` - Per-request timeout for backend calls (default: none)
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: <http://localhost:3000>)
//! - `STOREFRONT_LOCALE` - Price formatting locale, `pt-BR` or `en-US` (default: pt-BR)
//! - `CATALOG_REVALIDATE_SECONDS` - Product catalog refresh interval (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use neon_merch_core::Locale;
use thiserror::Error;
use url::Url;

/// Backend URL used when `NEON_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default stale-while-revalidate interval for the product catalog.
pub const DEFAULT_REVALIDATE_SECONDS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Locale used for price display
    pub locale: Locale,
    /// Backend API configuration
    pub api: ApiConfig,
    /// Catalog refresh interval
    pub revalidate_interval: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Backend REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; endpoint paths are appended to it.
    pub base_url: Url,
    /// Optional per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Lookup(&lookup);

        let host = env.parse_or("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parse_or("STOREFRONT_PORT", "3000")?;
        let base_url = env.or_default("STOREFRONT_BASE_URL", "http://localhost:3000");
        let locale = env.parse_or("STOREFRONT_LOCALE", Locale::default().tag())?;

        let revalidate_seconds: u64 = env.parse_or(
            "CATALOG_REVALIDATE_SECONDS",
            &DEFAULT_REVALIDATE_SECONDS.to_string(),
        )?;
        if revalidate_seconds == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_REVALIDATE_SECONDS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let api = ApiConfig::from_lookup(&env)?;

        Ok(Self {
            host,
            port,
            base_url,
            locale,
            api,
            revalidate_interval: Duration::from_secs(revalidate_seconds),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parse_or("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env.parse_or("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ApiConfig {
    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        let raw = env.or_default("NEON_API_URL", DEFAULT_API_URL);
        let base_url = parse_base_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("NEON_API_URL".to_string(), e))?;

        let timeout = env
            .optional("NEON_API_TIMEOUT_SECONDS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar(
                            "NEON_API_TIMEOUT_SECONDS".to_string(),
                            e.to_string(),
                        )
                    })
            })
            .transpose()?;

        Ok(Self { base_url, timeout })
    }
}

/// Parse a base URL, guaranteeing a trailing slash so `Url::join` appends.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("must be an absolute http(s) URL".to_string());
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Lookup<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Lookup<'_> {
    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default literal.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:8000/");
        assert!(config.api.timeout.is_none());
        assert_eq!(config.port, 3000);
        assert_eq!(config.locale, Locale::PtBr);
        assert_eq!(config.revalidate_interval, Duration::from_secs(10));
        assert!(config.sentry_dsn.is_none());
        assert!(!config.is_secure());
    }

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let config = config_from(&[("NEON_API_URL", "https://api.example.com/v1")]).unwrap();
        assert_eq!(config.api.base_url.as_str(), "https://api.example.com/v1/");
        assert_eq!(
            config.api.base_url.join("products").unwrap().as_str(),
            "https://api.example.com/v1/products"
        );
    }

    #[test]
    fn test_empty_api_url_falls_back_to_local() {
        let config = config_from(&[("NEON_API_URL", "  ")]).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_invalid_api_url() {
        let err = config_from(&[("NEON_API_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "NEON_API_URL"));
    }

    #[test]
    fn test_timeout_parsing() {
        let config = config_from(&[("NEON_API_TIMEOUT_SECONDS", "5")]).unwrap();
        assert_eq!(config.api.timeout, Some(Duration::from_secs(5)));
        assert!(config_from(&[("NEON_API_TIMEOUT_SECONDS", "soon")]).is_err());
    }

    #[test]
    fn test_zero_revalidate_interval_rejected() {
        assert!(config_from(&[("CATALOG_REVALIDATE_SECONDS", "0")]).is_err());
    }

    #[test]
    fn test_locale_and_port() {
        let config = config_from(&[("STOREFRONT_LOCALE", "en-US"), ("STOREFRONT_PORT", "8080")])
            .unwrap();
        assert_eq!(config.locale, Locale::EnUs);
        assert_eq!(config.socket_addr().port(), 8080);
        assert!(config_from(&[("STOREFRONT_PORT", "eighty")]).is_err());
    }

    #[test]
    fn test_https_base_url_is_secure() {
        let config = config_from(&[("STOREFRONT_BASE_URL", "https://shop.example.com")]).unwrap();
        assert!(config.is_secure());
    }
}
