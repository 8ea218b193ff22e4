//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `TERROIR_API_BASE_URL` - Origin of the market REST API (e.g. `http://localhost:5000`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `TERROIR_API_TIMEOUT_SECS` - Per-request timeout for API calls (default: 10)
//! - `TERROIR_PRODUCT_CACHE_TTL_SECS` - Home page product listing cache (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
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
    /// Market API connection settings
    pub api: ApiConfig,
    /// Sentry error tracking settings
    pub sentry: SentryConfig,
}

/// Market API connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Single origin for every API call
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// Time-to-live of the cached home page listing
    pub product_cache_ttl: Duration,
}

/// Sentry error tracking settings.
///
/// Implements `Debug` manually to redact the DSN, which embeds the project key.
#[derive(Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<SecretString>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl std::fmt::Debug for SentryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryConfig")
            .field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .field("traces_sample_rate", &self.traces_sample_rate)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", &get_env_or_default("STOREFRONT_HOST", "127.0.0.1"))?;
        let port = parse_env("STOREFRONT_PORT", &get_env_or_default("STOREFRONT_PORT", "3000"))?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        Ok(Self {
            host,
            port,
            base_url,
            api: ApiConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
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
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("TERROIR_API_BASE_URL")?;
        let timeout_secs: u64 = parse_env(
            "TERROIR_API_TIMEOUT_SECS",
            &get_env_or_default("TERROIR_API_TIMEOUT_SECS", "10"),
        )?;
        let ttl_secs: u64 = parse_env(
            "TERROIR_PRODUCT_CACHE_TTL_SECS",
            &get_env_or_default("TERROIR_PRODUCT_CACHE_TTL_SECS", "60"),
        )?;

        Ok(Self {
            base_url: parse_api_base_url(&raw)?,
            timeout: Duration::from_secs(timeout_secs),
            product_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }

    /// The API origin as it appears in a CSP source list.
    #[must_use]
    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN").map(SecretString::from),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_sample_rate(
                "SENTRY_SAMPLE_RATE",
                &get_env_or_default("SENTRY_SAMPLE_RATE", "1.0"),
            )?,
            traces_sample_rate: parse_sample_rate(
                "SENTRY_TRACES_SAMPLE_RATE",
                &get_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0"),
            )?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_sample_rate(key: &str, value: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, value)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
}

/// Parse the API origin. Paths are joined onto it, so a trailing slash is
/// added when missing.
fn parse_api_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidEnvVar("TERROIR_API_BASE_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "TERROIR_API_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_base_url_adds_trailing_slash() {
        let url = parse_api_base_url("http://localhost:5000").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/");
        assert_eq!(url.join("cart").unwrap().as_str(), "http://localhost:5000/cart");

        let nested = parse_api_base_url("https://api.example.cn/v1").unwrap();
        assert_eq!(
            nested.join("orders").unwrap().as_str(),
            "https://api.example.cn/v1/orders"
        );
    }

    #[test]
    fn test_parse_api_base_url_rejects_bad_input() {
        assert!(matches!(
            parse_api_base_url("not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            parse_api_base_url("ftp://files.example.cn"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_parse_env_numbers() {
        let port: u16 = parse_env("STOREFRONT_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
        assert!(parse_env::<u16>("STOREFRONT_PORT", "eighty").is_err());
        assert!(parse_env::<u64>("TERROIR_API_TIMEOUT_SECS", "-1").is_err());
    }

    #[test]
    fn test_sample_rate_bounds() {
        assert!((parse_sample_rate("SENTRY_SAMPLE_RATE", "0.25").unwrap() - 0.25).abs() < f32::EPSILON);
        assert!(parse_sample_rate("SENTRY_SAMPLE_RATE", "1.5").is_err());
    }

    #[test]
    fn test_api_origin() {
        let config = ApiConfig {
            base_url: parse_api_base_url("http://127.0.0.1:5000/api").unwrap(),
            timeout: Duration::from_secs(10),
            product_cache_ttl: Duration::from_secs(60),
        };
        assert_eq!(config.origin(), "http://127.0.0.1:5000");
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            api: ApiConfig {
                base_url: parse_api_base_url("http://localhost:5000").unwrap(),
                timeout: Duration::from_secs(10),
                product_cache_ttl: Duration::from_secs(60),
            },
            sentry: SentryConfig::default(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_sentry_config_debug_redacts_dsn() {
        let config = SentryConfig {
            dsn: Some(SecretString::from("https://publickey@o0.ingest.sentry.io/1")),
            ..SentryConfig::default()
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("publickey"));
    }
}
