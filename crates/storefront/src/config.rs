//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `REALTIME_DB_URL` - Realtime database root (e.g. `https://shop-default-rtdb.firebaseio.com/`)
//! - `REALTIME_DB_SECRET` - Database secret or access token
//! - `IDENTITY_API_KEY` - Web API key for the identity service
//! - `MAIL_API_KEY` - Transactional mail API key
//! - `MAIL_FROM` - Sender address for order emails
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `IDENTITY_API_URL` - Identity service endpoint (default: Identity Toolkit v1)
//! - `MAIL_API_URL` - Mail API endpoint (default: `https://api.resend.com/emails`)
//! - `ADMIN_NOTIFY_EMAIL` - Where new-order notifications go
//! - `CATALOG_CACHE_SECONDS` - Product list cache TTL (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use shopfront_core::Email;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default transactional mail endpoint (Resend-compatible JSON API).
pub const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
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
    /// Realtime database connection
    pub database: DatabaseConfig,
    /// Identity service connection
    pub identity: IdentityConfig,
    /// Outgoing mail
    pub mail: MailConfig,
    /// How long the product list is cached for browse pages
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Realtime database connection settings.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: Url,
    pub secret: SecretString,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_str())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Identity service settings.
#[derive(Clone)]
pub struct IdentityConfig {
    pub api_url: Url,
    pub api_key: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Transactional mail settings.
#[derive(Clone)]
pub struct MailConfig {
    pub api_url: Url,
    pub api_key: SecretString,
    /// `From` header, e.g. `Shopfront <orders@shop.test>`
    pub from: String,
    /// Recipient of new-order notifications; none disables them.
    pub admin_email: Option<Email>,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .field("admin_email", &self.admin_email)
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
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let cache_seconds: u64 = parse_env("CATALOG_CACHE_SECONDS", "60")?;

        Ok(Self {
            host,
            port,
            base_url,
            database: DatabaseConfig::from_env()?,
            identity: IdentityConfig::from_env()?,
            mail: MailConfig::from_env()?,
            catalog_cache_ttl: Duration::from_secs(cache_seconds),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_url("REALTIME_DB_URL", None, true)?,
            secret: get_validated_secret("REALTIME_DB_SECRET")?,
        })
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_url(
                "IDENTITY_API_URL",
                Some(shopfront_core::auth::rest::DEFAULT_BASE_URL),
                true,
            )?,
            api_key: get_validated_secret("IDENTITY_API_KEY")?,
        })
    }
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let admin_email = get_optional_env("ADMIN_NOTIFY_EMAIL")
            .map(|raw| {
                Email::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("ADMIN_NOTIFY_EMAIL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            api_url: get_url("MAIL_API_URL", Some(DEFAULT_MAIL_API_URL), false)?,
            api_key: get_validated_secret("MAIL_API_KEY")?,
            from: get_required_env("MAIL_FROM")?,
            admin_email,
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

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a URL variable. Base URLs get a trailing slash so `Url::join`
/// appends rather than replaces the last segment.
fn get_url(key: &str, default: Option<&str>, is_base: bool) -> Result<Url, ConfigError> {
    let raw = match default {
        Some(default) => get_env_or_default(key, default),
        None => get_required_env(key)?,
    };
    let raw = if is_base && !raw.ends_with('/') {
        format!("{raw}/")
    } else {
        raw
    };
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            database: DatabaseConfig {
                url: Url::parse("https://shop-rtdb.test/").unwrap(),
                secret: SecretString::from("db_token_value_9f8e7d"),
            },
            identity: IdentityConfig {
                api_url: Url::parse(shopfront_core::auth::rest::DEFAULT_BASE_URL).unwrap(),
                api_key: SecretString::from("identity_key_value_1a2b3c"),
            },
            mail: MailConfig {
                api_url: Url::parse(DEFAULT_MAIL_API_URL).unwrap(),
                api_key: SecretString::from("mail_key_value_4d5e6f"),
                from: "Shop <orders@shop.test>".to_string(),
                admin_email: None,
            },
            catalog_cache_ttl: Duration::from_secs(60),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-database-token", "REALTIME_DB_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "MAIL_API_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("re_8Kq2Lm9Zx4Tb7Wn1Pc6Vd3", "MAIL_API_KEY");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr_and_https() {
        let mut config = config();
        assert_eq!(config.socket_addr().port(), 3000);
        assert!(!config.is_https());
        config.base_url = "https://shop.test".to_string();
        assert!(config.is_https());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", config());

        assert!(debug_output.contains("shop-rtdb.test"));
        assert!(debug_output.contains("orders@shop.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("db_token_value"));
        assert!(!debug_output.contains("identity_key_value"));
        assert!(!debug_output.contains("mail_key_value"));
    }
}
