//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GREENGATE_API_URL` - Base URL of the marketplace REST API (the `/api` root)
//! - `GREENGATE_SESSION_SECRET` - Session cookie signing secret (min 64 chars, high entropy)
//! - `PAYMENT_PUBLISHABLE_KEY` - Publishable key for the payment-confirmation widget
//!
//! ## Optional
//! - `GREENGATE_HOST` - Bind address (default: 127.0.0.1)
//! - `GREENGATE_PORT` - Listen port (default: 3000)
//! - `GREENGATE_BASE_URL` - Public base URL of the storefront, used for the
//!   Secure cookie flag (default: <http://localhost:3000>)
//! - `GREENGATE_FARMER_API_URL` - Farmer portal API root (separate from the
//!   `/api` prefix; default: the API origin with a `/farmer/` root)
//! - `GREENGATE_FARMER_PORTAL_ENABLED` - Feature flag for the farmer portal
//!   routes (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sampling (0.0-1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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
    /// Public base URL for the storefront (controls the Secure cookie flag)
    pub base_url: String,
    /// Session cookie signing secret
    pub session_secret: SecretString,
    /// Marketplace API configuration
    pub market: MarketApiConfig,
    /// Payment-confirmation widget configuration
    pub payment: PaymentConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry trace sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Marketplace API configuration.
#[derive(Debug, Clone)]
pub struct MarketApiConfig {
    /// Base URL for the buyer-facing API, always with a trailing slash
    /// (e.g., `https://market.example.com/api/`).
    pub base_url: Url,
    /// Base URL for the farmer portal API, always with a trailing slash.
    /// Lives under its own root, not under the `/api` prefix.
    pub farmer_base_url: Url,
    /// Whether the farmer portal routes are served at all.
    pub farmer_portal_enabled: bool,
}

/// Payment-confirmation widget configuration.
///
/// Only the publishable key lives here; the secret key never leaves the
/// backend and this client never sees it.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Publishable key, safe to embed in rendered pages.
    pub publishable_key: String,
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

        let host = get_env_or_default("GREENGATE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("GREENGATE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("GREENGATE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("GREENGATE_PORT".to_string(), e.to_string()))?;

        let base_url = get_env_or_default("GREENGATE_BASE_URL", "http://localhost:3000");
        let session_secret = get_validated_secret("GREENGATE_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "GREENGATE_SESSION_SECRET")?;

        let market = MarketApiConfig::from_env()?;
        let payment = PaymentConfig {
            publishable_key: get_required_env("PAYMENT_PUBLISHABLE_KEY")?,
        };

        let sentry_sample_rate = parse_rate("SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?;

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            market,
            payment,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MarketApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url("GREENGATE_API_URL", get_required_env("GREENGATE_API_URL")?)?;

        // The farmer portal sits under its own root on the same host, not
        // under the /api prefix, unless overridden explicitly.
        let farmer_base_url = match get_optional_env("GREENGATE_FARMER_API_URL") {
            Some(raw) => parse_base_url("GREENGATE_FARMER_API_URL", raw)?,
            None => default_farmer_base(&base_url)?,
        };

        let farmer_portal_enabled = get_env_or_default("GREENGATE_FARMER_PORTAL_ENABLED", "true")
            .parse::<bool>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "GREENGATE_FARMER_PORTAL_ENABLED".to_string(),
                    e.to_string(),
                )
            })?;

        Ok(Self {
            base_url,
            farmer_base_url,
            farmer_portal_enabled,
        })
    }
}

/// Parse a base URL, normalizing to a trailing slash so `Url::join` appends
/// relative paths instead of replacing the last segment.
fn parse_base_url(var_name: &str, raw: String) -> Result<Url, ConfigError> {
    let with_slash = if raw.ends_with('/') {
        raw
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))
}

/// Derive the default farmer API root from the buyer API base URL.
fn default_farmer_base(api_base: &Url) -> Result<Url, ConfigError> {
    let mut origin = api_base.clone();
    origin.set_path("/farmer/");
    origin.set_query(None);
    Ok(origin)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional sampling rate in the 0.0-1.0 range.
fn parse_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0, got {rate}"),
        ));
    }
    Ok(rate)
}

/// Validate that a session secret meets minimum length requirements.
///
/// The cookie signing key requires at least 64 bytes of material.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.len() as f64;
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

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
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

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-signing-key-here", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(64), "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6(dF8)gH1%jX5!vB9@", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_validate_session_secret_valid_length() {
        let secret = SecretString::from("a".repeat(64));
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_ok());
    }

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("TEST", "https://market.example.com/api".to_string()).unwrap();
        assert_eq!(url.as_str(), "https://market.example.com/api/");
        assert_eq!(
            url.join("cart/add/").unwrap().as_str(),
            "https://market.example.com/api/cart/add/"
        );
    }

    #[test]
    fn test_default_farmer_base_uses_own_root() {
        let api = Url::parse("https://market.example.com/api/").unwrap();
        let farmer = default_farmer_base(&api).unwrap();
        // Not under the /api prefix
        assert_eq!(farmer.as_str(), "https://market.example.com/farmer/");
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(64)),
            market: MarketApiConfig {
                base_url: Url::parse("https://market.example.com/api/").unwrap(),
                farmer_base_url: Url::parse("https://market.example.com/farmer/").unwrap(),
                farmer_portal_enabled: true,
            },
            payment: PaymentConfig {
                publishable_key: "pk_test_123".to_string(),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }
}
