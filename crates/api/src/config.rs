//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ORDER_API_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ORDER_API_BASE_URL` - Public URL, used to build email confirmation links
//! - `JWT_KEY` - Token signing key (min 32 chars, high entropy)
//! - `JWT_ISSUER` - Token issuer
//! - `JWT_AUDIENCE` - Token audience
//! - `SMTP_HOST` - Outbound mail relay
//! - `SMTP_USERNAME` / `SMTP_PASSWORD` - Mail relay credentials
//! - `EMAIL_FROM_ADDRESS` - Sender address for outbound mail
//!
//! ## Optional
//! - `ORDER_API_HOST` - Bind address (default: 127.0.0.1)
//! - `ORDER_API_PORT` - Listen port (default: 5000)
//! - `JWT_EXPIRATION_MINUTES` - Token lifetime (default: 60)
//! - `SMTP_PORT` - STARTTLS port (default: 587)
//! - `EMAIL_FROM_NAME` - Sender display name (default: Rockland Orders)
//! - `FILE_SIZE_LIMIT` - Maximum purchase order PDF size in bytes (default: 2097152)
//! - `TZ_DATABASE_DIR` - Host time zone database (default: /usr/share/zoneinfo)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SIGNING_KEY_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default ceiling for purchase order uploads (2 MiB, exclusive).
pub const DEFAULT_FILE_SIZE_LIMIT: usize = 2_097_152;

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

/// Order API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// Outbound mail configuration
    pub email: EmailConfig,
    /// Purchase order PDFs must be strictly smaller than this many bytes
    pub file_size_limit: usize,
    /// Root of the host time zone database
    pub tz_database_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Token signing configuration.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct JwtConfig {
    /// Symmetric HMAC key
    pub key: SecretString,
    /// `iss` claim
    pub issuer: String,
    /// `aud` claim
    pub audience: String,
    /// Token lifetime in minutes
    pub expiration_minutes: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("key", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiration_minutes", &self.expiration_minutes)
            .finish()
    }
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
    pub from_name: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the signing key fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ORDER_API_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("ORDER_API_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("ORDER_API_PORT", "5000")?;
        let base_url = get_required_env("ORDER_API_BASE_URL")?
            .trim_end_matches('/')
            .to_owned();

        let jwt = JwtConfig::from_env()?;
        let email = EmailConfig::from_env()?;

        let file_size_limit = parse_env_or_default::<usize>(
            "FILE_SIZE_LIMIT",
            &DEFAULT_FILE_SIZE_LIMIT.to_string(),
        )?;
        if file_size_limit == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "FILE_SIZE_LIMIT".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let tz_database_dir =
            PathBuf::from(get_env_or_default("TZ_DATABASE_DIR", "/usr/share/zoneinfo"));

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            jwt,
            email,
            file_size_limit,
            tz_database_dir,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let key = get_validated_secret("JWT_KEY")?;
        validate_signing_key(&key, "JWT_KEY")?;

        let expiration_minutes = parse_env_or_default::<i64>("JWT_EXPIRATION_MINUTES", "60")?;
        if expiration_minutes <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_EXPIRATION_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            key,
            issuer: get_required_env("JWT_ISSUER")?,
            audience: get_required_env("JWT_AUDIENCE")?,
            expiration_minutes,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: parse_env_or_default::<u16>("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM_ADDRESS")?,
            from_name: get_env_or_default("EMAIL_FROM_NAME", "Rockland Orders"),
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

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing key meets minimum length requirements.
fn validate_signing_key(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SIGNING_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_KEY_LENGTH,
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
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

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
    fn test_shannon_entropy_uniform() {
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_random_key() {
        assert!(shannon_entropy("q8$Lm2#vR7!tZ4@wK9%pB1^nX6&cF3*h") > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_placeholder_key_rejected() {
        let err = validate_secret_strength("changeme-jwt-signing-key-0123456789", "JWT_KEY");
        assert!(matches!(err, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_low_entropy_key_rejected() {
        let err = validate_secret_strength(&"ab".repeat(20), "JWT_KEY");
        assert!(matches!(err, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_short_signing_key_rejected() {
        let key = SecretString::from("q8$Lm2#vR7!t");
        assert!(validate_signing_key(&key, "JWT_KEY").is_err());
    }

    #[test]
    fn test_strong_signing_key_accepted() {
        let raw = "q8$Lm2#vR7!tZ4@wK9%pB1^nX6&cF3*h";
        assert!(validate_secret_strength(raw, "JWT_KEY").is_ok());
        assert!(validate_signing_key(&SecretString::from(raw), "JWT_KEY").is_ok());
    }

    #[test]
    fn test_parse_env_or_default_uses_default() {
        let limit: usize =
            parse_env_or_default("ROCKLAND_TEST_UNSET_FILE_SIZE_LIMIT", "2097152").unwrap();
        assert_eq!(limit, DEFAULT_FILE_SIZE_LIMIT);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let jwt = JwtConfig {
            key: SecretString::from("q8$Lm2#vR7!tZ4@wK9%pB1^nX6&cF3*h"),
            issuer: "rockland".to_string(),
            audience: "rockland-web".to_string(),
            expiration_minutes: 60,
        };
        let debug = format!("{jwt:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("q8$Lm2"));
    }
}
