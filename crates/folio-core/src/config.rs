//! Folio Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! sensible defaults for development. Environment values always win over
//! file values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Token issuance and revocation
    pub jwt: JwtSettings,

    /// Key-value cache tuning
    pub cache: CacheSettings,

    /// Cookie session settings
    pub session: SessionSettings,

    /// Outgoing mail
    pub mail: MailSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with process environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// `with_env_override` delegates here; tests pass a map instead of
    /// touching the process environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "SERVER_PORT")? {
            self.server.port = port;
        }
        if let Some(prefix) = lookup("API_PREFIX") {
            self.server.api_prefix = prefix;
        }
        if let Some(version) = lookup("API_VERSION") {
            self.server.api_version = version;
        }
        if let Some(url) = lookup("APP_URL") {
            self.server.app_url = url;
        }
        if let Some(name) = lookup("APP_NAME") {
            self.server.app_name = name;
        }

        // PostgreSQL
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(size) = parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")? {
            self.database.max_connections = size;
        }

        // JWT
        if let Some(secret) = lookup("JWT_SECRET_KEY") {
            self.jwt.secret_key = secret;
        }
        if let Some(key) = lookup("JWT_REFRESH_KEY") {
            self.jwt.refresh_key = key;
        }
        if let Some(minutes) = parse_var(&lookup, "JWT_TTL_MINUTES")? {
            self.jwt.ttl_minutes = minutes;
        }
        if let Some(days) = parse_var(&lookup, "JWT_TTL_OVER_DAYS")? {
            self.jwt.refresh_ttl_days = days;
        }
        if let Some(prefix) = lookup("JWT_BLACKLIST") {
            self.jwt.blacklist_prefix = prefix;
        }
        if let Some(check) = parse_var(&lookup, "JWT_CHECK_BLACKLIST")? {
            self.jwt.check_blacklist = check;
        }
        if let Some(fail_open) = parse_var(&lookup, "JWT_BLACKLIST_FAIL_OPEN")? {
            self.jwt.blacklist_fail_open = fail_open;
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            self.jwt.issuer = issuer;
        }

        // Cache
        if let Some(capacity) = parse_var(&lookup, "CACHE_INITIAL_CAPACITY")? {
            self.cache.initial_capacity = capacity;
        }

        // Session
        if let Some(minutes) = parse_var(&lookup, "SESSION_TTL_MINUTES")? {
            self.session.ttl_minutes = minutes;
        }
        if let Some(secure) = parse_var(&lookup, "SESSION_SECURE")? {
            self.session.secure = secure;
        }

        // Mail
        if let Some(from) = lookup("MAIL_FROM") {
            self.mail.from_address = from;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(self)
    }

    /// Path prefix shared by every JSON endpoint, e.g. `/api/v1`
    pub fn api_base(&self) -> String {
        format!("/{}/{}", self.server.api_prefix, self.server.api_version)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// First path segment of the JSON API
    pub api_prefix: String,

    /// Version segment of the JSON API
    pub api_version: String,

    /// Public base URL, used in outgoing mail links
    pub app_url: String,

    /// Display name reported by the info endpoint and mail
    pub app_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_prefix: "api".to_string(),
            api_version: "v1".to_string(),
            app_url: "http://localhost:8080".to_string(),
            app_name: "Folio".to_string(),
        }
    }
}

/// Database connection configuration
///
/// An empty `url` runs the server on the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// PostgreSQL connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
        }
    }
}

/// Token issuance and revocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    /// HMAC secret for access tokens
    pub secret_key: String,

    /// Secret mixed into refresh token digests
    pub refresh_key: String,

    /// Access token lifetime, also the blacklist entry TTL
    pub ttl_minutes: u64,

    /// Refresh token lifetime
    pub refresh_ttl_days: u64,

    /// Cache key prefix for revoked access tokens
    pub blacklist_prefix: String,

    /// Consult the blacklist on every authenticated request
    pub check_blacklist: bool,

    /// Treat a cache read error as "not revoked"
    pub blacklist_fail_open: bool,

    /// `iss` claim written and required on access tokens
    pub issuer: String,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret_key: "dev-secret-key-change-in-production".to_string(),
            refresh_key: "dev-refresh-key-change-in-production".to_string(),
            ttl_minutes: 15,
            refresh_ttl_days: 7,
            blacklist_prefix: "jwt_blacklist".to_string(),
            check_blacklist: true,
            blacklist_fail_open: true,
            issuer: "folio".to_string(),
        }
    }
}

/// Key-value cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Entries to pre-allocate room for. Not a limit: auth state is never
    /// evicted by size.
    pub initial_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            initial_capacity: 1_024,
        }
    }
}

/// Cookie session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Inactivity window before a session expires
    pub ttl_minutes: i64,

    /// Only send the session cookie over HTTPS
    pub secure: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_minutes: 120,
            secure: false,
        }
    }
}

/// Outgoing mail settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// Sender address
    pub from_address: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from_address: "no-reply@folio.local".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
