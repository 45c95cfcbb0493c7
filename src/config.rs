//! Configuration module for the VideoTube server.
//!
//! This module handles loading and validating configuration from TOML files.
//! Secrets may additionally be supplied through environment variables so they
//! never have to live in a checked-in file.
//!
//! # Configuration Sources (in order of priority)
//! 1. Environment overrides (`ACCESS_TOKEN_SECRET`, `CLOUDINARY_API_KEY`, ...)
//! 2. `config.local.toml` - Local overrides (gitignored)
//! 3. `config.toml` - Main configuration file
//! 4. Default values
//!
//! # Example
//! ```rust,ignore
//! let config = Config::load("config.toml")?;
//! println!("Server will listen on {}:{}", config.server.host, config.server.port);
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind the API to
    pub host: String,
    /// Port for the API
    pub port: u16,
    /// Base URL for generating locally hosted media URLs
    pub base_url: String,
    /// Origins allowed to make credentialed cross-origin requests
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Directory served as static files at the root
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
    /// Largest page a client may request from paginated endpoints
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_max_page_size() -> u32 {
    100
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base directory for all data (RocksDB and locally hosted media)
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Get the full path to the RocksDB directory
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("rocksdb")
    }

    /// Get the full path to the local media directory
    pub fn media_path(&self) -> PathBuf {
        self.data_dir.join("media")
    }
}

/// Token and cookie configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access tokens
    #[serde(default)]
    pub access_token_secret: String,
    /// Access token lifetime in seconds
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,
    /// HMAC secret for refresh tokens
    #[serde(default)]
    pub refresh_token_secret: String,
    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: u64,
    /// Whether auth cookies carry the `Secure` attribute
    #[serde(default = "default_true")]
    pub cookie_secure: bool,
}

fn default_access_ttl() -> u64 {
    24 * 60 * 60
}

fn default_refresh_ttl() -> u64 {
    10 * 24 * 60 * 60
}

fn default_true() -> bool {
    true
}

/// Which media host receives uploaded files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaProvider {
    /// Cloudinary hosted media API
    Cloudinary,
    /// Files written under `data_dir/media` and served by this server
    Local,
}

/// Media host configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub provider: MediaProvider,
    /// Root folder all uploads are placed under
    #[serde(default = "default_folder_root")]
    pub folder_root: String,
    #[serde(default)]
    pub cloudinary: CloudinaryConfig,
}

fn default_folder_root() -> String {
    "Videotube".to_string()
}

/// Cloudinary credentials and endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Upload API base (without the cloud name)
    #[serde(default = "default_cloudinary_api_base")]
    pub api_base: String,
    /// Delivery base used to derive video thumbnails
    #[serde(default = "default_cloudinary_delivery_base")]
    pub delivery_base: String,
    /// Request timeout in seconds
    #[serde(default = "default_cloudinary_timeout")]
    pub timeout_secs: u64,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            api_base: default_cloudinary_api_base(),
            delivery_base: default_cloudinary_delivery_base(),
            timeout_secs: default_cloudinary_timeout(),
        }
    }
}

fn default_cloudinary_api_base() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_cloudinary_delivery_base() -> String {
    "https://res.cloudinary.com".to_string()
}

fn default_cloudinary_timeout() -> u64 {
    120
}

/// Upload size limits
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum image file size (avatars, covers, thumbnails) in bytes
    pub max_image_size: u64,
    /// Maximum video file size in bytes
    pub max_video_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_size: 10 * 1024 * 1024,
            max_video_size: 200 * 1024 * 1024,
        }
    }
}

impl UploadConfig {
    /// Largest request body the server accepts
    pub fn max_body_size(&self) -> usize {
        (self.max_image_size + self.max_video_size) as usize + 64 * 1024
    }
}

/// Rate limiting configuration for credential endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Maximum requests per window
    pub requests_per_window: u32,
    /// Window duration in seconds
    pub window_seconds: u64,
    /// Path prefixes the limiter applies to
    #[serde(default = "default_limited_paths")]
    pub paths: Vec<String>,
    /// Key clients on `X-Forwarded-For` / `X-Real-IP`. Only enable behind a
    /// reverse proxy that overwrites those headers.
    #[serde(default)]
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_window: 20,
            window_seconds: 60,
            paths: default_limited_paths(),
            trust_proxy: false,
        }
    }
}

fn default_limited_paths() -> Vec<String> {
    vec![
        "/api/v1/users/login".to_string(),
        "/api/v1/users/register".to_string(),
        "/api/v1/users/refresh-token".to_string(),
    ]
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Config {
    /// Load configuration from a file path
    ///
    /// Environment overrides are applied before validation.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse, apply environment overrides and validate
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Tries to load from:
    /// 1. `config.local.toml` (if exists)
    /// 2. `config.toml`
    ///
    /// # Errors
    /// Returns `ConfigError` if no configuration file is found
    pub fn load_default() -> Result<Self, ConfigError> {
        if Path::new("config.local.toml").exists() {
            return Self::load("config.local.toml");
        }

        if Path::new("config.toml").exists() {
            return Self::load("config.toml");
        }

        Err(ConfigError::ValidationError(
            "No configuration file found. Expected config.toml or config.local.toml".to_string(),
        ))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(secret) = non_empty_var("ACCESS_TOKEN_SECRET") {
            self.auth.access_token_secret = secret;
        }
        if let Some(secret) = non_empty_var("REFRESH_TOKEN_SECRET") {
            self.auth.refresh_token_secret = secret;
        }
        if let Some(name) = non_empty_var("CLOUDINARY_CLOUD_NAME") {
            self.media.cloudinary.cloud_name = name;
        }
        if let Some(key) = non_empty_var("CLOUDINARY_API_KEY") {
            self.media.cloudinary.api_key = key;
        }
        if let Some(secret) = non_empty_var("CLOUDINARY_API_SECRET") {
            self.media.cloudinary.api_secret = secret;
        }
        if let Some(origins) = parse_csv_var("CORS_ORIGIN") {
            self.server.cors_origins = origins;
        }
        if let Some(port) = non_empty_var("PORT").and_then(|raw| raw.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.access_token_secret.is_empty() || self.auth.refresh_token_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "access_token_secret and refresh_token_secret must be set".to_string(),
            ));
        }

        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            return Err(ConfigError::ValidationError(
                "access and refresh tokens must use different secrets".to_string(),
            ));
        }

        if self.auth.access_token_ttl_secs == 0 || self.auth.refresh_token_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "token lifetimes must be greater than 0".to_string(),
            ));
        }

        if self.server.base_url.ends_with('/') {
            return Err(ConfigError::ValidationError(
                "base_url should not have a trailing slash".to_string(),
            ));
        }

        if self.server.max_page_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_page_size must be greater than 0".to_string(),
            ));
        }

        if self.media.provider == MediaProvider::Cloudinary {
            let c = &self.media.cloudinary;
            if c.cloud_name.is_empty() || c.api_key.is_empty() || c.api_secret.is_empty() {
                return Err(ConfigError::ValidationError(
                    "cloudinary provider requires cloud_name, api_key and api_secret".to_string(),
                ));
            }
        }

        if self.rate_limit.enabled
            && (self.rate_limit.requests_per_window == 0 || self.rate_limit.window_seconds == 0)
        {
            return Err(ConfigError::ValidationError(
                "rate limit window and request count must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    let values: Vec<String> = non_empty_var(name)?
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
