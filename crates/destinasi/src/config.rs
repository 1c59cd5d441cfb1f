//! Configuration management for destinasi.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use destinasi_imagekit::{
    parse_http_url, ImageKitConfig, DEFAULT_API_BASE_URL, DEFAULT_UPLOAD_BASE_URL,
};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "destinasi";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "destinasi.db";

/// Replacement text for secrets in printed configuration.
const REDACTED: &str = "<redacted>";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. `IMAGEKIT_PUBLIC_KEY`, `IMAGEKIT_PRIVATE_KEY`, `IMAGEKIT_URL_ENDPOINT`
/// 2. Environment variables prefixed with `DESTINASI_`, nested with `__`
///    (e.g. `DESTINASI_SERVER__BIND`)
/// 3. TOML config file at `~/.config/destinasi/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Public catalog configuration.
    pub catalog: CatalogConfig,
    /// Image CDN configuration.
    pub imagekit: ImageKitSettings,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    /// Lifetime of a login session in hours.
    pub session_hours: u32,
    /// Largest accepted request body, covering image uploads.
    pub max_body_bytes: usize,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/destinasi/destinasi.db`
    pub database_path: Option<PathBuf>,
}

/// Public catalog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog page size when the request does not give one.
    pub default_per_page: u32,
    /// Largest page size a request may ask for.
    pub max_per_page: u32,
    /// Nearby destinations on the home page.
    pub home_nearby_limit: usize,
    /// Categories on the home page.
    pub home_category_limit: usize,
    /// Nearby destinations on a detail page.
    pub nearby_limit: usize,
    /// Related destinations on a detail page.
    pub related_limit: usize,
}

/// Image CDN configuration. The CDN is enabled only when the two keys and
/// the URL endpoint are all set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageKitSettings {
    /// Public API key.
    pub public_key: Option<String>,
    /// Private API key.
    pub private_key: Option<String>,
    /// Delivery endpoint.
    pub url_endpoint: Option<String>,
    /// Upload API base URL.
    pub upload_base_url: String,
    /// Media library API base URL.
    pub api_base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            session_hours: 12,
            max_body_bytes: 10 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_per_page: 9,
            max_per_page: 100,
            home_nearby_limit: 3,
            home_category_limit: 4,
            nearby_limit: 3,
            related_limit: 3,
        }
    }
}

impl Default for ImageKitSettings {
    fn default() -> Self {
        Self {
            public_key: None,
            private_key: None,
            url_endpoint: None,
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl ImageKitSettings {
    fn credentials(&self) -> [&Option<String>; 3] {
        [&self.public_key, &self.private_key, &self.url_endpoint]
    }

    /// Whether all credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.credentials()
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Self::figment(config_path).extract::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// The layered figment behind [`Config::load_from`].
    #[must_use]
    pub fn figment(config_path: Option<PathBuf>) -> Figment {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("DESTINASI_").split("__"))
            .merge(
                Env::prefixed("IMAGEKIT_")
                    .filter(|key| {
                        matches!(key.as_str(), "public_key" | "private_key" | "url_endpoint")
                    })
                    .map(|key| format!("imagekit.{key}").into()),
            )
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.session_hours == 0 {
            return Err(invalid("session_hours must be greater than 0"));
        }

        if self.catalog.default_per_page == 0 || self.catalog.max_per_page == 0 {
            return Err(invalid("catalog page sizes must be greater than 0"));
        }

        if self.catalog.default_per_page > self.catalog.max_per_page {
            return Err(invalid(format!(
                "default_per_page ({}) cannot be greater than max_per_page ({})",
                self.catalog.default_per_page, self.catalog.max_per_page
            )));
        }

        let imagekit = &self.imagekit;
        let set = imagekit
            .credentials()
            .iter()
            .filter(|v| v.is_some())
            .count();
        if set != 0 && set != 3 {
            return Err(invalid(
                "imagekit needs public_key, private_key and url_endpoint together",
            ));
        }
        if let Some(endpoint) = &imagekit.url_endpoint {
            if !is_http_url(endpoint) {
                return Err(invalid(format!(
                    "imagekit url_endpoint must be an http(s) URL: {endpoint}"
                )));
            }
        }
        for (name, url) in [
            ("upload_base_url", &imagekit.upload_base_url),
            ("api_base_url", &imagekit.api_base_url),
        ] {
            if !is_http_url(url) {
                return Err(invalid(format!(
                    "imagekit {name} must be an http(s) URL: {url}"
                )));
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the session lifetime.
    #[must_use]
    pub fn session_lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.server.session_hours))
    }

    /// Client settings for the image CDN, when it is configured.
    #[must_use]
    pub fn imagekit_config(&self) -> Option<ImageKitConfig> {
        let settings = &self.imagekit;
        if !settings.is_configured() {
            return None;
        }
        let mut config = ImageKitConfig::new(
            settings.public_key.clone()?,
            settings.private_key.clone()?,
            settings.url_endpoint.clone()?,
        );
        config.upload_base_url.clone_from(&settings.upload_base_url);
        config.api_base_url.clone_from(&settings.api_base_url);
        config.timeout = Duration::from_secs(settings.timeout_secs);
        Some(config)
    }

    /// A copy safe to print, with the private key masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.imagekit.private_key.is_some() {
            config.imagekit.private_key = Some(REDACTED.to_string());
        }
        config
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

fn is_http_url(url: &str) -> bool {
    parse_http_url(url).is_ok()
}
