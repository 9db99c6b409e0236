//! Application settings loaded from config.toml
//!
//! Every section has defaults, so a missing file yields a runnable configuration.
//! A handful of environment variables (usually supplied through `.env`) override
//! the file for deployment-specific values.

use crate::errors::{Error, Result};
use axum::http::HeaderValue;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Longest session lifetime accepted from configuration (ten years)
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Persistence settings
    pub database: DatabaseConfig,
    /// Catalog listing settings
    pub catalog: CatalogConfig,
    /// Login session settings
    pub sessions: SessionConfig,
    /// Error reporting settings
    pub errors: ErrorConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Browser origins allowed by CORS; empty allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origins: Vec::new(),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SeaORM connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://storefront.sqlite?mode=rwc".to_string(),
        }
    }
}

/// Catalog listing settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Page size when the client does not ask for one
    pub default_page_size: u64,
    /// Upper bound on any requested page size
    pub max_page_size: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// Login session settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Days a freshly issued token stays valid
    pub ttl_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_days: 30 }
    }
}

/// Error reporting settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// Include internal error details in HTTP responses (development only)
    pub expose_internal_detail: bool,
}

impl AppConfig {
    /// Rejects values that would only fail later, per request.
    ///
    /// # Errors
    /// Returns `Config` for an out-of-range session lifetime, a zero page size, a
    /// default page size above the maximum, or an origin that is not a valid header.
    pub fn validate(&self) -> Result<()> {
        let ttl = self.sessions.ttl_days;
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&ttl) {
            return Err(Error::Config {
                message: format!(
                    "sessions.ttl_days must be between 1 and {MAX_SESSION_TTL_DAYS}, got {ttl}"
                ),
            });
        }

        let catalog = &self.catalog;
        if catalog.default_page_size == 0 || catalog.max_page_size == 0 {
            return Err(Error::Config {
                message: "catalog page sizes must be at least 1".to_string(),
            });
        }
        if catalog.default_page_size > catalog.max_page_size {
            return Err(Error::Config {
                message: format!(
                    "catalog.default_page_size ({}) exceeds catalog.max_page_size ({})",
                    catalog.default_page_size, catalog.max_page_size
                ),
            });
        }

        for origin in &self.server.allowed_origins {
            if origin == "*" || HeaderValue::from_str(origin).is_err() {
                return Err(Error::Config {
                    message: format!(
                        "Invalid server.allowed_origins entry '{origin}' \
                         (leave the list empty to allow any origin)"
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {}", path_ref.display());
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads the application configuration used by the server binary.
///
/// The file path comes from `STOREFRONT_CONFIG` (default `./config.toml`); a
/// missing default file is not an error. Afterwards `DATABASE_URL`,
/// `STOREFRONT_HOST`, `STOREFRONT_PORT` and `STOREFRONT_EXPOSE_ERROR_DETAIL`
/// override the corresponding settings.
///
/// # Errors
/// Returns an error if an explicitly named file is missing, any source is malformed,
/// or the merged settings fail `AppConfig::validate`.
pub fn load_app_configuration() -> Result<AppConfig> {
    let mut config = match std::env::var("STOREFRONT_CONFIG") {
        Ok(path) => load_config(path)?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH)?,
        Err(_) => {
            info!("No {DEFAULT_CONFIG_PATH} found, using built-in defaults");
            AppConfig::default()
        }
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Applies environment overrides using `lookup` to read variables.
///
/// # Errors
/// Returns an error if a port or boolean override cannot be parsed.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(host) = lookup("STOREFRONT_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("STOREFRONT_PORT") {
        config.server.port = port.parse().map_err(|e| Error::Config {
            message: format!("Invalid STOREFRONT_PORT '{port}': {e}"),
        })?;
    }
    if let Some(flag) = lookup("STOREFRONT_EXPOSE_ERROR_DETAIL") {
        config.errors.expose_internal_detail = flag.parse().map_err(|e| Error::Config {
            message: format!("Invalid STOREFRONT_EXPOSE_ERROR_DETAIL '{flag}': {e}"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            allowed_origins = ["http://localhost:3000"]

            [database]
            url = "sqlite::memory:"

            [catalog]
            default_page_size = 20
            max_page_size = 50

            [sessions]
            ttl_days = 1

            [errors]
            expose_internal_detail = true
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.allowed_origins, ["http://localhost:3000"]);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.catalog.default_page_size, 20);
        assert_eq!(config.catalog.max_page_size, 50);
        assert_eq!(config.sessions.ttl_days, 1);
        assert!(config.errors.expose_internal_detail);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.catalog.default_page_size, 10);
        assert_eq!(config.sessions.ttl_days, 30);
        assert!(!config.errors.expose_internal_detail);
        assert!(config.server.allowed_origins.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_session_lifetime() {
        for ttl_days in [0, -1, MAX_SESSION_TTL_DAYS + 1, i64::MAX / 1000] {
            let mut config = AppConfig::default();
            config.sessions.ttl_days = ttl_days;
            assert!(
                matches!(config.validate(), Err(Error::Config { .. })),
                "ttl_days = {ttl_days} should be rejected"
            );
        }

        let mut config = AppConfig::default();
        config.sessions.ttl_days = MAX_SESSION_TTL_DAYS;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_page_sizes() {
        let mut config = AppConfig::default();
        config.catalog.default_page_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        let mut config = AppConfig::default();
        config.catalog.max_page_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        let mut config = AppConfig::default();
        config.catalog.default_page_size = 200;
        config.catalog.max_page_size = 100;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_origins() {
        let mut config = AppConfig::default();
        config.server.allowed_origins = vec!["*".to_string()];
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        config.server.allowed_origins = vec!["http://bad\norigin".to_string()];
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "sqlite::memory:"),
            ("STOREFRONT_PORT", "7000"),
            ("STOREFRONT_EXPOSE_ERROR_DETAIL", "true"),
        ]);
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(ToString::to_string)).unwrap();

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.server.port, 7000);
        assert!(config.errors.expose_internal_detail);
    }

    #[test]
    fn test_bad_port_override_is_config_error() {
        let mut config = AppConfig::default();
        let result = apply_env_overrides(&mut config, |key| {
            (key == "STOREFRONT_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
