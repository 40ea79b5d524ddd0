//! Application configuration.

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Application-level settings handed to services at startup.
    #[serde(default)]
    pub app: AppSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Immutable settings used by request handlers.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// Default page size for recipe listings.
    #[serde(default = "default_page_size")]
    pub recipes_page_size: u64,
    /// Default page size for user and subscription listings.
    #[serde(default = "default_page_size")]
    pub users_page_size: u64,
    /// Upper bound for a client-supplied `limit`.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// First line of the exported shopping list.
    #[serde(default = "default_shopping_list_header")]
    pub shopping_list_header: String,
    /// Prefix of the exported shopping list file name.
    #[serde(default = "default_shopping_list_file_prefix")]
    pub shopping_list_file_prefix: String,
    /// IANA time zone used to stamp export file names.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            recipes_page_size: default_page_size(),
            users_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            shopping_list_header: default_shopping_list_header(),
            shopping_list_file_prefix: default_shopping_list_file_prefix(),
            time_zone: default_time_zone(),
        }
    }
}

impl AppSettings {
    /// Parsed time zone, falling back to UTC for unknown names.
    #[must_use]
    pub fn tz(&self) -> Tz {
        self.time_zone.parse().unwrap_or_else(|_| {
            tracing::warn!(time_zone = %self.time_zone, "Unknown time zone, using UTC");
            Tz::UTC
        })
    }

    /// Clamp a requested page size into `1..=max_page_size`.
    #[must_use]
    pub fn clamp_limit(&self, requested: Option<u64>, default: u64) -> u64 {
        requested.unwrap_or(default).clamp(1, self.max_page_size.max(1))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_page_size() -> u64 {
    6
}

const fn default_max_page_size() -> u64 {
    30
}

fn default_shopping_list_header() -> String {
    "FOODGRAM SHOPPING LIST".to_string()
}

fn default_shopping_list_file_prefix() -> String {
    "foodgram_shopping_cart".to_string()
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `FOODGRAM_ENV`)
    /// 4. Environment variables with `FOODGRAM__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("FOODGRAM_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FOODGRAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FOODGRAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_settings_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.recipes_page_size, 6);
        assert_eq!(settings.max_page_size, 30);
        assert_eq!(settings.shopping_list_header, "FOODGRAM SHOPPING LIST");
        assert_eq!(settings.tz(), Tz::UTC);
    }

    #[test]
    fn test_unknown_time_zone_falls_back_to_utc() {
        let settings = AppSettings {
            time_zone: "Mars/Olympus_Mons".to_string(),
            ..AppSettings::default()
        };
        assert_eq!(settings.tz(), Tz::UTC);
    }

    #[test]
    fn test_known_time_zone() {
        let settings = AppSettings {
            time_zone: "Europe/Moscow".to_string(),
            ..AppSettings::default()
        };
        assert_eq!(settings.tz(), chrono_tz::Europe::Moscow);
    }

    #[test]
    fn test_clamp_limit() {
        let settings = AppSettings::default();
        assert_eq!(settings.clamp_limit(None, 6), 6);
        assert_eq!(settings.clamp_limit(Some(0), 6), 1);
        assert_eq!(settings.clamp_limit(Some(500), 6), 30);
    }
}
