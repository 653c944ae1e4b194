//! Configuration management for shieldr.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "shieldr";

/// Public Overpass API interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SHIELDR_`, sections split on `__`)
/// 2. TOML config file at `~/.config/shieldr/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Zone resolution configuration.
    pub zones: ZonesConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub host: IpAddr,
    /// TCP port to listen on.
    pub port: u16,
}

/// Zone resolution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    /// Query the live Overpass source before falling back.
    pub live_enabled: bool,
    /// Overpass interpreter endpoint.
    pub overpass_url: String,
    /// Upper bound on a single live request, in seconds.
    pub timeout_secs: u64,
    /// Radius used when a request gives none (or an unusable one), in metres.
    pub default_radius_m: f64,
    /// Maximum number of zones returned from the static catalog.
    pub fallback_limit: usize,
    /// Element cap passed to Overpass via `out center N`.
    pub live_result_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
        }
    }
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            live_enabled: true,
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            timeout_secs: 15,
            default_radius_m: 10_000.0,
            fallback_limit: 20,
            live_result_limit: 30,
        }
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
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("SHIELDR_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.zones.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "zones.timeout_secs must be greater than 0".to_string(),
            });
        }

        if !self.zones.default_radius_m.is_finite() || self.zones.default_radius_m <= 0.0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "zones.default_radius_m must be a positive number, got {}",
                    self.zones.default_radius_m
                ),
            });
        }

        if self.zones.fallback_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "zones.fallback_limit must be greater than 0".to_string(),
            });
        }

        let url = self.zones.overpass_url.as_str();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::ConfigValidation {
                message: format!("zones.overpass_url must be an http(s) URL: {url:?}"),
            });
        }

        Ok(())
    }

    /// Get the address the HTTP server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

impl ZonesConfig {
    /// Bound on a single live request.
    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.port, 5000);
        assert!(config.zones.live_enabled);
        assert_eq!(config.zones.overpass_url, DEFAULT_OVERPASS_URL);
    }

    #[test]
    fn test_default_zones_config() {
        let zones = ZonesConfig::default();

        assert_eq!(zones.timeout_secs, 15);
        assert!((zones.default_radius_m - 10_000.0).abs() < f64::EPSILON);
        assert_eq!(zones.fallback_limit, 20);
        assert_eq!(zones.live_result_limit, 30);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.port"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.zones.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_bad_radius() {
        let mut config = Config::default();
        config.zones.default_radius_m = -5.0;
        assert!(config.validate().is_err());

        config.zones.default_radius_m = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_fallback_limit() {
        let mut config = Config::default();
        config.zones.fallback_limit = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("fallback_limit"));
    }

    #[test]
    fn test_validate_bad_url() {
        let mut config = Config::default();
        config.zones.overpass_url = "overpass-api.de".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("overpass_url"));
    }

    #[test]
    fn test_bind_addr() {
        let mut config = Config::default();
        config.server.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.server.port = 8080;

        assert_eq!(config.bind_addr(), "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_upstream_timeout() {
        let mut zones = ZonesConfig::default();
        assert_eq!(zones.upstream_timeout(), Duration::from_secs(15));

        zones.timeout_secs = 3;
        assert_eq!(zones.upstream_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("shieldr"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // A missing file falls through to defaults
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_zones_config_deserialize() {
        let json = r#"{"timeout_secs": 5, "live_enabled": false}"#;
        let zones: ZonesConfig = serde_json::from_str(json).unwrap();
        assert_eq!(zones.timeout_secs, 5);
        assert!(!zones.live_enabled);
        assert_eq!(zones.fallback_limit, 20);
    }

    #[test]
    fn test_server_config_serialize() {
        let json = serde_json::to_string(&ServerConfig::default()).unwrap();
        assert!(json.contains("\"port\":5000"));
        assert!(json.contains("0.0.0.0"));
    }
}
