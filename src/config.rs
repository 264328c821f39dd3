//! Configuration management for the catalog client

use crate::error::{FetchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Configuration for the catalog client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Root of the REST API (default: https://pokeapi.co/api/v2)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Listed resource below the base URL (default: "pokemon")
    #[serde(default = "default_resource_path")]
    pub resource_path: String,

    /// Number of entries requested per page (default: 20)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of detail requests in flight per page (default: 6)
    #[serde(default = "default_max_concurrent_detail_loads")]
    pub max_concurrent_detail_loads: usize,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Image cache settings
    #[serde(default)]
    pub image_cache: CacheConfig,
}

/// Configuration for the image cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of cached images (default: 20)
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Optional limit on the summed size of cached images in bytes
    #[serde(default)]
    pub total_cost_limit: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            total_cost_limit: None,
        }
    }
}

impl CacheConfig {
    /// Validate the image cache configuration
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(FetchError::ConfigError(
                "image_cache capacity must be greater than 0".to_string(),
            ));
        }

        if self.total_cost_limit == Some(0) {
            return Err(FetchError::ConfigError(
                "image_cache total_cost_limit must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_base_url() -> String {
    "https://pokeapi.co/api/v2".to_string()
}

fn default_resource_path() -> String {
    "pokemon".to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_max_concurrent_detail_loads() -> usize {
    6
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    20
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: default_base_url(),
            resource_path: default_resource_path(),
            page_size: default_page_size(),
            max_concurrent_detail_loads: default_max_concurrent_detail_loads(),
            request_timeout_secs: default_request_timeout_secs(),
            image_cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Returns
    /// * `Ok(ClientConfig)` if loading and validation succeed
    /// * `Err(FetchError)` if file cannot be read or config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            FetchError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(content).map_err(|e| {
            FetchError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - base_url must parse and be able to carry path segments
    /// - resource_path must not be empty
    /// - page_size, max_concurrent_detail_loads and request_timeout_secs must be > 0
    /// - image_cache settings must be valid
    pub fn validate(&self) -> Result<()> {
        let base = self.parsed_base_url()?;
        if base.cannot_be_a_base() {
            return Err(FetchError::ConfigError(format!(
                "base_url '{}' cannot carry a resource path",
                self.base_url
            )));
        }

        if self.resource_path.trim_matches('/').is_empty() {
            return Err(FetchError::ConfigError(
                "resource_path must not be empty".to_string(),
            ));
        }

        if self.page_size == 0 {
            return Err(FetchError::ConfigError(
                "page_size must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_detail_loads == 0 {
            return Err(FetchError::ConfigError(
                "max_concurrent_detail_loads must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(FetchError::ConfigError(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        self.image_cache.validate()
    }

    /// The configured base URL, parsed
    pub fn parsed_base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            FetchError::ConfigError(format!("Invalid base_url '{}': {}", self.base_url, e))
        })
    }

    /// Per-request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://pokeapi.co/api/v2");
        assert_eq!(config.resource_path, "pokemon");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.max_concurrent_detail_loads, 6);
        assert_eq!(config.image_cache.capacity, 20);
        assert!(config.image_cache.total_cost_limit.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = ClientConfig::from_yaml("page_size: 50\n").unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.max_concurrent_detail_loads, 6);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_nested_cache_section() {
        let yaml = "image_cache:\n  capacity: 5\n  total_cost_limit: 1048576\n";
        let config = ClientConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.image_cache.capacity, 5);
        assert_eq!(config.image_cache.total_cost_limit, Some(1024 * 1024));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            ClientConfig { page_size: 0, ..Default::default() },
            ClientConfig { max_concurrent_detail_loads: 0, ..Default::default() },
            ClientConfig { request_timeout_secs: 0, ..Default::default() },
            ClientConfig { resource_path: "/".into(), ..Default::default() },
            ClientConfig { base_url: "not a url".into(), ..Default::default() },
            ClientConfig { base_url: "mailto:someone@example.com".into(), ..Default::default() },
            ClientConfig {
                image_cache: CacheConfig { capacity: 0, total_cost_limit: None },
                ..Default::default()
            },
            ClientConfig {
                image_cache: CacheConfig { capacity: 4, total_cost_limit: Some(0) },
                ..Default::default()
            },
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(FetchError::ConfigError(_))),
                "expected rejection for {:?}",
                config
            );
        }
    }

    #[test]
    fn test_malformed_yaml() {
        let result = ClientConfig::from_yaml("page_size: [1, 2");
        assert!(matches!(result, Err(FetchError::ConfigError(_))));
    }
}
