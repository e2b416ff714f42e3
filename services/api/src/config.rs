//! API service configuration

use anyhow::Result;
use std::env;

/// API service configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Externally visible base URL, used in pagination links
    pub public_url: String,
    /// Page size when the client does not ask for one
    pub default_page_size: u32,
    /// Upper bound for a client supplied page size
    pub max_page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
            public_url: "http://localhost:3001".to_string(),
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl ApiConfig {
    /// Create a new ApiConfig from environment variables
    ///
    /// # Environment Variables
    /// - `API_BIND_ADDRESS`: Listen address (default: `0.0.0.0:3001`)
    /// - `API_PUBLIC_URL`: Public base URL (default: `http://localhost:3001`)
    /// - `API_DEFAULT_PAGE_SIZE`: Default page size (default: 10)
    /// - `API_MAX_PAGE_SIZE`: Maximum page size (default: 100)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_address = env::var("API_BIND_ADDRESS").unwrap_or(defaults.bind_address);

        let public_url = env::var("API_PUBLIC_URL")
            .unwrap_or(defaults.public_url)
            .trim_end_matches('/')
            .to_string();

        let default_page_size = env::var("API_DEFAULT_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.default_page_size);

        let max_page_size = env::var("API_MAX_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_page_size);

        if default_page_size == 0 || max_page_size == 0 {
            anyhow::bail!("Page sizes must be positive");
        }

        Ok(Self {
            bind_address,
            public_url,
            default_page_size: default_page_size.min(max_page_size),
            max_page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        unsafe {
            env::remove_var("API_BIND_ADDRESS");
            env::remove_var("API_PUBLIC_URL");
            env::remove_var("API_DEFAULT_PAGE_SIZE");
            env::remove_var("API_MAX_PAGE_SIZE");
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();

        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3001");
        assert_eq!(config.public_url, "http://localhost:3001");
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_page_size, 100);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        unsafe {
            env::set_var("API_PUBLIC_URL", "https://reviews.example.com/");
            env::set_var("API_DEFAULT_PAGE_SIZE", "50");
            env::set_var("API_MAX_PAGE_SIZE", "20");
        }

        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.public_url, "https://reviews.example.com");
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 20);

        unsafe {
            env::set_var("API_MAX_PAGE_SIZE", "0");
        }
        assert!(ApiConfig::from_env().is_err());

        clear();
    }
}
