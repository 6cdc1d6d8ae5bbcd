use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::fetcher::FetcherConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transcript API configuration
    pub api: ApiConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Transcript API endpoint
    pub base_url: String,

    /// Maximum request attempts per fetch
    pub max_attempts: u32,

    /// Base inter-attempt backoff delay in seconds
    pub base_delay_secs: u64,

    /// Delay after a rate-limit response in seconds
    pub rate_limit_delay_secs: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Validity window of an issued credential in seconds
    pub credential_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default output format
    pub default_output_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: crate::fetcher::transport::DEFAULT_BASE_URL.to_string(),
                max_attempts: 5,
                base_delay_secs: 3,
                rate_limit_delay_secs: 30,
                request_timeout_secs: 30,
                credential_ttl_secs: 3600,
            },
            app: AppConfig {
                default_output_format: "text".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("youtube-transcript").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        Url::parse(&self.api.base_url)
            .map_err(|_| anyhow::anyhow!("Invalid API base URL: {}", self.api.base_url))?;

        if self.api.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  API Base URL: {}", self.api.base_url);
        println!("  Max Attempts: {}", self.api.max_attempts);
        println!("  Base Delay: {}s", self.api.base_delay_secs);
        println!("  Rate Limit Delay: {}s", self.api.rate_limit_delay_secs);
        println!("  Request Timeout: {}s", self.api.request_timeout_secs);
        println!("  Credential TTL: {}s", self.api.credential_ttl_secs);
        println!("  Default Format: {}", self.app.default_output_format);
    }

    /// Build the fetcher configuration from these settings
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            base_url: self.api.base_url.clone(),
            max_attempts: self.api.max_attempts,
            base_delay: Duration::from_secs(self.api.base_delay_secs),
            rate_limit_delay: Duration::from_secs(self.api.rate_limit_delay_secs),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
            credential_ttl: Duration::from_secs(self.api.credential_ttl_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.api.max_attempts, 5);
        assert_eq!(config.api.base_delay_secs, 3);
        assert_eq!(config.api.rate_limit_delay_secs, 30);
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.api.credential_ttl_secs, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.api.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fetcher_config_conversion() {
        let config = Config::default();
        let fetcher = config.fetcher_config();
        assert_eq!(fetcher.base_url, config.api.base_url);
        assert_eq!(fetcher.base_delay, Duration::from_secs(3));
        assert_eq!(fetcher.rate_limit_delay, Duration::from_secs(30));
    }
}
