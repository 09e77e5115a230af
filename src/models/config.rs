//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP, pacing and fan-out settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Page fetch retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub shopee: ShopeeConfig,

    #[serde(default)]
    pub momo: MomoConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.max_pages == 0 {
            return Err(AppError::validation("crawler.max_pages must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.shopee.page_limit == 0 {
            return Err(AppError::validation("shopee.page_limit must be > 0"));
        }
        for (name, base) in [
            ("shopee.base_url", &self.shopee.base_url),
            ("momo.base_url", &self.momo.base_url),
        ] {
            url::Url::parse(base)
                .map_err(|e| AppError::validation(format!("{name} is not a URL: {e}")))?;
        }
        Ok(())
    }
}

/// HTTP client, pacing and fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between consecutive requests of one work item, in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum work items crawled at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Hard cap on pages fetched per work item
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            max_pages: defaults::max_pages(),
        }
    }
}

/// Bounded retry of a single page fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Pause before each retry, in milliseconds
    #[serde(default = "defaults::backoff")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            backoff_ms: defaults::backoff(),
        }
    }
}

/// What to do with an entry that lacks a required field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Drop the entry and keep crawling
    #[default]
    Skip,
    /// Abort the work item with a recorded fault
    Fail,
}

/// Shop listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopeeSort {
    Popular,
    #[default]
    Latest,
    Topsale,
}

impl ShopeeSort {
    /// Value of the `sort_type` query parameter.
    pub fn sort_type(&self) -> u32 {
        match self {
            ShopeeSort::Popular => 1,
            ShopeeSort::Latest => 2,
            ShopeeSort::Topsale => 13,
        }
    }

    /// Value of the `tab_name` query parameter.
    pub fn tab_name(&self) -> &'static str {
        match self {
            ShopeeSort::Popular => "popular",
            ShopeeSort::Latest => "latest",
            ShopeeSort::Topsale => "topsale",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopeeConfig {
    #[serde(default = "defaults::shopee_base")]
    pub base_url: String,

    /// Items requested per offset window
    #[serde(default = "defaults::page_limit")]
    pub page_limit: u32,

    #[serde(default)]
    pub sort: ShopeeSort,

    #[serde(default)]
    pub missing_field: MissingFieldPolicy,
}

impl Default for ShopeeConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::shopee_base(),
            page_limit: defaults::page_limit(),
            sort: ShopeeSort::default(),
            missing_field: MissingFieldPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomoConfig {
    #[serde(default = "defaults::momo_base")]
    pub base_url: String,

    #[serde(default)]
    pub missing_field: MissingFieldPolicy,
}

impl Default for MomoConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::momo_base(),
            missing_field: MissingFieldPolicy::default(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; harvester/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        300
    }
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn max_pages() -> u32 {
        200
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn backoff() -> u64 {
        500
    }

    // Source defaults
    pub fn shopee_base() -> String {
        "https://shopee.tw".into()
    }
    pub fn page_limit() -> u32 {
        30
    }
    pub fn momo_base() -> String {
        "https://m.momoshop.com.tw".into()
    }
}
