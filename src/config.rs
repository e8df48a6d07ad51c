use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Browser-like User-Agent; some servers reject obvious bots outright.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Where the audited page's links and elements come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    /// Load the page in a WebDriver-controlled browser
    #[default]
    Browser,
    /// Fetch the raw HTML and parse it without running scripts
    Static,
}

/// Configuration for the link health checker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCheckConfig {
    /// Number of links checked in parallel
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Overall deadline for one batch of link checks
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,

    /// Maximum number of redirects followed per link
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Total attempts per link on transport failure
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before each retry
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Regex patterns for resolved URLs that should never be checked
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Configuration for one page audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Page to audit
    pub page_url: String,

    #[serde(default)]
    pub source: PageSource,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Whether to traverse the page and collect unique elements
    #[serde(default = "default_collect_elements")]
    pub collect_elements: bool,

    /// Upper bound on viewport scrolls during element traversal
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: usize,

    #[serde(default)]
    pub link_check: LinkCheckConfig,
}

fn default_max_concurrency() -> usize {
    10
}

fn default_batch_timeout_secs() -> u64 {
    120
}

fn default_max_redirects() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_read_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_collect_elements() -> bool {
    true
}

fn default_max_scrolls() -> usize {
    50
}

impl Default for LinkCheckConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            batch_timeout_secs: default_batch_timeout_secs(),
            max_redirects: default_max_redirects(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            user_agent: default_user_agent(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl LinkCheckConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Rejects settings that would stall the worker pool or the fetcher
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl AuditConfig {
    /// Create a new configuration with default values
    pub fn new(page_url: &str) -> Self {
        Self {
            page_url: page_url.to_string(),
            source: PageSource::default(),
            webdriver_url: default_webdriver_url(),
            collect_elements: default_collect_elements(),
            max_scrolls: default_max_scrolls(),
            link_check: LinkCheckConfig::default(),
        }
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }
}
