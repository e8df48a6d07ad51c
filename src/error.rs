use thiserror::Error;

/// Conditions that abort a whole audit run.
///
/// Anything that goes wrong with a single link is captured as a
/// [`crate::results::LinkStatus`] or a skip instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid page URL {url}: {source}")]
    InvalidPageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid exclude pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed to fetch page {url}: {source}")]
    PageFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("webdriver: {0}")]
    WebDriver(String),
}

pub type Result<T> = std::result::Result<T, Error>;
