pub mod browser;
pub mod checkers;
pub mod config;
pub mod error;
pub mod identity;
pub mod parsers;
pub mod resolver;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use checkers::{HttpFetcher, LinkFetcher, LinkHealthChecker};
pub use config::{AuditConfig, LinkCheckConfig, PageSource};
pub use error::{Error, Result};
pub use identity::{ElementDescriptor, IdentitySet, SeenElement, identify};
pub use results::{AuditReport, BrokenLink, LinkCandidate, LinkCheckReport, LinkStatus};

use std::path::Path;
use std::time::Duration;

/// What the page layer handed over for one page
struct PageSnapshot {
    page_url: String,
    candidates: Vec<LinkCandidate>,
    elements: Vec<SeenElement>,
}

/// Builder for auditing a single page
pub struct Audit {
    config: AuditConfig,
}

impl Audit {
    /// Create a new audit of `page_url` with default settings
    pub fn new(page_url: &str) -> Self {
        Self {
            config: AuditConfig::new(page_url),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: AuditConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = AuditConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a JSON string
    pub fn with_config_str(self, json: &str) -> Result<Self> {
        let config = AuditConfig::from_json(json)?;
        Ok(self.with_config(config))
    }

    pub fn with_page_url(mut self, page_url: &str) -> Self {
        self.config.page_url = page_url.to_string();
        self
    }

    pub fn with_source(mut self, source: PageSource) -> Self {
        self.config.source = source;
        self
    }

    /// Set the number of links checked in parallel
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.link_check.max_concurrency = max_concurrency;
        self
    }

    /// Set the overall deadline for the link checks
    pub fn with_batch_timeout(mut self, timeout_seconds: u64) -> Self {
        self.config.link_check.batch_timeout_secs = timeout_seconds;
        self
    }

    /// Enable or disable element traversal
    pub fn with_element_traversal(mut self, enabled: bool) -> Self {
        self.config.collect_elements = enabled;
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Load the page, collect its links and elements, and check the links
    pub async fn run(self) -> Result<AuditReport> {
        let mut config = self.config;

        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                config.webdriver_url = webdriver_url;
            }
        }

        let checker = LinkHealthChecker::new(config.link_check.clone())?;
        let mut seen = IdentitySet::new();

        ::log::info!("Auditing {} ({:?} source)", config.page_url, config.source);
        let snapshot = match config.source {
            PageSource::Browser => snapshot_with_browser(&config, &mut seen).await?,
            PageSource::Static => snapshot_static(&config, &mut seen).await?,
        };

        let links = checker
            .audit(&snapshot.candidates, &snapshot.page_url)
            .await?;

        Ok(AuditReport {
            page_url: snapshot.page_url,
            links,
            unique_elements: seen.len(),
            elements: snapshot.elements,
        })
    }
}

async fn snapshot_with_browser(config: &AuditConfig, seen: &mut IdentitySet) -> Result<PageSnapshot> {
    let client = browser::connect_to_webdriver(&config.webdriver_url).await?;

    let result = async {
        let page_url = browser::open_page(&client, &config.page_url).await?;
        let candidates = browser::collect_link_candidates(&client, &page_url).await?;
        let elements = if config.collect_elements {
            browser::traverse_elements(&client, seen, config.max_scrolls).await?
        } else {
            Vec::new()
        };
        Ok::<_, Error>(PageSnapshot {
            page_url,
            candidates,
            elements,
        })
    }
    .await;

    if let Err(e) = client.close().await {
        ::log::warn!("Failed to close WebDriver session: {}", e);
    }

    result
}

async fn snapshot_static(config: &AuditConfig, seen: &mut IdentitySet) -> Result<PageSnapshot> {
    let (page_url, html) = fetch_page(config).await?;

    let candidates = parsers::html::extract_candidates(&html, &page_url);
    let mut elements = Vec::new();
    if config.collect_elements {
        elements = parsers::html::extract_elements(&html)
            .into_iter()
            .filter_map(|(category, descriptor)| seen.observe(descriptor, category))
            .collect();
        ::log::info!("Found {} unique elements in {}", elements.len(), page_url);
    }

    Ok(PageSnapshot {
        page_url,
        candidates,
        elements,
    })
}

/// Downloads the page itself, following redirects, and returns its final URL
async fn fetch_page(config: &AuditConfig) -> Result<(String, String)> {
    let link_check = &config.link_check;
    let client = reqwest::Client::builder()
        .user_agent(link_check.user_agent.as_str())
        .connect_timeout(link_check.connect_timeout())
        .timeout(Duration::from_secs(
            link_check.connect_timeout_secs + link_check.read_timeout_secs,
        ))
        .build()
        .map_err(Error::HttpClient)?;

    let page_error = |source| Error::PageFetch {
        url: config.page_url.clone(),
        source,
    };

    let response = client
        .get(&config.page_url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(page_error)?;
    let page_url = response.url().to_string();
    let html = response.text().await.map_err(page_error)?;

    Ok((page_url, html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let audit = Audit::new("https://site.com/")
            .with_source(PageSource::Static)
            .with_max_concurrency(3)
            .with_batch_timeout(30)
            .with_element_traversal(false);

        let config = audit.config();
        assert_eq!(config.page_url, "https://site.com/");
        assert_eq!(config.source, PageSource::Static);
        assert_eq!(config.link_check.max_concurrency, 3);
        assert_eq!(config.link_check.batch_timeout_secs, 30);
        assert!(!config.collect_elements);
    }

    #[test]
    fn test_with_config_str() {
        let audit = Audit::new("https://ignored.com/")
            .with_config_str(r#"{ "page_url": "https://site.com/x", "max_scrolls": 5 }"#)
            .unwrap();
        assert_eq!(audit.config().page_url, "https://site.com/x");
        assert_eq!(audit.config().max_scrolls, 5);
    }

    #[tokio::test]
    async fn test_static_audit() {
        let mut server = mockito::Server::new_async().await;
        let page = r##"<html><body>
            <h1>Team</h1>
            <a href="/gone">Old profile</a>
            <a href="/soft">Archive</a>
            <a href="/ok">Current</a>
            <a href="/ok#bio">Current bio</a>
            <a href="#top">Top</a>
            <a href="tel:555">Call</a>
        </body></html>"##;
        let _page = server
            .mock("GET", "/team")
            .with_status(200)
            .with_body(page)
            .create_async()
            .await;
        let _gone = server
            .mock("GET", "/gone")
            .with_status(404)
            .create_async()
            .await;
        let _soft = server
            .mock("GET", "/soft")
            .with_status(200)
            .with_body("<h1>Oops! Page not found</h1>")
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("<h1>Current</h1>")
            .expect(1)
            .create_async()
            .await;

        let report = Audit::new(&format!("{}/team", server.url()))
            .with_source(PageSource::Static)
            .run()
            .await
            .unwrap();

        assert_eq!(report.links.candidates, 6);
        assert_eq!(report.links.unique_links, 3);
        assert_eq!(report.links.checked, 3);

        let mut broken: Vec<_> = report.links.broken.iter().map(|b| b.text.as_str()).collect();
        broken.sort();
        assert_eq!(broken, vec!["Archive", "Old profile"]);

        // One heading plus six anchors
        assert_eq!(report.unique_elements, 7);
        assert_eq!(report.elements.len(), 7);
        assert_eq!(report.elements[0].category, "heading");
        assert_eq!(report.elements[0].descriptor.visible_text, "Team");

        ok.assert_async().await;
    }
}
