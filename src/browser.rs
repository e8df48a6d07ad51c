//! WebDriver side of an audit: loading the page and snapshotting what is on it.

use crate::error::{Error, Result};
use crate::identity::{ElementDescriptor, IdentitySet, Position, SeenElement};
use crate::parsers::ELEMENT_SELECTORS;
use crate::results::LinkCandidate;
use crate::utils::normalize_whitespace;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

/// Attributes copied into every element snapshot
const SNAPSHOT_ATTRIBUTES: [&str; 7] = ["href", "src", "alt", "type", "value", "id", "class"];

/// Time given to lazy-loaded content after each scroll
const SCROLL_SETTLE: Duration = Duration::from_millis(200);

/// Viewport height assumed when the browser will not report one
const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;

/// Connects to the WebDriver instance, trying common local endpoints if needed
pub async fn connect_to_webdriver(webdriver_url: &str) -> Result<Client> {
    match ClientBuilder::native().connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
        }
    }

    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://localhost:4444", // Selenium / geckodriver default
        "http://127.0.0.1:4444", // Try with IP instead of localhost
    ];

    for url in fallback_urls {
        if url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native().connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    Err(Error::WebDriver(format!(
        "no WebDriver server reachable at {webdriver_url}; start one or set WEBDRIVER_URL"
    )))
}

/// Navigates to `page_url` and returns the URL the browser ended up on
pub async fn open_page(client: &Client, page_url: &str) -> Result<String> {
    client
        .goto(page_url)
        .await
        .map_err(|e| Error::WebDriver(format!("failed to load {page_url}: {e}")))?;

    match client.current_url().await {
        Ok(url) => Ok(url.to_string()),
        Err(e) => {
            ::log::warn!("Could not read current URL, using {}: {}", page_url, e);
            Ok(page_url.to_string())
        }
    }
}

/// Every anchor on the loaded page that has an href
pub async fn collect_link_candidates(client: &Client, page_url: &str) -> Result<Vec<LinkCandidate>> {
    let anchors = client
        .find_all(Locator::Css("a"))
        .await
        .map_err(|e| Error::WebDriver(format!("failed to list anchors: {e}")))?;

    let mut candidates = Vec::with_capacity(anchors.len());
    for anchor in anchors {
        let href = match anchor.attr("href").await {
            Ok(Some(href)) if !href.trim().is_empty() => href,
            Ok(_) => continue,
            Err(e) => {
                ::log::debug!("Skipping unreadable anchor: {}", e);
                continue;
            }
        };
        let text = anchor
            .text()
            .await
            .map(|text| normalize_whitespace(&text))
            .unwrap_or_default();

        candidates.push(LinkCandidate::new(&href, &text, page_url));
    }

    ::log::info!("Found {} links in {}", candidates.len(), page_url);
    Ok(candidates)
}

/// Takes an immutable snapshot of a live element.
///
/// Returns `None` when even the tag name cannot be read. If any attribute
/// read fails the snapshot carries no attributes at all, which makes its
/// identity fall back to tag and position.
pub async fn snapshot_element(element: &Element) -> Option<ElementDescriptor> {
    let tag_name = match element.tag_name().await {
        Ok(tag_name) => tag_name,
        Err(e) => {
            ::log::debug!("Element went away before it could be read: {}", e);
            return None;
        }
    };

    let position = element.rectangle().await.ok().map(|(x, y, _, _)| Position {
        x: x.round() as i64,
        y: y.round() as i64,
    });
    let visible_text = element.text().await.unwrap_or_default();

    Some(ElementDescriptor {
        tag_name,
        visible_text,
        attributes: read_attributes(element).await,
        position,
    })
}

async fn read_attributes(element: &Element) -> Option<BTreeMap<String, String>> {
    let mut attributes = BTreeMap::new();
    for name in SNAPSHOT_ATTRIBUTES {
        match element.attr(name).await {
            Ok(Some(value)) => {
                attributes.insert(name.to_string(), value);
            }
            Ok(None) => {}
            Err(e) => {
                ::log::debug!("Attribute {} unreadable: {}", name, e);
                return None;
            }
        }
    }
    Some(attributes)
}

async fn script_number(client: &Client, script: &str) -> Option<f64> {
    client.execute(script, vec![]).await.ok()?.as_f64()
}

/// Scrolls through the page one viewport at a time and records every
/// element the first time it is seen.
pub async fn traverse_elements(
    client: &Client,
    seen: &mut IdentitySet,
    max_scrolls: usize,
) -> Result<Vec<SeenElement>> {
    let viewport = script_number(client, "return window.innerHeight;")
        .await
        .filter(|height| *height > 0.0)
        .unwrap_or(DEFAULT_VIEWPORT_HEIGHT);

    let mut found = Vec::new();
    let mut offset = 0.0;

    for step in 0..max_scrolls.max(1) {
        if let Err(e) = client
            .execute("window.scrollTo(0, arguments[0]);", vec![json!(offset)])
            .await
        {
            ::log::warn!("Scroll to {} failed: {}", offset, e);
            break;
        }
        tokio::time::sleep(SCROLL_SETTLE).await;

        let before = found.len();
        for (category, css) in ELEMENT_SELECTORS {
            let elements = client
                .find_all(Locator::Css(css))
                .await
                .map_err(|e| Error::WebDriver(format!("failed to list {category} elements: {e}")))?;

            for element in elements {
                let Some(descriptor) = snapshot_element(&element).await else {
                    continue;
                };
                found.extend(seen.observe(descriptor, category));
            }
        }
        ::log::debug!(
            "Scroll step {} at {}px: {} new elements",
            step,
            offset,
            found.len() - before
        );

        // Lazy loading can grow the page, so re-read its height every step
        let height = script_number(client, "return document.body.scrollHeight;")
            .await
            .unwrap_or(0.0);
        offset += viewport;
        if offset >= height {
            break;
        }
    }

    if let Err(e) = client.execute("window.scrollTo(0, 0);", vec![]).await {
        ::log::debug!("Could not scroll back to top: {}", e);
    }

    ::log::info!("Traversal found {} unique elements", found.len());
    Ok(found)
}
