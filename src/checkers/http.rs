use crate::checkers::LinkFetcher;
use crate::checkers::soft404::looks_like_not_found_page;
use crate::config::LinkCheckConfig;
use crate::error::{Error, Result};
use crate::results::LinkStatus;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, LOCATION};
use reqwest::{Client, Response, redirect};
use std::time::Duration;
use url::Url;

/// Only this much of a 200 body is inspected for not-found wording
pub const MAX_BODY_SNIFF_BYTES: usize = 256 * 1024;

/// Fetches links over HTTP, following redirects by hand.
///
/// The client never follows redirects itself: every hop is resolved
/// against the URL that produced it so the status that gets classified is
/// the one at the end of the chain.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &LinkCheckConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
        })
    }

    /// The underlying client, configured with the audit's headers and timeouts
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Check `url`, retrying transport failures with a fixed delay
    pub async fn check(&self, url: &str) -> LinkStatus {
        let start = match Url::parse(url) {
            Ok(start) => start,
            Err(e) => {
                ::log::warn!("Malformed URL {}: {}", url, e);
                return LinkStatus::connection_failure();
            }
        };

        for attempt in 1..=self.max_attempts {
            match self.check_once(&start).await {
                Ok(status) => return status,
                Err(e) => {
                    ::log::warn!(
                        "Attempt {} of {} failed for {}: {}",
                        attempt,
                        self.max_attempts,
                        url,
                        e
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        ::log::warn!("Giving up on {} after {} attempts", url, self.max_attempts);
        LinkStatus::connection_failure()
    }

    /// One attempt: request, walk the redirect chain, classify
    async fn check_once(&self, start: &Url) -> std::result::Result<LinkStatus, reqwest::Error> {
        let mut current = start.clone();
        let mut response = self.client.get(current.clone()).send().await?;
        let mut hops = 0;

        while response.status().is_redirection() {
            if hops >= self.max_redirects {
                ::log::warn!(
                    "Redirect limit of {} reached at {} (original: {})",
                    self.max_redirects,
                    current,
                    start
                );
                break;
            }

            let Some(next) = redirect_target(&current, &response) else {
                break;
            };

            hops += 1;
            ::log::debug!("Following redirect #{} from {} to {}", hops, current, next);
            current = next;
            response = self.client.get(current.clone()).send().await?;
        }

        Ok(classify(start, &current, response).await)
    }
}

/// Where a 3xx response points, resolved against the URL that returned it
fn redirect_target(current: &Url, response: &Response) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?.trim();
    if location.is_empty() {
        return None;
    }

    match current.join(location) {
        Ok(next) => Some(next),
        Err(e) => {
            ::log::warn!("Bad Location {:?} from {}: {}", location, current, e);
            None
        }
    }
}

async fn classify(start: &Url, current: &Url, response: Response) -> LinkStatus {
    let code = response.status().as_u16();

    match code {
        404 => {
            ::log::warn!("404 Not Found: {} (original: {})", current, start);
            LinkStatus::not_found()
        }
        200 => match read_prefix(response, MAX_BODY_SNIFF_BYTES).await {
            Ok(body) if looks_like_not_found_page(&body) => {
                ::log::warn!("Soft 404 (200 with not-found content): {}", current);
                LinkStatus::soft_not_found()
            }
            Ok(_) => {
                ::log::debug!("OK: {}", current);
                LinkStatus::ok(200)
            }
            Err(e) => {
                ::log::warn!("Could not read body of {} for soft 404 check: {}", current, e);
                LinkStatus::ok(200)
            }
        },
        _ => {
            if code >= 400 {
                ::log::info!("Error status {} (not 404): {}", code, current);
            } else {
                ::log::debug!("Status {}: {}", code, current);
            }
            LinkStatus::ok(i32::from(code))
        }
    }
}

/// Reads at most `limit` bytes of the body and drops the rest of the stream
async fn read_prefix(mut response: Response, limit: usize) -> reqwest::Result<String> {
    let mut body = Vec::new();
    while body.len() < limit {
        match response.chunk().await? {
            Some(chunk) => body.extend_from_slice(&chunk),
            None => break,
        }
    }
    body.truncate(limit);
    Ok(String::from_utf8_lossy(&body).into_owned())
}

impl LinkFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> LinkStatus {
        self.check(url).await
    }
}
