use crate::checkers::{HttpFetcher, LinkFetcher};
use crate::config::LinkCheckConfig;
use crate::error::{Error, Result};
use crate::resolver::LinkResolver;
use crate::results::{BrokenLink, LinkCandidate, LinkCheckReport, LinkStatus, ResolvedLink};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use url::Url;

/// Checks every outbound link of a page on a bounded pool of workers
pub struct LinkHealthChecker<F: LinkFetcher = HttpFetcher> {
    fetcher: Arc<F>,
    config: LinkCheckConfig,
}

impl LinkHealthChecker<HttpFetcher> {
    /// Create a checker that fetches over HTTP
    pub fn new(config: LinkCheckConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Self::with_fetcher(fetcher, config)
    }
}

impl<F: LinkFetcher> LinkHealthChecker<F> {
    pub fn with_fetcher(fetcher: F, config: LinkCheckConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fetcher: Arc::new(fetcher),
            config,
        })
    }

    /// Check `candidates` found on `page_url` and return the broken ones.
    ///
    /// Output order is unspecified.
    pub async fn check_all(
        &self,
        candidates: &[LinkCandidate],
        page_url: &str,
    ) -> Result<Vec<BrokenLink>> {
        Ok(self.audit(candidates, page_url).await?.broken)
    }

    /// Like [`check_all`](Self::check_all), keeping the full outcome
    pub async fn audit(
        &self,
        candidates: &[LinkCandidate],
        page_url: &str,
    ) -> Result<LinkCheckReport> {
        let base = Url::parse(page_url).map_err(|source| Error::InvalidPageUrl {
            url: page_url.to_string(),
            source,
        })?;
        let resolver = LinkResolver::new(base, &self.config.exclude_patterns)?;

        let links = unique_links(&resolver, candidates);
        ::log::info!(
            "Checking {} unique links ({} candidates) from {}",
            links.len(),
            candidates.len(),
            page_url
        );

        let mut report = LinkCheckReport {
            page_url: page_url.to_string(),
            candidates: candidates.len(),
            unique_links: links.len(),
            ..Default::default()
        };

        // Fresh pool per run; dropping the JoinSet aborts whatever is left.
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<Id, ResolvedLink> = HashMap::with_capacity(links.len());

        for link in links {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let url = link.absolute_url.clone();

            let handle = tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return LinkStatus::connection_failure();
                };
                ::log::trace!("Checking {}", url);
                fetcher.fetch(&url).await
            });
            pending.insert(handle.id(), link);
        }

        let deadline = tokio::time::sleep(self.config.batch_timeout());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next_with_id() => {
                    let (id, status) = match joined {
                        Some(Ok((id, status))) => (id, status),
                        Some(Err(e)) => {
                            report.task_failures += 1;
                            ::log::warn!("Link check task failed: {}", e);
                            (e.id(), LinkStatus::connection_failure())
                        }
                        None => break,
                    };
                    let Some(link) = pending.remove(&id) else {
                        continue;
                    };
                    record(&mut report, link, status);
                }
                _ = &mut deadline => {
                    ::log::warn!(
                        "Batch deadline of {}s passed with {} checks outstanding",
                        self.config.batch_timeout_secs,
                        pending.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        for link in pending.into_values() {
            ::log::warn!("Check timed out: {}", link.absolute_url);
            report.timed_out.push(link.absolute_url);
        }

        ::log::info!(
            "Link check of {} complete: {} checked, {} broken, {} undetermined, {} timed out",
            page_url,
            report.checked,
            report.broken.len(),
            report.unresolved.len(),
            report.timed_out.len()
        );

        Ok(report)
    }
}

fn record(report: &mut LinkCheckReport, link: ResolvedLink, status: LinkStatus) {
    report.checked += 1;

    if status.is_unknown() {
        ::log::warn!("Connection failed for: {}", link.absolute_url);
        report.unresolved.push(link.absolute_url);
    } else if status.is_broken {
        ::log::warn!(
            "Broken link ({}): {} (text: {:?})",
            status.reason,
            link.absolute_url,
            link.visible_text
        );
        report.broken.push(BrokenLink::new(link, status));
    } else {
        ::log::debug!("Link OK: {} - status {}", link.absolute_url, status.http_code);
    }
}

/// Resolve candidates and keep the first one for each absolute URL
pub fn unique_links(resolver: &LinkResolver, candidates: &[LinkCandidate]) -> Vec<ResolvedLink> {
    let mut seen = HashSet::new();

    candidates
        .iter()
        .filter_map(|candidate| resolver.resolve(candidate).into_link())
        .filter(|link| seen.insert(link.absolute_url.clone()))
        .collect()
}
