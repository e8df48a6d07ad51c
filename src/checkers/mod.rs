pub mod http;
pub mod links;
pub mod soft404;


use crate::results::LinkStatus;
use std::future::Future;

pub use http::HttpFetcher;
pub use links::LinkHealthChecker;
pub use soft404::looks_like_not_found_page;

/// Classifies a single absolute URL.
///
/// Implementations never fail: anything that prevents a verdict is
/// reported as [`LinkStatus::connection_failure`].
pub trait LinkFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = LinkStatus> + Send;
}
