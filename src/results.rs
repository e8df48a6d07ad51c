use crate::identity::SeenElement;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An anchor as seen on the audited page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    /// The href exactly as found, possibly relative
    pub raw_href: String,

    /// Trimmed visible text of the anchor
    pub visible_text: String,

    /// URL of the page the anchor was found on
    pub source_page_url: String,
}

impl LinkCandidate {
    pub fn new(raw_href: &str, visible_text: &str, source_page_url: &str) -> Self {
        Self {
            raw_href: raw_href.to_string(),
            visible_text: visible_text.to_string(),
            source_page_url: source_page_url.to_string(),
        }
    }
}

/// A candidate resolved to an absolute http(s) URL without fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLink {
    pub absolute_url: String,
    pub visible_text: String,
    pub source_page_url: String,
}

/// Why a link was classified the way it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusReason {
    #[serde(rename = "TRUE_404")]
    TrueNotFound,
    #[serde(rename = "SOFT_404")]
    SoftNotFound,
    #[serde(rename = "CONNECTION_FAILURE")]
    ConnectionFailure,
    #[serde(rename = "OK")]
    Ok,
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusReason::TrueNotFound => "TRUE_404",
            StatusReason::SoftNotFound => "SOFT_404",
            StatusReason::ConnectionFailure => "CONNECTION_FAILURE",
            StatusReason::Ok => "OK",
        };
        f.write_str(label)
    }
}

/// Outcome of checking one link.
///
/// `http_code` is `-1` when the status could not be determined. Such links
/// are not considered broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub http_code: i32,
    pub is_broken: bool,
    pub reason: StatusReason,
}

impl LinkStatus {
    pub const UNKNOWN_CODE: i32 = -1;

    pub fn not_found() -> Self {
        Self {
            http_code: 404,
            is_broken: true,
            reason: StatusReason::TrueNotFound,
        }
    }

    /// A 200 response whose body reads like an error page
    pub fn soft_not_found() -> Self {
        Self {
            http_code: 200,
            is_broken: true,
            reason: StatusReason::SoftNotFound,
        }
    }

    pub fn connection_failure() -> Self {
        Self {
            http_code: Self::UNKNOWN_CODE,
            is_broken: false,
            reason: StatusReason::ConnectionFailure,
        }
    }

    pub fn ok(http_code: i32) -> Self {
        Self {
            http_code,
            is_broken: false,
            reason: StatusReason::Ok,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.http_code == Self::UNKNOWN_CODE
    }
}

/// A link classified as broken, tagged with the page it was found on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub text: String,
    pub url: String,
    pub status: LinkStatus,
    pub page_url: String,
}

impl BrokenLink {
    pub(crate) fn new(link: ResolvedLink, status: LinkStatus) -> Self {
        Self {
            text: link.visible_text,
            url: link.absolute_url,
            status,
            page_url: link.source_page_url,
        }
    }
}

/// Everything one batch of link checks produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkCheckReport {
    pub page_url: String,

    /// Candidates handed to the checker
    pub candidates: usize,

    /// Distinct absolute URLs dispatched for checking
    pub unique_links: usize,

    /// Checks that finished before the batch deadline
    pub checked: usize,

    pub broken: Vec<BrokenLink>,

    /// Links whose status could not be determined
    pub unresolved: Vec<String>,

    /// Links still being checked when the batch deadline passed
    pub timed_out: Vec<String>,

    /// Checks that failed unexpectedly and were isolated
    pub task_failures: usize,
}

/// Result of auditing one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub page_url: String,
    pub links: LinkCheckReport,

    /// Distinct elements observed while traversing the page
    pub unique_elements: usize,

    /// First sighting of each of those elements, in traversal order
    pub elements: Vec<SeenElement>,
}
