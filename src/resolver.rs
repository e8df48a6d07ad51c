use crate::error::Result;
use crate::results::{LinkCandidate, ResolvedLink};
use regex::Regex;
use url::Url;

/// Schemes that never point at something we can fetch
const NON_FETCHABLE_PREFIXES: [&str; 3] = ["javascript:", "mailto:", "tel:"];

/// Why a candidate did not become a [`ResolvedLink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// href missing or blank
    Empty,
    /// javascript:, mailto:, tel: or any other non-http(s) scheme
    NonFetchableScheme,
    /// Only adds a fragment to the current page
    SamePageAnchor,
    /// Could not be parsed against the base URL
    Malformed,
    /// Matched a configured exclude pattern
    Excluded,
}

/// Outcome of resolving one href
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Link(ResolvedLink),
    Skipped(SkipReason),
}

impl Resolution {
    pub fn into_link(self) -> Option<ResolvedLink> {
        match self {
            Resolution::Link(link) => Some(link),
            Resolution::Skipped(_) => None,
        }
    }
}

/// Resolve `raw_href` against `base` into a fetchable absolute URL.
///
/// The returned URL never carries a fragment.
pub fn resolve_url(raw_href: &str, base: &Url) -> std::result::Result<Url, SkipReason> {
    let href = raw_href.trim();
    if href.is_empty() {
        return Err(SkipReason::Empty);
    }

    let lowered = href.to_ascii_lowercase();
    if NON_FETCHABLE_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return Err(SkipReason::NonFetchableScheme);
    }

    let mut resolved = match base.join(href) {
        Ok(url) => url,
        Err(e) => {
            ::log::debug!("Cannot resolve {:?} against {}: {}", href, base, e);
            return Err(SkipReason::Malformed);
        }
    };

    if !matches!(resolved.scheme(), "http" | "https") {
        return Err(SkipReason::NonFetchableScheme);
    }

    if resolved.fragment().is_some() {
        resolved.set_fragment(None);
        let mut page = base.clone();
        page.set_fragment(None);
        if resolved == page {
            return Err(SkipReason::SamePageAnchor);
        }
    }

    Ok(resolved)
}

/// Turns page anchors into links worth checking
#[derive(Debug)]
pub struct LinkResolver {
    base: Url,
    exclude_regexes: Vec<Regex>,
}

impl LinkResolver {
    /// Create a resolver for links found on `base`
    pub fn new(base: Url, exclude_patterns: &[String]) -> Result<Self> {
        let mut exclude_regexes = Vec::with_capacity(exclude_patterns.len());
        for pattern in exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            base,
            exclude_regexes,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a candidate's href against the page being audited
    pub fn resolve(&self, candidate: &LinkCandidate) -> Resolution {
        let url = match resolve_url(&candidate.raw_href, &self.base) {
            Ok(url) => url,
            Err(reason) => {
                ::log::trace!("Skipping {:?}: {:?}", candidate.raw_href, reason);
                return Resolution::Skipped(reason);
            }
        };

        let url_str = url.as_str();
        if self.exclude_regexes.iter().any(|re| re.is_match(url_str)) {
            ::log::debug!("Exclude pattern matched: {}", url_str);
            return Resolution::Skipped(SkipReason::Excluded);
        }

        Resolution::Link(ResolvedLink {
            absolute_url: url.into(),
            visible_text: candidate.visible_text.clone(),
            source_page_url: candidate.source_page_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://site.com/page").unwrap()
    }

    #[test]
    fn test_relative_and_absolute() {
        assert_eq!(
            resolve_url("/a", &base()).unwrap().as_str(),
            "https://site.com/a"
        );
        assert_eq!(
            resolve_url("other", &base()).unwrap().as_str(),
            "https://site.com/other"
        );
        assert_eq!(
            resolve_url("https://elsewhere.org/x?y=1", &base())
                .unwrap()
                .as_str(),
            "https://elsewhere.org/x?y=1"
        );
        assert_eq!(
            resolve_url("//cdn.site.com/lib", &base()).unwrap().as_str(),
            "https://cdn.site.com/lib"
        );
    }

    #[test]
    fn test_non_fetchable_schemes() {
        for href in [
            "javascript:void(0)",
            "mailto:x@x.com",
            "tel:+15551234",
            "  JavaScript:alert(1)",
            "MAILTO:someone@site.com",
            "ftp://files.site.com/a",
            "data:text/plain,hi",
        ] {
            assert_eq!(
                resolve_url(href, &base()),
                Err(SkipReason::NonFetchableScheme),
                "{href}"
            );
        }
    }

    #[test]
    fn test_empty_href() {
        assert_eq!(resolve_url("", &base()), Err(SkipReason::Empty));
        assert_eq!(resolve_url("   ", &base()), Err(SkipReason::Empty));
    }

    #[test]
    fn test_same_page_anchor() {
        assert_eq!(resolve_url("#", &base()), Err(SkipReason::SamePageAnchor));
        assert_eq!(
            resolve_url("#contact", &base()),
            Err(SkipReason::SamePageAnchor)
        );
        assert_eq!(
            resolve_url("https://site.com/page#top", &base()),
            Err(SkipReason::SamePageAnchor)
        );
    }

    #[test]
    fn test_path_change_with_fragment_is_kept() {
        assert_eq!(
            resolve_url("/a#", &base()).unwrap().as_str(),
            "https://site.com/a"
        );
        assert_eq!(
            resolve_url("/docs#install", &base()).unwrap().as_str(),
            "https://site.com/docs"
        );
    }

    #[test]
    fn test_malformed() {
        assert_eq!(
            resolve_url("http://[::1", &base()),
            Err(SkipReason::Malformed)
        );
    }

    #[test]
    fn test_exclude_patterns() {
        let resolver =
            LinkResolver::new(base(), &[r"linkedin\.com".to_string()]).unwrap();

        let excluded = LinkCandidate::new(
            "https://www.linkedin.com/company/x",
            "LinkedIn",
            "https://site.com/page",
        );
        assert_eq!(
            resolver.resolve(&excluded),
            Resolution::Skipped(SkipReason::Excluded)
        );

        let kept = LinkCandidate::new("/about", "About", "https://site.com/page");
        let link = resolver.resolve(&kept).into_link().unwrap();
        assert_eq!(link.absolute_url, "https://site.com/about");
        assert_eq!(link.visible_text, "About");
        assert_eq!(link.source_page_url, "https://site.com/page");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(LinkResolver::new(base(), &["(unclosed".to_string()]).is_err());
    }
}
