/// Phrases typical of hand-rendered "not found" pages
const NOT_FOUND_PHRASES: [&str; 10] = [
    "404 not found",
    "page not found",
    "the page you requested was not found",
    "error 404",
    "http 404",
    "page cannot be found",
    "file not found",
    "resource not found",
    "nothing was found",
    "page does not exist",
];

/// Whether a body served with status 200 is really an error page.
///
/// Heuristic: pages that merely talk about 404 errors are flagged too.
pub fn looks_like_not_found_page(body: &str) -> bool {
    let lowered = body.to_lowercase();

    NOT_FOUND_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
        || (lowered.contains("404") && lowered.contains("not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrases() {
        assert!(looks_like_not_found_page("<h1>Page Not Found</h1>"));
        assert!(looks_like_not_found_page("<title>ERROR 404</title>"));
        assert!(looks_like_not_found_page("Sorry, nothing was found here."));
        assert!(looks_like_not_found_page("This page does not exist anymore"));
        assert!(looks_like_not_found_page(
            "<p>The page you requested was not found on this server.</p>"
        ));
    }

    #[test]
    fn test_404_and_not_found_apart() {
        assert!(looks_like_not_found_page(
            "<h1>404</h1><p>Whatever you were after was not found.</p>"
        ));
        assert!(!looks_like_not_found_page("<p>Call 404-555-0100</p>"));
    }

    #[test]
    fn test_ordinary_pages() {
        assert!(!looks_like_not_found_page(""));
        assert!(!looks_like_not_found_page(
            "<html><body><h1>Welcome</h1><p>Our products</p></body></html>"
        ));
    }
}
