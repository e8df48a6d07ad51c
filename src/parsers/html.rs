use crate::identity::ElementDescriptor;
use crate::parsers::ELEMENT_SELECTORS;
use crate::results::LinkCandidate;
use crate::utils::normalize_whitespace;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Extracts link candidates from a page's HTML
pub fn extract_candidates(html: &str, page_url: &str) -> Vec<LinkCandidate> {
    let doc = Html::parse_document(html);

    let candidates = doc
        .select(&ANCHOR_SELECTOR)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            Some(LinkCandidate::new(href, &element_text(&anchor), page_url))
        })
        .collect::<Vec<_>>();

    ::log::debug!("HTML parser found {} links", candidates.len());
    candidates
}

/// Snapshots the page's elements, grouped by category
pub fn extract_elements(html: &str) -> Vec<(&'static str, ElementDescriptor)> {
    let doc = Html::parse_document(html);
    let mut elements = Vec::new();

    for (category, css) in ELEMENT_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            ::log::warn!("Skipping invalid selector {:?}", css);
            continue;
        };
        for element in doc.select(&selector) {
            elements.push((category, descriptor(&element)));
        }
    }

    elements
}

fn descriptor(element: &ElementRef<'_>) -> ElementDescriptor {
    let attributes = element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect::<BTreeMap<_, _>>();

    ElementDescriptor {
        tag_name: element.value().name().to_string(),
        visible_text: element_text(element),
        attributes: Some(attributes),
        position: None,
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}
