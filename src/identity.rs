//! Content-based identities for DOM elements.
//!
//! The same element is usually seen several times while a page is
//! scrolled, each time at a different on-screen position. The identity
//! built here ignores position, so a set of identities tells whether an
//! element has already been handled.

use crate::utils::{normalize_whitespace, truncate_chars};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use xxhash_rust::xxh3::xxh3_64;

/// Visible text beyond this many characters does not affect the identity
const MAX_TEXT_CHARS: usize = 100;

/// Page position of an element when it was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// Immutable snapshot of a DOM node taken by the page layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub tag_name: String,
    pub visible_text: String,

    /// `None` when the attributes could not be read, e.g. the node went stale
    pub attributes: Option<BTreeMap<String, String>>,

    /// Last-known position; only used when `attributes` is missing
    pub position: Option<Position>,
}

impl ElementDescriptor {
    pub fn new(tag_name: &str, visible_text: &str) -> Self {
        Self {
            tag_name: tag_name.to_string(),
            visible_text: visible_text.to_string(),
            attributes: Some(BTreeMap::new()),
            position: None,
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_position(mut self, x: i64, y: i64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .as_ref()?
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// An element recorded on its first sighting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenElement {
    pub category: String,
    pub identity: String,
    pub descriptor: ElementDescriptor,
}

/// Attributes that tell apart elements of the same tag
fn discriminating_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" | "link" => &["href"],
        "img" => &["src", "alt"],
        "button" | "input" => &["type", "value"],
        _ => &[],
    }
}

/// Build the identity of `descriptor` within `category`.
///
/// Two descriptors share an identity exactly when they agree on category,
/// tag, normalized text prefix, tag-specific attributes, id and the set of
/// class tokens. Attribute values are written as `name:len:value_` so a
/// value cannot pass for the fields after it.
pub fn identify(descriptor: &ElementDescriptor, category: &str) -> String {
    let tag = descriptor.tag_name.to_lowercase();

    if descriptor.attributes.is_none() {
        return fallback_identity(descriptor, category, &tag);
    }

    let mut identity = format!("{category}_{tag}_");

    let text = normalize_whitespace(&descriptor.visible_text);
    if text.is_empty() {
        identity.push_str("notext_");
    } else {
        let prefix = truncate_chars(&text, MAX_TEXT_CHARS);
        identity.push_str(&format!("{:016x}_", xxh3_64(prefix.as_bytes())));
    }

    for name in discriminating_attributes(&tag) {
        if let Some(value) = descriptor.attr(name) {
            push_field(&mut identity, name, value);
        }
    }

    if let Some(id) = descriptor.attr("id") {
        push_field(&mut identity, "id", id);
    }

    if let Some(class) = descriptor.attr("class") {
        let mut classes: Vec<&str> = class.split_whitespace().collect();
        if !classes.is_empty() {
            classes.sort_unstable();
            push_field(&mut identity, "class", &classes.join(" "));
        }
    }

    identity
}

fn push_field(identity: &mut String, name: &str, value: &str) {
    identity.push_str(&format!("{name}:{}:{value}_", value.len()));
}

/// Coarse identity for nodes whose attributes could not be read
fn fallback_identity(descriptor: &ElementDescriptor, category: &str, tag: &str) -> String {
    match descriptor.position {
        Some(Position { x, y }) => format!("{category}_{tag}_{x}_{y}"),
        None => format!("{category}_{tag}_nopos"),
    }
}

/// Identities seen during one audit run
#[derive(Debug, Default)]
pub struct IdentitySet {
    seen: HashSet<String>,
}

impl IdentitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `descriptor` and return its identity if it was not seen before
    pub fn first_sighting(&mut self, descriptor: &ElementDescriptor, category: &str) -> Option<String> {
        let identity = identify(descriptor, category);
        if self.seen.insert(identity.clone()) {
            Some(identity)
        } else {
            ::log::trace!("Already seen: {}", identity);
            None
        }
    }

    /// Like [`first_sighting`](Self::first_sighting), keeping the snapshot
    pub fn observe(&mut self, descriptor: ElementDescriptor, category: &str) -> Option<SeenElement> {
        let identity = self.first_sighting(&descriptor, category)?;
        Some(SeenElement {
            category: category.to_string(),
            identity,
            descriptor,
        })
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.seen.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget everything; called between runs
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(class: &str) -> ElementDescriptor {
        ElementDescriptor::new("BUTTON", "Sign up")
            .with_attr("type", "submit")
            .with_attr("class", class)
    }

    #[test]
    fn test_class_order_does_not_matter() {
        assert_eq!(
            identify(&button("btn active"), "button"),
            identify(&button("active btn"), "button")
        );
        assert_eq!(
            identify(&button("  btn   active "), "button"),
            identify(&button("active btn"), "button")
        );
    }

    #[test]
    fn test_position_is_ignored() {
        let top = button("btn").with_position(10, 20);
        let scrolled = button("btn").with_position(10, -780);
        assert_eq!(identify(&top, "button"), identify(&scrolled, "button"));
    }

    #[test]
    fn test_layout() {
        let link = ElementDescriptor::new("A", "  Read\n more ")
            .with_attr("href", "https://site.com/a")
            .with_attr("id", "cta")
            .with_attr("class", "b a");
        let hash = xxh3_64("Read more".as_bytes());
        assert_eq!(
            identify(&link, "link"),
            format!("link_a_{hash:016x}_href:18:https://site.com/a_id:3:cta_class:3:a b_")
        );

        let empty = ElementDescriptor::new("p", "   ");
        assert_eq!(identify(&empty, "paragraph"), "paragraph_p_notext_");
    }

    #[test]
    fn test_tag_specific_attributes() {
        let img = ElementDescriptor::new("img", "")
            .with_attr("src", "/logo.png")
            .with_attr("alt", "Logo")
            .with_attr("href", "ignored");
        assert_eq!(identify(&img, "other"), "other_img_notext_src:9:/logo.png_alt:4:Logo_");

        let input = ElementDescriptor::new("input", "")
            .with_attr("type", "email")
            .with_attr("value", "")
            .with_attr("src", "ignored");
        assert_eq!(identify(&input, "other"), "other_input_notext_type:5:email_");
    }

    #[test]
    fn test_distinguishing_fields() {
        let a = ElementDescriptor::new("a", "Docs").with_attr("href", "/docs");
        let b = ElementDescriptor::new("a", "Docs").with_attr("href", "/blog");
        let c = ElementDescriptor::new("a", "Blog").with_attr("href", "/docs");
        assert_ne!(identify(&a, "link"), identify(&b, "link"));
        assert_ne!(identify(&a, "link"), identify(&c, "link"));
        assert_ne!(identify(&a, "link"), identify(&a, "other"));
    }

    #[test]
    fn test_attribute_values_cannot_spill_into_other_fields() {
        let spilled = ElementDescriptor::new("a", "Profile").with_attr("href", "/x_id:y");
        let with_id = ElementDescriptor::new("a", "Profile")
            .with_attr("href", "/x")
            .with_attr("id", "y");
        assert_ne!(identify(&spilled, "link"), identify(&with_id, "link"));

        let spilled_class = ElementDescriptor::new("button", "Go")
            .with_attr("type", "submit")
            .with_attr("id", "go_class:wide");
        let with_class = ElementDescriptor::new("button", "Go")
            .with_attr("type", "submit")
            .with_attr("id", "go")
            .with_attr("class", "wide");
        assert_ne!(identify(&spilled_class, "button"), identify(&with_class, "button"));
    }

    #[test]
    fn test_long_text_is_bounded() {
        let long = "word ".repeat(500);
        let other_tail = format!("{}different ending", "word ".repeat(100));
        let a = ElementDescriptor::new("p", &long);
        let b = ElementDescriptor::new("p", &other_tail);
        assert_eq!(identify(&a, "paragraph"), identify(&b, "paragraph"));
    }

    #[test]
    fn test_fallback_when_attributes_unreadable() {
        let mut stale = ElementDescriptor::new("DIV", "text").with_position(5, 300);
        stale.attributes = None;
        assert_eq!(identify(&stale, "other"), "other_div_5_300");

        stale.position = None;
        assert_eq!(identify(&stale, "other"), "other_div_nopos");
    }

    #[test]
    fn test_identity_set() {
        let mut set = IdentitySet::new();
        let first = set.first_sighting(&button("btn active").with_position(0, 0), "button");
        assert!(first.is_some());
        assert!(
            set.first_sighting(&button("active btn").with_position(0, 900), "button")
                .is_none()
        );
        assert!(set.contains(&first.unwrap()));
        assert_eq!(set.len(), 1);

        set.reset();
        assert!(set.is_empty());
    }

    #[test]
    fn test_observe_keeps_first_snapshot() {
        let mut set = IdentitySet::new();
        let seen = set
            .observe(button("btn").with_position(0, 40), "button")
            .unwrap();
        assert_eq!(seen.category, "button");
        assert_eq!(seen.descriptor.position, Some(Position { x: 0, y: 40 }));
        assert_eq!(seen.identity, identify(&button("btn"), "button"));

        assert!(set.observe(button("btn").with_position(0, -760), "button").is_none());
        assert_eq!(set.len(), 1);
    }
}
