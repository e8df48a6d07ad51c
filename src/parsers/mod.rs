pub mod html;

/// Element categories collected during traversal, with the CSS selector
/// that finds them. A node matching several selectors is seen once per
/// category, since the category is part of its identity.
pub const ELEMENT_SELECTORS: [(&str, &str); 5] = [
    ("heading", "h1, h2, h3, h4, h5, h6"),
    ("paragraph", "p"),
    ("button", "button"),
    ("link", "a"),
    ("other", "img, li, input"),
];
