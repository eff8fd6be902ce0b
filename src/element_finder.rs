use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::models::ItemIdentifier;

static BACKGROUND_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"background-image:\s*url\(\s*['"]?([^'")]+)['"]?\s*\)"#).unwrap()
});

/// One way of pulling a value out of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Trimmed, whitespace-collapsed text of the first match.
    Text { selector: &'static str },
    /// Attribute of the first match.
    Attribute {
        selector: &'static str,
        attribute: &'static str,
    },
    /// Attribute of the first match, which must start with `prefix`; the
    /// remainder is the value.
    PrefixedAttribute {
        selector: &'static str,
        attribute: &'static str,
        prefix: &'static str,
    },
    /// Image URL inside an inline `background-image: url(...)` style: the
    /// path segment after the last `marker`, with `suffix` removed.
    BackgroundImage {
        selector: &'static str,
        marker: &'static str,
        suffix: &'static str,
    },
}

impl ExtractionStrategy {
    pub fn selector(&self) -> &'static str {
        match self {
            ExtractionStrategy::Text { selector }
            | ExtractionStrategy::Attribute { selector, .. }
            | ExtractionStrategy::PrefixedAttribute { selector, .. }
            | ExtractionStrategy::BackgroundImage { selector, .. } => *selector,
        }
    }

    pub fn extract(&self, document: &Html) -> Option<String> {
        let selector = match Selector::parse(self.selector()) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::debug!("Skipping invalid selector '{}': {:?}", self.selector(), e);
                return None;
            }
        };
        let element = document.select(&selector).next()?;

        let value = match self {
            ExtractionStrategy::Text { .. } => normalized_text(element),
            ExtractionStrategy::Attribute { attribute, .. } => {
                element.value().attr(attribute)?.trim().to_string()
            }
            ExtractionStrategy::PrefixedAttribute { attribute, prefix, .. } => element
                .value()
                .attr(attribute)?
                .trim()
                .strip_prefix(*prefix)?
                .to_string(),
            ExtractionStrategy::BackgroundImage { marker, suffix, .. } => {
                let style = element.value().attr("style")?;
                let image_url = BACKGROUND_URL.captures(style)?.get(1)?.as_str();
                let (_, tail) = image_url.rsplit_once(*marker)?;
                tail.strip_suffix(*suffix).unwrap_or(tail).to_string()
            }
        };

        if value.is_empty() { None } else { Some(value) }
    }
}

/// Current title link first, then the poster header.
pub const IDENTIFIER_STRATEGIES: &[ExtractionStrategy] = &[
    ExtractionStrategy::PrefixedAttribute {
        selector: "a.card-show__placeholder",
        attribute: "href",
        prefix: "/manga/",
    },
    ExtractionStrategy::BackgroundImage {
        selector: "div.card-show__header",
        marker: "/posters/",
        suffix: ".jpg",
    },
];

/// Mobile layout first, then desktop.
pub const TITLE_STRATEGIES: &[ExtractionStrategy] = &[
    ExtractionStrategy::Text {
        selector: "h1.manga-mobile__name",
    },
    ExtractionStrategy::Text {
        selector: "h1.manga__name",
    },
];

/// Mobile layout first, then desktop.
pub const IMAGE_STRATEGIES: &[ExtractionStrategy] = &[
    ExtractionStrategy::Attribute {
        selector: "img.manga-mobile__image",
        attribute: "src",
    },
    ExtractionStrategy::Attribute {
        selector: "div.manga__img img",
        attribute: "src",
    },
];

pub const CSRF_STRATEGIES: &[ExtractionStrategy] = &[ExtractionStrategy::Attribute {
    selector: r#"meta[name="csrf-token"]"#,
    attribute: "content",
}];

/// Present only on pages rendered for a signed-in user.
pub const AUTHENTICATED_MARKER: &str = "div.header-profile";

/// First non-empty value produced by `strategies`, tried in order.
pub fn find_first(document: &Html, strategies: &[ExtractionStrategy]) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy.extract(document))
}

/// Names of the selectors a strategy list tries, for error messages.
pub fn describe(strategies: &[ExtractionStrategy]) -> String {
    strategies
        .iter()
        .map(ExtractionStrategy::selector)
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn find_identifier(html: &str) -> Option<ItemIdentifier> {
    let document = Html::parse_document(html);
    find_first(&document, IDENTIFIER_STRATEGIES).and_then(ItemIdentifier::new)
}

/// Fields scraped from a title page; either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetails {
    pub title: Option<String>,
    pub image: Option<String>,
}

pub fn find_item_details(html: &str) -> ItemDetails {
    let document = Html::parse_document(html);
    ItemDetails {
        title: find_first(&document, TITLE_STRATEGIES),
        image: find_first(&document, IMAGE_STRATEGIES),
    }
}

pub fn find_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    find_first(&document, CSRF_STRATEGIES)
}

pub fn is_authenticated(html: &str) -> bool {
    let document = Html::parse_document(html);
    match Selector::parse(AUTHENTICATED_MARKER) {
        Ok(selector) => document.select(&selector).next().is_some(),
        Err(_) => false,
    }
}

fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
