// src/checker/html.rs
// =============================================================================
// Content fingerprint of an HTML page.
//
// We don't store page bodies. Instead we hash the three things that change
// when a page's content meaningfully changes:
//
//   <title>, the first <h1>, and <meta name="description" content="...">
//
// Each is trimmed (missing ones are ""), then concatenated in that order,
// UTF-8 encoded and hashed with SHA-256. The hex digest is the fingerprint.
//
// We use the `scraper` crate to find the elements with CSS selectors.
// =============================================================================

use scraper::{Html, Selector};
use sha2::{Digest, Sha256};

/// The parts of a page that feed the fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub title: String,
    pub h1: String,
    pub description: String,
}

impl PageSummary {
    /// Pulls title, first h1 and meta description out of an HTML document
    pub fn extract(html: &str) -> Self {
        let document = Html::parse_document(html);

        // constant selectors, known to be valid
        let title_selector = Selector::parse("title").expect("valid selector");
        let h1_selector = Selector::parse("h1").expect("valid selector");
        let meta_selector = Selector::parse(r#"meta[name="description"]"#).expect("valid selector");

        let first_text = |selector: &Selector| {
            document
                .select(selector)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default()
        };

        let description = document
            .select(&meta_selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        PageSummary {
            title: first_text(&title_selector),
            h1: first_text(&h1_selector),
            description,
        }
    }

    /// SHA-256 hex digest of title + h1 + description
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update(self.h1.as_bytes());
        hasher.update(self.description.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Fingerprint of an HTML document.
pub fn fingerprint(html: &str) -> String {
    PageSummary::extract(html).content_hash()
}
