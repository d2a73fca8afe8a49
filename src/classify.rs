// src/classify.rs
// =============================================================================
// Maps a URL to a coarse content category by looking at its path.
//
// Rules are checked top to bottom and the first hit wins. Order matters:
// "/shop/blog/x" contains both "/shop/" and "/blog/" and is an article.
// =============================================================================

use crate::model::Category;
use url::Url;

const RULES: &[(&[&str], Category)] = &[
    (&["/blog/", "/post/", "/article/", "/news/"], Category::PostArticle),
    (&["/web-stories/", "/web-story/"], Category::WebStory),
    (&["/product/", "/shop/"], Category::Product),
    (&["/category/", "/collection/"], Category::CategoryPage),
];

/// Classifies a URL (absolute, or a bare path) by its lower-cased path.
pub fn classify(url: &str) -> Category {
    let path = url_path(url).to_lowercase();

    for (needles, category) in RULES {
        if needles.iter().any(|needle| path.contains(needle)) {
            return *category;
        }
    }

    if path.is_empty() || path == "/" {
        Category::Homepage
    } else {
        Category::OtherPage
    }
}

// Path component of an absolute URL; for anything that doesn't parse,
// whatever precedes the query string or fragment.
fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_paths() {
        assert_eq!(classify("https://example.com/blog/hello"), Category::PostArticle);
        assert_eq!(classify("https://example.com/NEWS/today"), Category::PostArticle);
        assert_eq!(classify("https://example.com/2024/post/x"), Category::PostArticle);
    }

    #[test]
    fn test_rule_order_wins() {
        // both "/shop/" and "/blog/" match; articles are checked first
        assert_eq!(classify("https://example.com/shop/blog/x"), Category::PostArticle);
        assert_eq!(classify("https://example.com/web-stories/product/x"), Category::WebStory);
        assert_eq!(classify("https://example.com/product/category/x"), Category::Product);
    }

    #[test]
    fn test_other_categories() {
        assert_eq!(classify("https://example.com/web-story/a"), Category::WebStory);
        assert_eq!(classify("https://example.com/collection/summer"), Category::CategoryPage);
        assert_eq!(classify("https://example.com/about-us"), Category::OtherPage);
    }

    #[test]
    fn test_homepage() {
        assert_eq!(classify("https://example.com"), Category::Homepage);
        assert_eq!(classify("https://example.com/"), Category::Homepage);
        assert_eq!(classify("https://example.com/?ref=home"), Category::Homepage);
        assert_eq!(classify(""), Category::Homepage);
    }

    #[test]
    fn test_needles_need_both_slashes() {
        // "/blog" without a trailing slash is not an article path
        assert_eq!(classify("https://example.com/blog"), Category::OtherPage);
    }

    #[test]
    fn test_classification_is_stable() {
        let url = "https://example.com/shop/item-1";
        assert_eq!(classify(url), classify(url));
    }
}
