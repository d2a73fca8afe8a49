// src/sitemap/robots.rs
// =============================================================================
// Finds sitemap locations for a site.
//
// robots.txt may declare any number of sitemaps:
//
//   User-agent: *
//   Disallow: /admin
//   Sitemap: https://example.com/sitemap_index.xml
//
// The directive name is case-insensitive ("sitemap:", "SITEMAP:" ...).
// When robots.txt declares nothing we guess the two usual locations.
// =============================================================================

use url::Url;

/// Conventional sitemap paths tried when robots.txt names none.
pub const FALLBACK_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml"];

/// Extracts every `Sitemap:` value from a robots.txt body, in order,
/// without duplicates.
pub fn sitemap_directives(robots_txt: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for line in robots_txt.lines() {
        // split at the first colon only: the value is itself a URL
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("sitemap") {
            continue;
        }

        let value = value.trim();
        if !value.is_empty() && !found.iter().any(|existing| existing == value) {
            found.push(value.to_string());
        }
    }

    found
}

/// The conventional sitemap locations for a site, rooted at its origin.
pub fn fallback_locations(base: &Url) -> Vec<String> {
    FALLBACK_PATHS
        .iter()
        .filter_map(|path| base.join(path).ok())
        .map(|url| url.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_case_insensitive() {
        let robots = "User-agent: *\nDisallow: /private\nSitemap: https://a.com/s1.xml\nsitemap:https://a.com/s2.xml\n  SITEMAP:   https://a.com/s3.xml  \n";
        assert_eq!(
            sitemap_directives(robots),
            vec![
                "https://a.com/s1.xml".to_string(),
                "https://a.com/s2.xml".to_string(),
                "https://a.com/s3.xml".to_string(),
            ]
        );
    }

    #[test]
    fn test_duplicate_and_empty_directives() {
        let robots = "Sitemap: https://a.com/s.xml\nSitemap:\nSitemap: https://a.com/s.xml\n";
        assert_eq!(sitemap_directives(robots), vec!["https://a.com/s.xml".to_string()]);
    }

    #[test]
    fn test_no_directives() {
        assert!(sitemap_directives("User-agent: *\nAllow: /").is_empty());
        assert!(sitemap_directives("").is_empty());
    }

    #[test]
    fn test_fallbacks_use_origin() {
        let base = Url::parse("https://example.com/some/deep/page").unwrap();
        assert_eq!(
            fallback_locations(&base),
            vec![
                "https://example.com/sitemap.xml".to_string(),
                "https://example.com/sitemap_index.xml".to_string(),
            ]
        );
    }
}
