// src/sitemap/parse.rs
// =============================================================================
// Parses one sitemap document.
//
// Two shapes exist (https://www.sitemaps.org/protocol.html):
//
//   <sitemapindex>                     <urlset>
//     <sitemap>                          <url>
//       <loc>child sitemap</loc>           <loc>page</loc>
//     </sitemap>                           <lastmod>2024-01-01</lastmod>
//   </sitemapindex>                      </url>
//                                      </urlset>
//
// The root element decides which one we have. The default namespace
// declaration is removed first and element names are compared by local
// name, so prefixed and unprefixed documents read the same. Only direct
// children of an entry count, so <image:loc> inside <url> is not a page.
//
// Entries without a usable <loc> are skipped. Broken XML is an error for
// this document only; the resolver decides what that means for the scan.
// =============================================================================

use crate::error::SitemapError;
use crate::model::UrlRecord;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// A parsed sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// Child sitemap URLs (as written, possibly relative)
    Index(Vec<String>),
    /// Page entries
    UrlSet(Vec<UrlRecord>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    Index,
    UrlSet,
}

impl Root {
    // element wrapping one entry
    fn entry_tag(self) -> &'static str {
        match self {
            Root::Index => "sitemap",
            Root::UrlSet => "url",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    LastMod,
}

#[derive(Debug, Default)]
struct Entry {
    loc: Option<String>,
    lastmod: Option<String>,
}

fn namespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"\s+xmlns="[^"]+""#).expect("namespace pattern is valid"))
}

/// Removes the first default namespace declaration (`xmlns="..."`).
/// Prefixed declarations such as `xmlns:image="..."` are left alone.
pub fn strip_default_namespace(xml: &str) -> Cow<'_, str> {
    namespace_pattern().replacen(xml, 1, "")
}

/// Parses a sitemap or sitemap index document.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SitemapError> {
    let xml = strip_default_namespace(xml);
    let mut reader = Reader::from_str(&xml);
    reader.trim_text(true);

    // root element is depth 1, entries 2, entry fields 3
    let mut depth: usize = 0;
    let mut root: Option<Root> = None;
    let mut entry: Option<Entry> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    let mut children: Vec<String> = Vec::new();
    let mut pages: Vec<UrlRecord> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match (root, depth) {
                    (None, _) => root = Some(detect_root(&name)?),
                    (Some(r), 2) if name == r.entry_tag() => entry = Some(Entry::default()),
                    (Some(_), 3) if entry.is_some() => {
                        field = match name.as_str() {
                            "loc" => Some(Field::Loc),
                            "lastmod" => Some(Field::LastMod),
                            _ => None,
                        };
                        text.clear();
                    }
                    _ => {}
                }
            }
            // <urlset/> is a valid, empty document; an empty <loc/> is a
            // missing loc
            Event::Empty(e) => {
                if root.is_none() {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    root = Some(detect_root(&name)?);
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                let level = depth;
                depth = depth.saturating_sub(1);

                if level == 3 {
                    if let (Some(current), Some(entry)) = (field.take(), entry.as_mut()) {
                        let value = text.trim();
                        let value = (!value.is_empty()).then(|| value.to_string());
                        match current {
                            Field::Loc if name == "loc" => entry.loc = value,
                            Field::LastMod if name == "lastmod" => entry.lastmod = value,
                            _ => {}
                        }
                    }
                    continue;
                }

                let Some(r) = root else { continue };
                if level != 2 || name != r.entry_tag() {
                    continue;
                }
                let Some(finished) = entry.take() else { continue };
                let Some(loc) = finished.loc else { continue };
                match r {
                    Root::Index => children.push(loc),
                    Root::UrlSet => pages.push(UrlRecord::new(loc, finished.lastmod)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match root {
        Some(Root::Index) => Ok(SitemapDocument::Index(children)),
        Some(Root::UrlSet) => Ok(SitemapDocument::UrlSet(pages)),
        None => Err(SitemapError::MissingRoot),
    }
}

fn detect_root(name: &str) -> Result<Root, SitemapError> {
    match name {
        "sitemapindex" => Ok(Root::Index),
        "urlset" => Ok(Root::UrlSet),
        other => Err(SitemapError::UnrecognizedRoot(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_default_namespace() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" xmlns:image="http://img">"#;
        assert_eq!(strip_default_namespace(xml), r#"<urlset xmlns:image="http://img">"#);
    }

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url>
                <loc>https://example.com/page1</loc>
                <lastmod>2024-01-01</lastmod>
                <priority>0.8</priority>
            </url>
            <url>
                <loc> https://example.com/page2?a=1&amp;b=2 </loc>
            </url>
        </urlset>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(
            doc,
            SitemapDocument::UrlSet(vec![
                UrlRecord::new("https://example.com/page1", Some("2024-01-01".to_string())),
                UrlRecord::new("https://example.com/page2?a=1&b=2", None),
            ])
        );
    }

    #[test]
    fn test_parse_index_skips_missing_loc() {
        let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <sitemap><loc>https://example.com/posts.xml</loc></sitemap>
            <sitemap><lastmod>2024-01-01</lastmod></sitemap>
            <sitemap><loc></loc></sitemap>
            <sitemap><loc/></sitemap>
            <sitemap><loc><![CDATA[https://example.com/pages.xml]]></loc></sitemap>
        </sitemapindex>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(
            doc,
            SitemapDocument::Index(vec![
                "https://example.com/posts.xml".to_string(),
                "https://example.com/pages.xml".to_string(),
            ])
        );
    }

    #[test]
    fn test_prefixed_elements() {
        let xml = r#"<sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
            <sm:url><sm:loc>https://example.com/a</sm:loc></sm:url>
        </sm:urlset>"#;

        match parse_sitemap(xml).unwrap() {
            SitemapDocument::UrlSet(pages) => assert_eq!(pages[0].url, "https://example.com/a"),
            other => panic!("expected urlset, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_image_loc_is_ignored() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
            <url>
                <loc>https://example.com/gallery</loc>
                <image:image><image:loc>https://cdn.example.com/a.jpg</image:loc></image:image>
            </url>
        </urlset>"#;

        assert_eq!(
            parse_sitemap(xml).unwrap(),
            SitemapDocument::UrlSet(vec![UrlRecord::new("https://example.com/gallery", None)])
        );
    }

    #[test]
    fn test_empty_urlset() {
        assert_eq!(parse_sitemap("<urlset/>").unwrap(), SitemapDocument::UrlSet(vec![]));
    }

    #[test]
    fn test_not_a_sitemap() {
        assert!(matches!(
            parse_sitemap("<html><body>hi</body></html>"),
            Err(SitemapError::UnrecognizedRoot(name)) if name == "html"
        ));
        assert!(matches!(parse_sitemap("just some text"), Err(SitemapError::MissingRoot)));
    }
}
