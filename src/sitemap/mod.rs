// src/sitemap/mod.rs
// =============================================================================
// Sitemap discovery.
//
// Submodules:
// - robots: finds sitemap locations (robots.txt or conventional paths)
// - parse: reads one sitemap / sitemap index document
// - records: the deduplicated page set and date filtering
// - resolver: walks the whole sitemap tree over HTTP
// =============================================================================

mod parse;
mod records;
mod resolver;
mod robots;

pub use records::modified_since;
pub use resolver::SitemapResolver;
