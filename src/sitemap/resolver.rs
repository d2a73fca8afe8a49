// src/sitemap/resolver.rs
// =============================================================================
// Turns a base URL into the flat set of pages its sitemaps list.
//
// How it works:
// 1. Read robots.txt and collect its Sitemap: directives
// 2. If there are none, try /sitemap.xml and /sitemap_index.xml
// 3. Walk the sitemap tree breadth-first:
//      - every level is fetched concurrently (bounded)
//      - sitemap indexes add their children to the next level
//      - url-sets add their pages to the result
// 4. Collapse duplicate pages (see records.rs)
//
// A sitemap URL is only ever queued once, so an index that lists itself (or
// a longer cycle) can't loop. Each level is fetched by one owner that checks
// the seen-set before dispatch, so no sitemap is fetched twice.
//
// Nothing in here fails the scan. A sitemap that can't be fetched or parsed
// is logged and contributes zero pages; its siblings carry on.
// =============================================================================

use super::parse::{parse_sitemap, SitemapDocument};
use super::records::UrlRecordSet;
use super::robots::{fallback_locations, sitemap_directives};
use crate::config::ScanConfig;
use crate::error::SitemapError;
use crate::model::UrlRecord;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub struct SitemapResolver {
    client: Client,
    robots_timeout: Duration,
    sitemap_timeout: Duration,
    max_sitemaps: usize,
    concurrency: usize,
}

impl SitemapResolver {
    pub fn new(client: Client, config: &ScanConfig) -> Self {
        Self {
            client,
            robots_timeout: config.robots_timeout(),
            sitemap_timeout: config.sitemap_timeout(),
            max_sitemaps: config.max_sitemaps,
            concurrency: config.sitemap_concurrency,
        }
    }

    /// Every page listed in the site's sitemaps, deduplicated and sorted by
    /// URL. Empty when no sitemap could be read.
    pub async fn resolve(&self, base: &Url) -> Vec<UrlRecord> {
        let candidates = self.sitemap_candidates(base).await;
        let records = self.expand(candidates).await;
        info!("Resolved {} unique URL(s) for {}", records.len(), base);
        records
    }

    /// Sitemap URLs to start from: robots.txt declarations, or the
    /// conventional locations when it declares none.
    pub async fn sitemap_candidates(&self, base: &Url) -> Vec<String> {
        let declared = match self.fetch_robots(base).await {
            Ok(body) => sitemap_directives(&body),
            Err(e) => {
                warn!("Could not read robots.txt for {}: {}", base, e);
                Vec::new()
            }
        };

        if declared.is_empty() {
            debug!("No Sitemap: directives for {}, trying conventional paths", base);
            fallback_locations(base)
        } else {
            debug!("robots.txt declares {} sitemap(s)", declared.len());
            declared
        }
    }

    /// Breadth-first expansion of the sitemap tree rooted at `roots`.
    pub async fn expand(&self, roots: Vec<String>) -> Vec<UrlRecord> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut frontier: Vec<String> = roots
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty() && seen.insert(url.clone()))
            .collect();

        let mut records = UrlRecordSet::new();
        let mut fetched = 0usize;
        let mut level = 0usize;

        while !frontier.is_empty() {
            let budget = self.max_sitemaps.saturating_sub(fetched);
            if budget == 0 {
                warn!(
                    "Reached max sitemap limit ({}), skipping {} sitemap(s)",
                    self.max_sitemaps,
                    frontier.len()
                );
                break;
            }
            if frontier.len() > budget {
                warn!(
                    "Reached max sitemap limit ({}), skipping {} sitemap(s)",
                    self.max_sitemaps,
                    frontier.len() - budget
                );
                frontier.truncate(budget);
            }
            fetched += frontier.len();
            level += 1;
            debug!("Fetching {} sitemap(s) at level {}", frontier.len(), level);

            let outcomes: Vec<(String, Result<SitemapDocument, SitemapError>)> = stream::iter(frontier)
                .map(|url| async move {
                    let outcome = self.fetch_document(&url).await;
                    (url, outcome)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            let mut next = Vec::new();
            for (url, outcome) in outcomes {
                match outcome {
                    Ok(SitemapDocument::Index(children)) => {
                        debug!("Sitemap index {} lists {} sitemap(s)", url, children.len());
                        for child in children {
                            let Some(child) = absolutize(&url, &child) else {
                                debug!("Skipping unresolvable sitemap loc '{}' in {}", child, url);
                                continue;
                            };
                            if seen.insert(child.clone()) {
                                next.push(child);
                            } else {
                                debug!("Sitemap {} already visited", child);
                            }
                        }
                    }
                    Ok(SitemapDocument::UrlSet(pages)) => {
                        debug!("Sitemap {} lists {} URL(s)", url, pages.len());
                        records.extend(pages);
                    }
                    Err(e) => {
                        warn!("Error fetching or parsing sitemap {}: {}", url, e);
                    }
                }
            }

            frontier = next;
        }

        info!("Read {} sitemap(s), {} unique URL(s)", fetched, records.len());
        records.into_vec()
    }

    async fn fetch_robots(&self, base: &Url) -> Result<String, SitemapError> {
        let Ok(robots_url) = base.join("/robots.txt") else {
            return Ok(String::new());
        };

        let response = self
            .client
            .get(robots_url)
            .timeout(self.robots_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!("robots.txt returned {}", response.status());
            return Ok(String::new());
        }

        Ok(response.text().await?)
    }

    async fn fetch_document(&self, url: &str) -> Result<SitemapDocument, SitemapError> {
        let response = self
            .client
            .get(url)
            .timeout(self.sitemap_timeout)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(SitemapError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        parse_sitemap(&body)
    }
}

// Child locs are normally absolute; relative ones resolve against the index.
fn absolutize(parent: &str, loc: &str) -> Option<String> {
    if let Ok(url) = Url::parse(loc) {
        return Some(url.to_string());
    }
    Url::parse(parent).ok()?.join(loc).ok().map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver() -> SitemapResolver {
        let config = ScanConfig {
            robots_timeout_secs: 2,
            sitemap_timeout_secs: 2,
            ..ScanConfig::default()
        };
        SitemapResolver::new(Client::new(), &config)
    }

    fn urlset(locs: &[String]) -> String {
        let entries: String = locs
            .iter()
            .map(|loc| format!("<url><loc>{}</loc><lastmod>2024-01-01</lastmod></url>", loc))
            .collect();
        format!(
            r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
            entries
        )
    }

    fn index(locs: &[String]) -> String {
        let entries: String = locs
            .iter()
            .map(|loc| format!("<sitemap><loc>{}</loc></sitemap>", loc))
            .collect();
        format!(
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
            entries
        )
    }

    async fn serve(server: &MockServer, at: &str, status: u16, body: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("https://a.com/sitemaps/index.xml", "posts.xml"),
            Some("https://a.com/sitemaps/posts.xml".to_string())
        );
        assert_eq!(
            absolutize("https://a.com/index.xml", "https://b.com/s.xml"),
            Some("https://b.com/s.xml".to_string())
        );
    }

    #[tokio::test]
    async fn test_robots_directive_and_nested_index() {
        let server = MockServer::start().await;
        let uri = server.uri();

        serve(&server, "/robots.txt", 200, format!("User-agent: *\nSitemap: {}/index.xml\n", uri)).await;
        serve(&server, "/index.xml", 200, index(&[format!("{}/posts.xml", uri), format!("{}/pages.xml", uri)])).await;
        serve(&server, "/posts.xml", 200, urlset(&[format!("{}/blog/a", uri), format!("{}/blog/b", uri)])).await;
        // /blog/a also listed here
        serve(&server, "/pages.xml", 200, urlset(&[format!("{}/about", uri), format!("{}/blog/a", uri)])).await;

        let base = Url::parse(&uri).unwrap();
        let records = resolver().resolve(&base).await;

        let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                format!("{}/about", uri),
                format!("{}/blog/a", uri),
                format!("{}/blog/b", uri),
            ]
        );
    }

    #[tokio::test]
    async fn test_self_referencing_index_terminates() {
        let server = MockServer::start().await;
        let uri = server.uri();

        serve(&server, "/robots.txt", 404, String::new()).await;
        serve(
            &server,
            "/sitemap.xml",
            200,
            index(&[format!("{}/sitemap.xml", uri), format!("{}/child.xml", uri)]),
        )
        .await;
        // child points back up at the root index
        serve(
            &server,
            "/child.xml",
            200,
            index(&[format!("{}/sitemap.xml", uri), format!("{}/pages.xml", uri)]),
        )
        .await;
        serve(&server, "/pages.xml", 200, urlset(&[format!("{}/x", uri)])).await;
        serve(&server, "/sitemap_index.xml", 404, String::new()).await;

        let base = Url::parse(&uri).unwrap();
        let records = resolver().resolve(&base).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, format!("{}/x", uri));

        let requests = server.received_requests().await.unwrap_or_default();
        let root_fetches = requests.iter().filter(|r| r.url.path() == "/sitemap.xml").count();
        assert_eq!(root_fetches, 1);
    }

    #[tokio::test]
    async fn test_broken_branch_does_not_stop_siblings() {
        let server = MockServer::start().await;
        let uri = server.uri();

        serve(&server, "/robots.txt", 200, format!("Sitemap: {}/index.xml", uri)).await;
        serve(
            &server,
            "/index.xml",
            200,
            index(&[
                format!("{}/broken.xml", uri),
                format!("{}/missing.xml", uri),
                format!("{}/good.xml", uri),
            ]),
        )
        .await;
        serve(&server, "/broken.xml", 200, "<urlset><url><loc>oops".to_string()).await;
        serve(&server, "/missing.xml", 500, String::new()).await;
        serve(&server, "/good.xml", 200, urlset(&[format!("{}/ok", uri)])).await;

        let base = Url::parse(&uri).unwrap();
        let records = resolver().resolve(&base).await;

        assert!(records.iter().any(|r| r.url == format!("{}/ok", uri)));
    }

    #[tokio::test]
    async fn test_no_sitemap_anywhere() {
        let server = MockServer::start().await;
        serve(&server, "/robots.txt", 404, String::new()).await;
        serve(&server, "/sitemap.xml", 404, String::new()).await;
        serve(&server, "/sitemap_index.xml", 404, String::new()).await;

        let base = Url::parse(&server.uri()).unwrap();
        assert!(resolver().resolve(&base).await.is_empty());
    }

    #[tokio::test]
    async fn test_max_sitemaps_caps_fetches() {
        let server = MockServer::start().await;
        let uri = server.uri();

        let children: Vec<String> = (0..10).map(|i| format!("{}/s{}.xml", uri, i)).collect();
        serve(&server, "/index.xml", 200, index(&children)).await;
        for i in 0..10 {
            serve(&server, &format!("/s{}.xml", i), 200, urlset(&[format!("{}/p{}", uri, i)])).await;
        }

        let config = ScanConfig {
            max_sitemaps: 4,
            ..ScanConfig::default()
        };
        let capped = SitemapResolver::new(Client::new(), &config);
        let records = capped.expand(vec![format!("{}/index.xml", uri)]).await;

        // the index itself plus three children
        assert_eq!(records.len(), 3);
    }
}
