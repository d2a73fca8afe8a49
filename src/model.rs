// src/model.rs
// =============================================================================
// Typed records that flow through a scan.
//
//   UrlRecord     - one page discovered in the sitemap tree
//   HealthResult  - a UrlRecord plus the outcome of fetching it
//   Snapshot      - every HealthResult of one scan, with its identity
//
// On disk a snapshot is a JSON array of flat rows:
//   {url, last_modified, http_status, content_hash, final_url, error, category}
// where http_status is either an integer or the string "Error". In memory the
// fetch outcome is an enum, so "a row has an error XOR a status code" can't be
// violated by construction. Serde goes through `HealthResultRow` to keep both
// shapes in sync.
//
// Rust concepts:
// - #[serde(into / try_from)]: serialize through a different "wire" type
// - Custom Serialize/Deserialize for a value that is "number or marker string"
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Placeholder for a sitemap entry without `<lastmod>`.
pub const NOT_AVAILABLE: &str = "N/A";

/// A page URL discovered in a sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
    pub last_modified: String,
}

impl UrlRecord {
    pub fn new(url: impl Into<String>, last_modified: Option<String>) -> Self {
        Self {
            url: url.into(),
            last_modified: last_modified
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }

    /// Parsed `last_modified`, if it is an RFC 3339 timestamp or a plain date.
    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        parse_last_modified(&self.last_modified)
    }
}

// Sitemaps use W3C datetime: either a full timestamp or just YYYY-MM-DD.
// Date-only values are taken as midnight UTC.
pub fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() || value == NOT_AVAILABLE {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// The `http_status` column: a real status code or the "Error" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpStatus {
    Code(u16),
    Error,
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpStatus::Code(code) => write!(f, "{}", code),
            HttpStatus::Error => f.write_str("Error"),
        }
    }
}

impl Serialize for HttpStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HttpStatus::Code(code) => serializer.serialize_u16(*code),
            HttpStatus::Error => serializer.serialize_str("Error"),
        }
    }
}

impl<'de> Deserialize<'de> for HttpStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u16),
            Marker(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Ok(HttpStatus::Code(code)),
            Raw::Marker(marker) if marker == "Error" => Ok(HttpStatus::Error),
            Raw::Marker(other) => Err(serde::de::Error::custom(format!(
                "invalid http_status '{}': expected a status code or \"Error\"",
                other
            ))),
        }
    }
}

/// Coarse content category of a page, derived from its URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Post/Article")]
    PostArticle,
    #[serde(rename = "Web Story")]
    WebStory,
    #[serde(rename = "Product")]
    Product,
    #[serde(rename = "Category Page")]
    CategoryPage,
    #[serde(rename = "Homepage")]
    Homepage,
    #[serde(rename = "Other Page")]
    OtherPage,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PostArticle => "Post/Article",
            Category::WebStory => "Web Story",
            Category::Product => "Product",
            Category::CategoryPage => "Category Page",
            Category::Homepage => "Homepage",
            Category::OtherPage => "Other Page",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What happened when a URL was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A response arrived (any status, including 404/500)
    Fetched {
        status: u16,
        /// URL after following redirects
        final_url: String,
        /// Only set when `status == 200`
        content_hash: Option<String>,
    },
    /// Transport failure: timeout, DNS, connection reset, body read error...
    Failed { error: String },
}

/// One row of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "HealthResultRow", try_from = "HealthResultRow")]
pub struct HealthResult {
    pub url: String,
    pub last_modified: String,
    pub outcome: FetchOutcome,
    pub category: Category,
}

impl HealthResult {
    pub fn http_status(&self) -> HttpStatus {
        match &self.outcome {
            FetchOutcome::Fetched { status, .. } => HttpStatus::Code(*status),
            FetchOutcome::Failed { .. } => HttpStatus::Error,
        }
    }

    pub fn content_hash(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::Fetched { content_hash, .. } => content_hash.as_deref(),
            FetchOutcome::Failed { .. } => None,
        }
    }

    /// Post-redirect URL; a failed fetch never left the original URL.
    pub fn final_url(&self) -> &str {
        match &self.outcome {
            FetchOutcome::Fetched { final_url, .. } => final_url,
            FetchOutcome::Failed { .. } => &self.url,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::Fetched { .. } => None,
            FetchOutcome::Failed { error } => Some(error),
        }
    }
}

// Flat on-disk shape of a HealthResult.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HealthResultRow {
    url: String,
    last_modified: String,
    http_status: HttpStatus,
    content_hash: Option<String>,
    final_url: String,
    error: Option<String>,
    category: Category,
}

impl From<HealthResult> for HealthResultRow {
    fn from(result: HealthResult) -> Self {
        let http_status = result.http_status();
        let (content_hash, final_url, error) = match result.outcome {
            FetchOutcome::Fetched {
                final_url,
                content_hash,
                ..
            } => (content_hash, final_url, None),
            FetchOutcome::Failed { error } => (None, result.url.clone(), Some(error)),
        };

        HealthResultRow {
            url: result.url,
            last_modified: result.last_modified,
            http_status,
            content_hash,
            final_url,
            error,
            category: result.category,
        }
    }
}

impl TryFrom<HealthResultRow> for HealthResult {
    type Error = String;

    fn try_from(row: HealthResultRow) -> Result<Self, Self::Error> {
        let outcome = match row.http_status {
            HttpStatus::Error => FetchOutcome::Failed {
                error: row.error.unwrap_or_else(|| "unknown error".to_string()),
            },
            HttpStatus::Code(status) => {
                if let Some(error) = row.error {
                    return Err(format!(
                        "row for {} has status {} and error '{}'",
                        row.url, status, error
                    ));
                }
                FetchOutcome::Fetched {
                    status,
                    final_url: row.final_url,
                    content_hash: if status == 200 { row.content_hash } else { None },
                }
            }
        };

        Ok(HealthResult {
            url: row.url,
            last_modified: row.last_modified,
            outcome,
            category: row.category,
        })
    }
}

/// One completed scan of a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub site_id: String,
    pub scan_id: String,
    pub created_at: DateTime<Utc>,
    pub results: Vec<HealthResult>,
}
