// src/error.rs
// =============================================================================
// Error types for the scan engine.
//
// Only a few things can fail a whole scan: a bad base URL, finding no URLs,
// failing to build the HTTP client, and storage. Everything that goes wrong
// for a single sitemap or a single page is absorbed into the scan data and
// never shows up here.
//
// The binary (main.rs) wraps these in anyhow::Error with extra context.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// Problems loading or validating the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Problems reading or writing snapshot files
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Snapshot not found: {site_id}/{scan_id}")]
    NotFound { site_id: String, scan_id: String },

    #[error("No snapshots stored for site {0}")]
    NoSnapshots(String),

    #[error("Snapshot file {path} is unreadable: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Invalid snapshot key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scan-fatal failures
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("No URLs found or sitemap not accessible.")]
    NoUrlsFound,

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Scan worker stopped unexpectedly: {0}")]
    Worker(String),
}

/// Why a single sitemap document contributed nothing.
///
/// These are logged and swallowed by the resolver.
#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("returned status {0}")]
    Status(u16),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document has no root element")]
    MissingRoot,

    #[error("unrecognized root element <{0}>")]
    UnrecognizedRoot(String),
}
