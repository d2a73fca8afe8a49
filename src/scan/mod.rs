// src/scan/mod.rs
// =============================================================================
// A full scan of one site, start to finish.
//
//   base URL -> sitemap resolver -> URL records
//            -> check_all (bounded by the admission gate, progress per URL)
//            -> classified HealthResults
//            -> snapshot store
//
// Only three things stop a scan: an invalid base URL, discovering no URLs at
// all, and failing to save. Everything else ends up inside the snapshot.
//
// spawn_scan runs a scan on its own tokio task and hands back a ScanHandle
// the caller can watch and await while it keeps doing other work.
//
// Submodules:
// - coordinator: bounded concurrent fan-out of health checks
// - progress: the status projection (single writer, many readers)
// - summary: counts for the final report
// =============================================================================

mod coordinator;
mod progress;
mod summary;

pub use coordinator::check_all;
pub use progress::{ScanProgress, StatusReader, TaskRegistry, TaskStatus};
pub use summary::ScanSummary;

use crate::checker::{build_client, AdmissionGate};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::sitemap::SitemapResolver;
use crate::store::{new_scan_id, site_id, validate_key, SnapshotMeta, SnapshotStore};
use reqwest::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

/// Validates a base URL: absolute, http(s), with a host.
pub fn parse_base_url(input: &str) -> Result<Url, ScanError> {
    let invalid = |reason: &str| ScanError::InvalidBaseUrl {
        url: input.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(input.trim()).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

/// Everything a scan needs, built once and shared between scans.
pub struct Scanner {
    client: Client,
    resolver: SitemapResolver,
    store: SnapshotStore,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let client = build_client(&config).map_err(ScanError::Client)?;
        let resolver = SitemapResolver::new(client.clone(), &config);
        let store = SnapshotStore::new(config.data_dir.clone());
        Ok(Self {
            client,
            resolver,
            store,
            config,
        })
    }

    pub fn resolver(&self) -> &SitemapResolver {
        &self.resolver
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// A fresh admission gate sized for this scanner's config.
    pub fn gate(&self) -> AdmissionGate {
        AdmissionGate::new(self.config.max_concurrency)
    }

    /// Runs one scan and saves its snapshot as `scan_id`.
    ///
    /// Checks are admitted through `gate`; closing it makes every check that
    /// hasn't started yet record a failure instead of fetching. Progress goes
    /// to `progress` while running; the final complete/error state is left
    /// to the caller (see `spawn_scan`).
    pub async fn run(
        &self,
        base_url: &str,
        scan_id: &str,
        gate: &AdmissionGate,
        progress: &ScanProgress,
    ) -> Result<SnapshotMeta, ScanError> {
        let base = parse_base_url(base_url)?;
        let site = site_id(&base);
        validate_key(&site)?;
        validate_key(scan_id)?;

        progress.running(5, "Fetching sitemaps...");
        let records = self.resolver.resolve(&base).await;
        if records.is_empty() {
            return Err(ScanError::NoUrlsFound);
        }

        info!("Checking {} URL(s) for {} (max {} at once)", records.len(), base, gate.limit());
        let results = check_all(
            &self.client,
            records,
            gate,
            self.config.check_timeout(),
            |completed, total| progress.checked(completed, total),
        )
        .await;
        debug_assert_eq!(gate.outstanding(), 0);
        debug!("At most {} check(s) were in flight", gate.peak());

        let meta = self.store.save(&site, scan_id, &results).await?;
        Ok(meta)
    }
}

/// A scan running on its own task.
pub struct ScanHandle {
    pub scan_id: String,
    pub status: StatusReader,
    gate: Arc<AdmissionGate>,
    join: JoinHandle<Result<SnapshotMeta, ScanError>>,
}

impl ScanHandle {
    /// Stops admitting new checks. URLs not yet checked are recorded as
    /// failures and the snapshot is still saved.
    pub fn stop(&self) {
        self.gate.close();
    }

    /// Waits for the scan to finish.
    pub async fn wait(self) -> Result<SnapshotMeta, ScanError> {
        self.join
            .await
            .map_err(|e| ScanError::Worker(e.to_string()))?
    }
}

/// Starts a scan in the background and registers it for status polling.
pub fn spawn_scan(scanner: Arc<Scanner>, base_url: String, registry: &TaskRegistry) -> ScanHandle {
    let scan_id = new_scan_id();
    let (progress, status) = ScanProgress::new();
    registry.register(scan_id.clone(), status.clone());

    let gate = Arc::new(scanner.gate());
    let task_gate = Arc::clone(&gate);
    let task_scan_id = scan_id.clone();
    let join = tokio::spawn(async move {
        let result = scanner.run(&base_url, &task_scan_id, &task_gate, &progress).await;
        match &result {
            Ok(meta) => progress.complete(&meta.path),
            Err(e) => {
                error!("Error during scan for {}: {}", base_url, e);
                progress.fail(e.to_string());
            }
        }
        result
    });

    ScanHandle {
        scan_id,
        status,
        gate,
        join,
    }
}
