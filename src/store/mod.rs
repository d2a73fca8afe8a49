// src/store/mod.rs
// =============================================================================
// Snapshot files on disk.
//
// Layout (kept compatible with existing scan directories):
//
//   <data_dir>/
//     example-com/                 <- site id, derived from the base URL
//       <scan id>.json             <- JSON array of HealthResult rows
//       <scan id>.json
//
// Snapshots are write-once. A new file is written under a hidden temporary
// name and renamed into place, so a reader either sees the whole snapshot or
// no file at all. An existing snapshot is never overwritten.
//
// Scan ids are UUID v7, which embed their creation time, so "newest first"
// is just a sort on the id's timestamp.
// =============================================================================

use crate::error::StoreError;
use crate::model::{HealthResult, Snapshot};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const SNAPSHOT_EXTENSION: &str = "json";

/// Site id for a parsed base URL: host (plus port), then the path with
/// '/' -> '_' and '.' -> '-'. Scheme, query and fragment are dropped, and
/// any byte the key check would reject is percent-encoded.
///
/// "https://www.example.com/shop" -> "www-example-com_shop"
pub fn site_id(base: &Url) -> String {
    let mut raw = base.host_str().unwrap_or_default().to_string();
    if let Some(port) = base.port() {
        raw.push(':');
        raw.push_str(&port.to_string());
    }
    if base.path() != "/" {
        raw.push_str(base.path());
    }

    let mut id = String::with_capacity(raw.len());
    for c in raw.replace('/', "_").replace('.', "-").chars() {
        if is_key_char(c) {
            id.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                id.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    id
}

/// A fresh, time-ordered scan id.
pub fn new_scan_id() -> String {
    Uuid::now_v7().to_string()
}

/// Where a stored snapshot lives and when it was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub site_id: String,
    pub scan_id: String,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a new snapshot. Fails if `(site_id, scan_id)` already exists.
    pub async fn save(
        &self,
        site_id: &str,
        scan_id: &str,
        results: &[HealthResult],
    ) -> Result<SnapshotMeta, StoreError> {
        let site_dir = self.site_dir(site_id)?;
        let target = snapshot_path(&site_dir, scan_id)?;
        fs::create_dir_all(&site_dir).await?;

        if fs::try_exists(&target).await? {
            return Err(StoreError::AlreadyExists(target));
        }

        let body = serde_json::to_vec_pretty(results)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

        let temp = site_dir.join(format!(".{}.{}.tmp", scan_id, SNAPSHOT_EXTENSION));
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)
            .await?;

        let written = async {
            file.write_all(&body).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        info!("Saved {} result(s) to {}", results.len(), target.display());
        let created_at = created_at(scan_id, &target).await;
        Ok(SnapshotMeta {
            site_id: site_id.to_string(),
            scan_id: scan_id.to_string(),
            created_at,
            path: target,
        })
    }

    /// Snapshots of a site, newest first. A site with no directory has none.
    pub async fn list(&self, site_id: &str) -> Result<Vec<SnapshotMeta>, StoreError> {
        let site_dir = self.site_dir(site_id)?;
        let mut entries = match fs::read_dir(&site_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut snapshots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(scan_id) = snapshot_stem(&path) else {
                continue;
            };
            let created_at = created_at(&scan_id, &path).await;
            snapshots.push(SnapshotMeta {
                site_id: site_id.to_string(),
                scan_id,
                created_at,
                path,
            });
        }

        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.scan_id.cmp(&a.scan_id))
        });
        debug!("{} snapshot(s) for {}", snapshots.len(), site_id);
        Ok(snapshots)
    }

    pub async fn load(&self, site_id: &str, scan_id: &str) -> Result<Snapshot, StoreError> {
        let path = snapshot_path(&self.site_dir(site_id)?, scan_id)?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    site_id: site_id.to_string(),
                    scan_id: scan_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let results: Vec<HealthResult> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;

        Ok(Snapshot {
            site_id: site_id.to_string(),
            scan_id: scan_id.to_string(),
            created_at: created_at(scan_id, &path).await,
            results,
        })
    }

    /// The most recent snapshot of a site.
    pub async fn latest(&self, site_id: &str) -> Result<Snapshot, StoreError> {
        let newest = self
            .list(site_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NoSnapshots(site_id.to_string()))?;
        self.load(site_id, &newest.scan_id).await
    }

    /// Site ids that have at least one snapshot, sorted.
    pub async fn list_sites(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sites = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_key(&name).is_err() {
                continue;
            }
            if !self.list(&name).await?.is_empty() {
                sites.push(name);
            }
        }

        sites.sort();
        Ok(sites)
    }

    fn site_dir(&self, site_id: &str) -> Result<PathBuf, StoreError> {
        validate_key(site_id)?;
        Ok(self.root.join(site_id))
    }
}

fn snapshot_path(site_dir: &Path, scan_id: &str) -> Result<PathBuf, StoreError> {
    validate_key(scan_id)?;
    Ok(site_dir.join(format!("{}.{}", scan_id, SNAPSHOT_EXTENSION)))
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '~' | '@' | '%' | '+')
}

/// Keys become path components; nothing that could climb out of data_dir.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty() && !key.starts_with('.') && key.chars().all(is_key_char) && !key.contains("..");

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

// Scan id of a visible `<id>.json` file.
fn snapshot_stem(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != SNAPSHOT_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('.') {
        return None;
    }
    Some(stem.to_string())
}

// Creation time from the v7 id, or the file's mtime for other names.
async fn created_at(scan_id: &str, path: &Path) -> DateTime<Utc> {
    let from_id = Uuid::parse_str(scan_id)
        .ok()
        .and_then(|id| id.get_timestamp())
        .and_then(|ts| {
            let (secs, nanos) = ts.to_unix();
            DateTime::from_timestamp(secs as i64, nanos)
        });
    if let Some(at) = from_id {
        return at;
    }

    match fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => DateTime::<Utc>::from(modified),
        Err(_) => DateTime::<Utc>::from(std::time::UNIX_EPOCH),
    }
}
