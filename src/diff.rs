// src/diff.rs
// =============================================================================
// Compares two snapshots of the same site.
//
//   added    - URLs only in the new snapshot
//   removed  - URLs only in the old snapshot
//   updated  - URLs in both whose last_modified or http_status differ, or
//              whose content hash changed to a new non-null value
//
// A page that goes from "fetched" to "failed" loses its hash. That is a
// status change, not a content change, so a null new hash never counts.
// Raw hashes mean nothing to a reader, so a content change is recorded as
// the marker pair ("Content Changed", "Content Changed").
//
// Output is sorted by URL so the same two snapshots always diff the same way.
// =============================================================================

use crate::model::{HealthResult, HttpStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CONTENT_CHANGED: &str = "Content Changed";

/// Field-level changes for one URL. Unchanged fields are left out of JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<(HttpStatus, HttpStatus)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<(String, String)>,
}

impl FieldChanges {
    pub fn is_empty(&self) -> bool {
        self.last_modified.is_none() && self.http_status.is_none() && self.content_hash.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedUrl {
    pub url: String,
    pub changes: FieldChanges,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub added: Vec<HealthResult>,
    pub removed: Vec<HealthResult>,
    pub updated: Vec<UpdatedUrl>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Diffs `old` against `new`. Rows are keyed by exact `url`.
pub fn diff(old: &[HealthResult], new: &[HealthResult]) -> DiffResult {
    let old_map: BTreeMap<&str, &HealthResult> = old.iter().map(|r| (r.url.as_str(), r)).collect();
    let new_map: BTreeMap<&str, &HealthResult> = new.iter().map(|r| (r.url.as_str(), r)).collect();

    let added = new_map
        .iter()
        .filter(|(url, _)| !old_map.contains_key(*url))
        .map(|(_, r)| (*r).clone())
        .collect();

    let removed = old_map
        .iter()
        .filter(|(url, _)| !new_map.contains_key(*url))
        .map(|(_, r)| (*r).clone())
        .collect();

    let updated = old_map
        .iter()
        .filter_map(|(url, before)| {
            let after = new_map.get(url)?;
            let changes = compare(before, after);
            (!changes.is_empty()).then(|| UpdatedUrl {
                url: url.to_string(),
                changes,
            })
        })
        .collect();

    DiffResult { added, removed, updated }
}

fn compare(before: &HealthResult, after: &HealthResult) -> FieldChanges {
    let mut changes = FieldChanges::default();

    if before.last_modified != after.last_modified {
        changes.last_modified = Some((before.last_modified.clone(), after.last_modified.clone()));
    }

    if before.http_status() != after.http_status() {
        changes.http_status = Some((before.http_status(), after.http_status()));
    }

    if let Some(new_hash) = after.content_hash() {
        if before.content_hash() != Some(new_hash) {
            changes.content_hash = Some((CONTENT_CHANGED.to_string(), CONTENT_CHANGED.to_string()));
        }
    }

    changes
}
