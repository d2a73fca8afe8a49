// src/sitemap/records.rs
// =============================================================================
// The deduplicated set of discovered pages.
//
// The same URL can show up in several sitemaps, sometimes with different
// <lastmod> values. Branches finish in whatever order the network allows, so
// "last one seen wins" would give a different answer on every run. Instead
// the record with the latest last_modified wins:
//
//   - a parseable date beats "N/A" or an unparseable value
//   - between two dates, the later one
//   - otherwise the lexicographically greater string
//
// That makes the resolved set independent of discovery order.
// =============================================================================

use crate::model::{parse_last_modified, UrlRecord};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct UrlRecordSet {
    records: BTreeMap<String, String>,
}

impl UrlRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: UrlRecord) {
        match self.records.get_mut(&record.url) {
            Some(existing) => {
                if compare_last_modified(&record.last_modified, existing) == Ordering::Greater {
                    *existing = record.last_modified;
                }
            }
            None => {
                self.records.insert(record.url, record.last_modified);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records sorted by URL.
    pub fn into_vec(self) -> Vec<UrlRecord> {
        self.records
            .into_iter()
            .map(|(url, last_modified)| UrlRecord { url, last_modified })
            .collect()
    }
}

impl Extend<UrlRecord> for UrlRecordSet {
    fn extend<T: IntoIterator<Item = UrlRecord>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl FromIterator<UrlRecord> for UrlRecordSet {
    fn from_iter<T: IntoIterator<Item = UrlRecord>>(iter: T) -> Self {
        let mut set = UrlRecordSet::new();
        set.extend(iter);
        set
    }
}

fn compare_last_modified(a: &str, b: &str) -> Ordering {
    match (parse_last_modified(a), parse_last_modified(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Records whose last_modified is at or after `since`. Records without a
/// parseable date are left out.
pub fn modified_since(records: &[UrlRecord], since: DateTime<Utc>) -> Vec<UrlRecord> {
    records
        .iter()
        .filter(|r| r.last_modified_at().is_some_and(|at| at >= since))
        .cloned()
        .collect()
}
