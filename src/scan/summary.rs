// src/scan/summary.rs
// =============================================================================
// Aggregate counts over a snapshot, for the end-of-scan report.
// =============================================================================

use crate::model::{Category, HealthResult, HttpStatus};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    /// 200 responses
    pub ok: usize,
    /// Any other status code
    pub other_status: usize,
    /// Transport failures
    pub errors: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_status: BTreeMap<String, usize>,
}

impl ScanSummary {
    pub fn from_results(results: &[HealthResult]) -> Self {
        let mut summary = ScanSummary {
            total: results.len(),
            ..ScanSummary::default()
        };

        for result in results {
            match result.http_status() {
                HttpStatus::Code(200) => summary.ok += 1,
                HttpStatus::Code(_) => summary.other_status += 1,
                HttpStatus::Error => summary.errors += 1,
            }
            *summary.by_category.entry(result.category).or_insert(0) += 1;
            *summary
                .by_status
                .entry(result.http_status().to_string())
                .or_insert(0) += 1;
        }

        summary
    }

    /// True when nothing could be fetched at all
    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.errors == self.total
    }
}
