// src/scan/coordinator.rs
// =============================================================================
// Runs the health checker over every discovered URL.
//
// One future per URL goes into a FuturesUnordered. All of them are started
// right away, but each one has to get through the admission gate before it
// sends a request, so at most `gate.limit()` requests are ever in flight.
// Results come back in completion order (not input order), and the
// progress callback fires once per finished URL.
//
// When everything is done each check is classified (by its final URL) and
// becomes a HealthResult.
// =============================================================================

use crate::checker::{check_url, AdmissionGate, UrlCheck};
use crate::classify::classify;
use crate::model::{FetchOutcome, HealthResult, UrlRecord};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use std::time::Duration;

/// Checks every record, calling `on_progress(completed, total)` after each.
///
/// Returns one HealthResult per input record, in completion order.
pub async fn check_all<F>(
    client: &Client,
    records: Vec<UrlRecord>,
    gate: &AdmissionGate,
    timeout: Duration,
    mut on_progress: F,
) -> Vec<HealthResult>
where
    F: FnMut(usize, usize),
{
    let total = records.len();

    let mut pending: FuturesUnordered<_> = records
        .into_iter()
        .map(|record| check_url(client, record, gate, timeout))
        .collect();

    let mut checks = Vec::with_capacity(total);
    while let Some(check) = pending.next().await {
        checks.push(check);
        on_progress(checks.len(), total);
    }

    checks.into_iter().map(annotate).collect()
}

fn annotate(check: UrlCheck) -> HealthResult {
    let category = match &check.outcome {
        FetchOutcome::Fetched { final_url, .. } => classify(final_url),
        FetchOutcome::Failed { .. } => classify(&check.record.url),
    };

    HealthResult {
        url: check.record.url,
        last_modified: check.record.last_modified,
        outcome: check.outcome,
        category,
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. FuturesUnordered vs buffer_unordered
//    - buffer_unordered(N) limits how many futures are polled at once
//    - Here every future is polled, and the gate does the limiting instead
//
// 2. Why FnMut for the progress callback?
//    - The callback is called many times and may update its own state
//    - Fn would forbid that, FnOnce would only allow one call
// -----------------------------------------------------------------------------
