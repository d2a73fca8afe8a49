// src/checker/gate.rs
// =============================================================================
// The admission gate: a counting semaphore that bounds how many health checks
// are in flight at once.
//
// A check holds a GatePermit for as long as its request (and body download)
// runs. The permit is released when it is dropped, which covers every exit
// path: normal return, early return on error, and the future being dropped
// mid-request.
//
// The gate also counts outstanding permits and remembers the highest count
// it has seen, so callers (and tests) can check the bound actually held.
//
// Rust concepts:
// - RAII: cleanup in Drop instead of explicit release calls
// - Atomics: lock-free counters shared between tasks
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

#[derive(Debug)]
pub struct AdmissionGate {
    semaphore: Semaphore,
    limit: usize,
    outstanding: AtomicUsize,
    peak: AtomicUsize,
}

/// Proof of admission. Dropping it lets the next waiter in.
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a AdmissionGate,
    _permit: SemaphorePermit<'a>,
}

impl AdmissionGate {
    /// A gate admitting at most `limit` holders at once (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Semaphore::new(limit),
            limit,
            outstanding: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Waits for a free slot.
    ///
    /// Only fails if the gate has been closed.
    pub async fn acquire(&self) -> Result<GatePermit<'_>, AcquireError> {
        let permit = self.semaphore.acquire().await?;
        let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(GatePermit {
            gate: self,
            _permit: permit,
        })
    }

    /// Stops admitting; pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits currently held
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Highest number of permits ever held at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        // runs before the semaphore permit (a field) is released
        self.gate.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does GatePermit borrow the gate ('a)?
//    - A permit can't outlive the gate that issued it
//    - The compiler checks this, so there is no "release into a dead gate" bug
//
// 2. Why atomics instead of a Mutex<usize>?
//    - fetch_add / fetch_sub / fetch_max are single CPU instructions
//    - No lock to hold across an .await
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let gate = Arc::new(AdmissionGate::new(3));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await.unwrap();
                assert!(gate.outstanding() <= 3);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(gate.outstanding(), 0);
        assert!(gate.peak() <= 3);
        assert!(gate.peak() >= 1);
    }

    #[tokio::test]
    async fn test_permit_released_when_future_dropped() {
        let gate = AdmissionGate::new(1);

        let held = gate.acquire().await.unwrap();
        assert_eq!(gate.outstanding(), 1);

        // a second acquire can't get in; give up on it
        let waited = tokio::time::timeout(Duration::from_millis(20), gate.acquire()).await;
        assert!(waited.is_err());

        drop(held);
        assert_eq!(gate.outstanding(), 0);
        assert!(gate.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_gate_refuses() {
        let gate = AdmissionGate::new(2);
        gate.close();
        assert!(gate.acquire().await.is_err());
    }

    #[test]
    fn test_zero_limit_becomes_one() {
        assert_eq!(AdmissionGate::new(0).limit(), 1);
    }
}
