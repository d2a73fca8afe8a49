// src/scan/progress.rs
// =============================================================================
// Live status of a running scan.
//
// Each scan owns exactly one ScanProgress, the only thing allowed to change
// its status. Anyone who wants to watch gets a StatusReader, a cheap clone
// of the receiving end of a tokio watch channel. Readers always see the
// latest complete status record, never a half-written one.
//
// A TaskRegistry maps scan ids to readers so a status endpoint can be
// polled by id.
//
// Lifecycle of a status record:
//
//   queued 0  "Waiting to start..."
//   running 5 "Fetching sitemaps..."
//   running p "Checking i/N"          (once per finished URL)
//   complete 100 "Scan complete! Results saved."   or   error "<why>"
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Running,
    Complete,
    Error,
    /// Returned by the registry for ids it has never seen
    NotFound,
}

/// The status projection a caller polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: TaskState,
    /// 0-100
    pub progress: u8,
    pub message: String,
    /// Snapshot file, once the scan is complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl TaskStatus {
    pub fn queued() -> Self {
        Self {
            status: TaskState::Queued,
            progress: 0,
            message: "Waiting to start...".to_string(),
            file: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: TaskState::NotFound,
            progress: 0,
            message: String::new(),
            file: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, TaskState::Complete | TaskState::Error)
    }
}

/// floor(completed / total * 100), computed in integers.
///
/// completed == total is always exactly 100.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let completed = completed.min(total) as u128;
    (completed * 100 / total as u128) as u8
}

/// Write side of a scan's status. Owned by the scan itself.
#[derive(Debug)]
pub struct ScanProgress {
    tx: watch::Sender<TaskStatus>,
}

/// Read side of a scan's status.
#[derive(Debug, Clone)]
pub struct StatusReader {
    rx: watch::Receiver<TaskStatus>,
}

impl ScanProgress {
    /// A new progress cell in the `queued` state, plus a reader for it.
    pub fn new() -> (Self, StatusReader) {
        let (tx, rx) = watch::channel(TaskStatus::queued());
        (Self { tx }, StatusReader { rx })
    }

    pub fn running(&self, progress: u8, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|status| {
            status.status = TaskState::Running;
            status.progress = progress.min(100);
            status.message = message;
        });
    }

    /// Records that `completed` of `total` URLs have been checked.
    pub fn checked(&self, completed: usize, total: usize) {
        self.running(percent(completed, total), format!("Checking {}/{}", completed, total));
    }

    pub fn complete(&self, file: &Path) {
        self.tx.send_modify(|status| {
            status.status = TaskState::Complete;
            status.progress = 100;
            status.message = "Scan complete! Results saved.".to_string();
            status.file = Some(file.to_path_buf());
        });
    }

    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|status| {
            status.status = TaskState::Error;
            status.message = message;
        });
    }
}

impl StatusReader {
    pub fn current(&self) -> TaskStatus {
        self.rx.borrow().clone()
    }

    /// Waits for the next update. Returns false once the scan has dropped
    /// its ScanProgress (no more updates will come).
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Status lookup by scan id, for polling from outside the scan.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, StatusReader>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, scan_id: impl Into<String>, reader: StatusReader) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.insert(scan_id.into(), reader);
        }
    }

    /// Current status of a scan; `not_found` for unknown ids.
    pub fn status(&self, scan_id: &str) -> TaskStatus {
        self.tasks
            .lock()
            .ok()
            .and_then(|tasks| tasks.get(scan_id).map(StatusReader::current))
            .unwrap_or_else(TaskStatus::not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_floors_and_ends_at_100() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(999, 1000), 99);
        assert_eq!(percent(7, 7), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_lifecycle() {
        let (progress, reader) = ScanProgress::new();
        assert_eq!(reader.current(), TaskStatus::queued());

        progress.running(5, "Fetching sitemaps...");
        assert_eq!(reader.current().status, TaskState::Running);
        assert_eq!(reader.current().progress, 5);

        progress.checked(1, 4);
        assert_eq!(reader.current().progress, 25);
        assert_eq!(reader.current().message, "Checking 1/4");

        progress.complete(Path::new("scans/site/id.json"));
        let done = reader.current();
        assert_eq!(done.status, TaskState::Complete);
        assert_eq!(done.progress, 100);
        assert!(done.is_finished());
        assert_eq!(done.file, Some(PathBuf::from("scans/site/id.json")));
    }

    #[test]
    fn test_failure_keeps_progress() {
        let (progress, reader) = ScanProgress::new();
        progress.running(5, "Fetching sitemaps...");
        progress.fail("No URLs found or sitemap not accessible.");

        let status = reader.current();
        assert_eq!(status.status, TaskState::Error);
        assert_eq!(status.progress, 5);
        assert!(status.is_finished());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = TaskRegistry::new();
        let (progress, reader) = ScanProgress::new();
        registry.register("abc", reader);

        progress.running(40, "Checking 2/5");
        assert_eq!(registry.status("abc").progress, 40);
        assert_eq!(registry.status("nope").status, TaskState::NotFound);
    }

    #[test]
    fn test_status_json_shape() {
        let json = serde_json::to_value(TaskStatus::queued()).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["progress"], 0);
        assert!(json.get("file").is_none());
    }

    #[tokio::test]
    async fn test_reader_sees_end_of_updates() {
        let (progress, mut reader) = ScanProgress::new();
        progress.running(5, "Fetching sitemaps...");
        assert!(reader.changed().await);
        drop(progress);
        assert!(!reader.changed().await);
    }
}
