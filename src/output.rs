// src/output.rs
// =============================================================================
// Everything the binary prints: the live progress bar, tables, summaries.
//
// Log lines and the progress bar both go to stderr. To keep them from
// tearing each other apart, log output is routed through the same
// MultiProgress that draws the bar, which prints the line above the bar.
// When stderr isn't a terminal indicatif draws nothing at all, so logs are
// written straight through instead.
//
// Tables and JSON go to stdout.
// =============================================================================

use crate::diff::{DiffResult, FieldChanges};
use crate::model::{HealthResult, HttpStatus, UrlRecord};
use crate::scan::{ScanSummary, TaskStatus};
use crate::store::SnapshotMeta;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

/// A 0-100 bar for a running scan.
pub fn scan_bar() -> ProgressBar {
    let bar = multi_progress().add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}% {msg}") {
        bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub fn update_bar(bar: &ProgressBar, status: &TaskStatus) {
    bar.set_position(u64::from(status.progress));
    bar.set_message(status.message.clone());
}

/// tracing writer that prints above the progress bar.
#[derive(Default, Clone)]
pub struct LogWriterFactory;

pub struct LogWriter {
    buffer: String,
    passthrough: bool,
}

impl LogWriter {
    fn emit(&self, line: &str) {
        if self.passthrough {
            let _ = writeln!(io::stderr(), "{}", line);
        } else {
            let _ = multi_progress().println(line);
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));
        while let Some(idx) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=idx).collect();
            self.emit(line.trim_end_matches(['\n', '\r']));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.emit(line.trim_end_matches(['\n', '\r']));
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            buffer: String::new(),
            passthrough: !io::stderr().is_terminal(),
        }
    }
}

// ---------------------------------------------------------------------------
// stdout
// ---------------------------------------------------------------------------

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn status_label(status: HttpStatus) -> String {
    match status {
        HttpStatus::Code(200) => "✅ 200".to_string(),
        HttpStatus::Code(code) => format!("❌ {}", code),
        HttpStatus::Error => "⚠️  Error".to_string(),
    }
}

pub fn print_results_table(results: &[HealthResult]) {
    println!("{:<60} {:<10} {:<16} {:<20}", "URL", "STATUS", "CATEGORY", "LAST MODIFIED");
    println!("{}", "=".repeat(109));

    for result in results {
        println!(
            "{:<60} {:<10} {:<16} {:<20}",
            truncate(&result.url, 60),
            status_label(result.http_status()),
            result.category,
            truncate(&result.last_modified, 20)
        );
        if let Some(error) = result.error() {
            println!("    ↳ {}", truncate(error, 100));
        } else if result.final_url() != result.url {
            println!("    ↳ redirected to {}", truncate(result.final_url(), 100));
        }
    }
    println!();
}

pub fn print_summary(summary: &ScanSummary) {
    println!("📊 Summary:");
    println!("   ✅ OK: {}", summary.ok);
    println!("   ❌ Other status: {}", summary.other_status);
    println!("   ⚠️  Errors: {}", summary.errors);
    println!("   📋 Total: {}", summary.total);

    if !summary.by_category.is_empty() {
        println!("\n🗂  By category:");
        for (category, count) in &summary.by_category {
            println!("   {:<16} {}", category, count);
        }
    }
    if !summary.by_status.is_empty() {
        println!("\n🔢 By status:");
        for (status, count) in &summary.by_status {
            println!("   {:<16} {}", status, count);
        }
    }
}

pub fn print_scan_list(site_id: &str, scans: &[(SnapshotMeta, Option<usize>)]) {
    println!("Scans for {} (newest first):", site_id);
    println!("{:<38} {:<26} {:>6}", "SCAN ID", "CREATED", "URLS");
    println!("{}", "=".repeat(72));
    for (meta, rows) in scans {
        let rows = rows.map_or_else(|| "?".to_string(), |n| n.to_string());
        println!(
            "{:<38} {:<26} {:>6}",
            meta.scan_id,
            meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            rows
        );
    }
}

pub fn print_diff(diff: &DiffResult) {
    if diff.is_empty() {
        println!("✅ No differences");
        return;
    }

    println!("➕ Added ({}):", diff.added.len());
    for row in &diff.added {
        println!("   {}", row.url);
    }
    println!("➖ Removed ({}):", diff.removed.len());
    for row in &diff.removed {
        println!("   {}", row.url);
    }
    println!("✏️  Updated ({}):", diff.updated.len());
    for updated in &diff.updated {
        println!("   {}", updated.url);
        print_changes(&updated.changes);
    }
}

fn print_changes(changes: &FieldChanges) {
    if let Some((old, new)) = &changes.last_modified {
        println!("      last_modified: {} -> {}", old, new);
    }
    if let Some((old, new)) = &changes.http_status {
        println!("      http_status:   {} -> {}", old, new);
    }
    if changes.content_hash.is_some() {
        println!("      content:       changed");
    }
}

pub fn print_recent(records: &[UrlRecord], days: u32) {
    println!("📅 {} URL(s) modified in the last {} day(s):", records.len(), days);
    for record in records {
        println!("   {:<20} {}", truncate(&record.last_modified, 20), record.url);
    }
}
