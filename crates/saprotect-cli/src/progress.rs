use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use saprotect_core::{ProgressReporter, Resolution, Status};
use std::path::Path;
use std::time::Duration;

/// CLI progress reporter: a spinner while hashing, plain lines for anything
/// the operator has to see.
pub struct CliReporter {
    bar: ProgressBar,
}

impl CliReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        Self { bar }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, target: &Path) {
        self.bar.set_message(format!("Scanning {}...", target.display()));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_file_hashed(&self, path: &Path, status: Status, files_scanned: usize) {
        self.bar
            .set_message(format!("{} files: {}", files_scanned, path.display()));
        if status == Status::Mismatch {
            self.bar.suspend(|| {
                eprintln!("  {} {}", "✗ mismatch".red(), path.display());
            });
        }
    }

    fn on_file_failed(&self, path: &Path, error: &str) {
        self.bar.suspend(|| {
            eprintln!("  {} {}: {}", "! unreadable".yellow(), path.display(), error);
        });
    }

    fn on_scan_complete(&self, files_scanned: usize, duration_secs: f64) {
        self.bar.finish_and_clear();
        eprintln!(
            "  {} Scan complete: {} files in {:.2}s",
            "✓".green(),
            files_scanned,
            duration_secs
        );
    }

    fn on_remediated(&self, path: &Path, resolution: Resolution) {
        let direction = match resolution {
            Resolution::KeepOld => "old",
            Resolution::KeepNew => "new",
        };
        println!("{} remediated in favor of the {} hash", path.display(), direction);
    }

    fn on_remediation_skipped(&self, path: &Path, _current: Option<Status>) {
        println!("{} has no mismatch; skipping", path.display());
    }
}
