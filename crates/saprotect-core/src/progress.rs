use crate::state::{Resolution, Status};
use std::path::Path;

/// Trait for reporting scan and remediation progress.
///
/// The CLI implements it with an indicatif spinner. All methods have default
/// no-op implementations.
pub trait ProgressReporter {
    fn on_scan_start(&self, _target: &Path) {}
    fn on_file_hashed(&self, _path: &Path, _status: Status, _files_scanned: usize) {}
    fn on_file_skipped(&self, _path: &Path) {}
    fn on_file_failed(&self, _path: &Path, _error: &str) {}
    fn on_scan_complete(&self, _files_scanned: usize, _duration_secs: f64) {}
    fn on_remediated(&self, _path: &Path, _resolution: Resolution) {}
    fn on_remediation_skipped(&self, _path: &Path, _current: Option<Status>) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
