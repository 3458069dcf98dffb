use crate::config::AppConfig;
use crate::error::Error;
use crate::hasher;
use crate::progress::ProgressReporter;
use crate::report;
use crate::scanner::{self, WalkItem};
use crate::state::Status;
use crate::storage::models::ScanSession;
use crate::storage::Database;
use chrono::Utc;
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct ScanEngine {
    chunk_size: usize,
    ignore_patterns: Vec<Pattern>,
}

/// A file that could not be fingerprinted. The scan carries on without it.
#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct TargetScan {
    /// Regular files visited, including add-only skips and read failures.
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub failures: Vec<ScanFailure>,
}

#[derive(Debug)]
pub struct ScanResult {
    pub scan_duration: Duration,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub failures: Vec<ScanFailure>,
    pub session: ScanSession,
}

impl ScanEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            ignore_patterns: scanner::compile_ignore_patterns(&config.ignore_patterns),
        }
    }

    /// Refuse to touch the store while any record waits for remediation.
    pub fn ensure_no_pending_mismatches(db: &Database) -> Result<(), Error> {
        let pending = db.count_by_status(Status::Mismatch)?;
        if pending > 0 {
            warn!("{} pending mismatch(es); refusing to scan", pending);
            return Err(Error::PendingMismatch(pending));
        }
        Ok(())
    }

    /// Run a full protect invocation over `targets` and record the session.
    ///
    /// The pending-mismatch gate is checked once, before the first target.
    /// Targets that do not exist are skipped with a warning.
    pub fn scan(
        &self,
        db: &Database,
        targets: &[PathBuf],
        add_only: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error> {
        Self::ensure_no_pending_mismatches(db)?;

        debug!(
            "Fingerprinting with {} in {}-byte chunks",
            hasher::HASH_NAME,
            self.chunk_size
        );
        let start = Utc::now();
        let scan_start = Instant::now();
        let mut totals = TargetScan::default();

        for target in targets {
            let target = scanner::absolute_target(target)?;
            if !target.exists() {
                warn!("{} does not exist; skipping", target.display());
                continue;
            }
            let scanned = self.visit_target(db, &target, add_only, reporter)?;
            totals.files_scanned += scanned.files_scanned;
            totals.files_skipped += scanned.files_skipped;
            totals.failures.extend(scanned.failures);
        }

        let end = Utc::now();
        let scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(totals.files_scanned, scan_duration.as_secs_f64());
        info!(
            "Scan completed in {:.2}s: {} files scanned, {} skipped, {} unreadable",
            scan_duration.as_secs_f64(),
            totals.files_scanned,
            totals.files_skipped,
            totals.failures.len(),
        );

        let session = report::record_session(db, start, end, totals.files_scanned)?;

        Ok(ScanResult {
            scan_duration,
            files_scanned: totals.files_scanned,
            files_skipped: totals.files_skipped,
            failures: totals.failures,
            session,
        })
    }

    /// Scan a single file or directory tree without recording a session.
    pub fn scan_path(
        &self,
        db: &Database,
        target: &Path,
        add_only: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<TargetScan, Error> {
        Self::ensure_no_pending_mismatches(db)?;
        let target = scanner::absolute_target(target)?;
        self.visit_target(db, &target, add_only, reporter)
    }

    fn visit_target(
        &self,
        db: &Database,
        target: &Path,
        add_only: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<TargetScan, Error> {
        reporter.on_scan_start(target);
        let mut scan = TargetScan::default();

        for item in scanner::walk_files(target, &self.ignore_patterns) {
            let path = match item {
                WalkItem::File(path) => path,
                WalkItem::Unreadable { path, error } => {
                    warn!("Cannot walk {}: {}", path.display(), error);
                    reporter.on_file_failed(&path, &error);
                    scan.failures.push(ScanFailure { path, error });
                    continue;
                }
            };
            scan.files_scanned += 1;
            let key = match scanner::path_key(&path) {
                Ok(key) => key,
                Err(err) => {
                    warn!("{}", err);
                    let error = err.to_string();
                    reporter.on_file_failed(&path, &error);
                    scan.failures.push(ScanFailure { path, error });
                    continue;
                }
            };

            if add_only && db.contains_path(&key)? {
                debug!("skipping {}", path.display());
                reporter.on_file_skipped(&path);
                scan.files_skipped += 1;
                continue;
            }

            debug!("hashing {}", path.display());
            let hash = match hasher::fingerprint_file(&path, self.chunk_size) {
                Ok(hash) => hash,
                Err(source) => {
                    let err = Error::FileRead {
                        path: path.clone(),
                        source,
                    };
                    warn!("{}", err);
                    let error = err.to_string();
                    reporter.on_file_failed(&path, &error);
                    scan.failures.push(ScanFailure { path, error });
                    continue;
                }
            };

            debug!("storing {}", path.display());
            let outcome = db.upsert_file(&key, &scanner::file_name_of(&path), &hash, Utc::now())?;
            if outcome.status() == Status::Mismatch {
                warn!("Hash mismatch: {}", path.display());
            }
            reporter.on_file_hashed(&path, outcome.status(), scan.files_scanned);
        }

        Ok(scan)
    }
}
