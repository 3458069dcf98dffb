use crate::config::AppConfig;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::scanner::{self, WalkItem};
use crate::state::{Resolution, Status};
use crate::storage::{Database, Remediation};
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolves MISMATCH records under a target in one direction. No file is
/// read; the next scan re-validates content against the chosen baseline.
pub struct RemediationEngine {
    ignore_patterns: Vec<Pattern>,
}

#[derive(Debug, Default)]
pub struct RemediationResult {
    pub remediated: Vec<PathBuf>,
    /// Paths with nothing to resolve and their current status, if tracked.
    pub skipped: Vec<(PathBuf, Option<Status>)>,
}

impl RemediationEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ignore_patterns: scanner::compile_ignore_patterns(&config.ignore_patterns),
        }
    }

    /// Remediate every target in turn. A target without mismatches never
    /// stops the remaining ones.
    pub fn remediate(
        &self,
        db: &Database,
        targets: &[PathBuf],
        resolution: Resolution,
        reporter: &dyn ProgressReporter,
    ) -> Result<RemediationResult, Error> {
        let mut result = RemediationResult::default();
        for target in targets {
            let target = scanner::absolute_target(target)?;
            if !target.exists() {
                warn!("{} does not exist; skipping", target.display());
                continue;
            }
            self.remediate_target(db, &target, resolution, reporter, &mut result)?;
        }
        info!(
            "Remediation ({:?}): {} resolved, {} skipped",
            resolution,
            result.remediated.len(),
            result.skipped.len()
        );
        Ok(result)
    }

    pub fn remediate_path(
        &self,
        db: &Database,
        target: &Path,
        resolution: Resolution,
        reporter: &dyn ProgressReporter,
    ) -> Result<RemediationResult, Error> {
        let mut result = RemediationResult::default();
        let target = scanner::absolute_target(target)?;
        self.remediate_target(db, &target, resolution, reporter, &mut result)?;
        Ok(result)
    }

    fn remediate_target(
        &self,
        db: &Database,
        target: &Path,
        resolution: Resolution,
        reporter: &dyn ProgressReporter,
        result: &mut RemediationResult,
    ) -> Result<(), Error> {
        for item in scanner::walk_files(target, &self.ignore_patterns) {
            let path = match item {
                WalkItem::File(path) => path,
                WalkItem::Unreadable { path, error } => {
                    warn!("Cannot walk {}: {}", path.display(), error);
                    continue;
                }
            };
            let key = match scanner::path_key(&path) {
                Ok(key) => key,
                Err(err) => {
                    warn!("{}", err);
                    continue;
                }
            };
            match db.remediate_file(&key, resolution)? {
                Remediation::Applied(_) => {
                    reporter.on_remediated(&path, resolution);
                    result.remediated.push(path);
                }
                Remediation::Skipped(current) => {
                    debug!("{} has no mismatch; skipping", path.display());
                    reporter.on_remediation_skipped(&path, current);
                    result.skipped.push((path, current));
                }
            }
        }
        Ok(())
    }
}
