//! Session summaries and read-only reports over the integrity store.
//!
//! Rendering functions return plain text. In clean mode headers, separators
//! and totals are left out so the output can be piped into other tools.

use crate::error::Error;
use crate::state::Status;
use crate::storage::models::{FileRecord, ScanSession};
use crate::storage::Database;
use chrono::{DateTime, Local, Utc};
use std::fmt::Write as _;
use tracing::info;

const SEPARATOR_WIDTH: usize = 40;

/// Count what the scan that started at `start` did and append it to the
/// session history.
pub fn record_session(
    db: &Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    files_scanned: usize,
) -> Result<ScanSession, Error> {
    let session = ScanSession {
        start,
        end,
        files_scanned: files_scanned as i64,
        files_added: db.count_added_since(&start)?,
        files_updated: db.count_updated_since(&start)?,
        files_mismatched: db.count_by_status(Status::Mismatch)?,
    };
    db.record_session(&session)?;
    info!(
        "Session recorded: {} scanned, {} added, {} updated, {} mismatched",
        session.files_scanned, session.files_added, session.files_updated, session.files_mismatched
    );
    Ok(session)
}

pub fn last_session(db: &Database) -> Result<Option<ScanSession>, Error> {
    Ok(db.latest_session()?)
}

pub fn session_history(db: &Database, limit: usize) -> Result<Vec<ScanSession>, Error> {
    Ok(db.list_sessions(limit as i64)?)
}

pub fn mismatches(db: &Database) -> Result<Vec<FileRecord>, Error> {
    Ok(db.list_mismatches()?)
}

pub fn duplicates(db: &Database, filename: &str) -> Result<Vec<FileRecord>, Error> {
    Ok(db.list_duplicates(filename)?)
}

fn separator() -> String {
    "-".repeat(SEPARATOR_WIDTH)
}

fn plural(count: i64, singular: &str, plural: &str) -> String {
    if count == 1 {
        singular.to_string()
    } else {
        plural.to_string()
    }
}

pub fn format_local(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%a %b %e %H:%M:%S %Y")
        .to_string()
}

pub fn render_session(session: &ScanSession, clean: bool) -> String {
    let mut out = String::new();
    if !clean {
        let _ = writeln!(
            out,
            "LAST SCAN {} {}",
            format_local(&session.start),
            format_local(&session.end)
        );
        let _ = writeln!(out, "{}", separator());
    }
    let _ = writeln!(
        out,
        "{} {} added",
        session.files_added,
        plural(session.files_added, "file", "files")
    );
    let _ = writeln!(
        out,
        "{} {} updated",
        session.files_updated,
        plural(session.files_updated, "file", "files")
    );
    let _ = writeln!(
        out,
        "{} {} with hash mismatches",
        session.files_mismatched,
        plural(session.files_mismatched, "file", "files")
    );
    if !clean {
        let _ = writeln!(out, "{}", separator());
        let _ = writeln!(
            out,
            "{} total {} scanned",
            session.files_scanned,
            plural(session.files_scanned, "file", "files")
        );
    }
    out
}

pub fn render_mismatches(records: &[FileRecord], show_hashes: bool, clean: bool) -> String {
    let mut out = String::new();
    if !clean {
        let _ = writeln!(out, "MISMATCHES");
        let _ = writeln!(out, "{}", separator());
    }
    for record in records {
        if show_hashes {
            let _ = writeln!(
                out,
                "{} ({} != {})",
                record.path,
                record.hash,
                record.old_hash.as_deref().unwrap_or("-")
            );
        } else {
            let _ = writeln!(out, "{}", record.path);
        }
    }
    if !clean {
        let count = records.len() as i64;
        let _ = writeln!(out, "{}", separator());
        let _ = writeln!(
            out,
            "{} {} found",
            count,
            plural(count, "mismatch", "mismatches")
        );
    }
    out
}

pub fn render_duplicates(filename: &str, records: &[FileRecord], clean: bool) -> String {
    let mut out = String::new();
    if !clean {
        let _ = writeln!(out, "{}", filename);
        let _ = writeln!(out, "{}", separator());
    }
    for record in records {
        let _ = writeln!(out, "{} {}", record.path, record.hash);
    }
    if !clean {
        let _ = writeln!(out, "{}", separator());
    }
    out
}

/// Every record, one per line, for debugging a store by hand.
pub fn render_dump(records: &[FileRecord]) -> String {
    let mut out = String::new();
    for r in records {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.filename,
            r.path,
            r.hash,
            r.old_hash.as_deref().unwrap_or("-"),
            r.time.to_rfc3339(),
            r.old_time.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string()),
            r.status
        );
    }
    out
}
