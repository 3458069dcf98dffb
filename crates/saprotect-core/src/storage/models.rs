use crate::state::Status;
use chrono::{DateTime, Utc};

/// One tracked path and its one-deep fingerprint history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub filename: String,
    pub path: String,
    pub hash: String,
    pub old_hash: Option<String>,
    pub time: DateTime<Utc>,
    pub old_time: Option<DateTime<Utc>>,
    pub status: Status,
}

/// One completed invocation of the scan workflow. Rows are never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub files_scanned: i64,
    pub files_added: i64,
    pub files_updated: i64,
    pub files_mismatched: i64,
}
