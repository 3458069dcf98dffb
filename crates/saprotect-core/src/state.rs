//! Record status state machine.
//!
//! A stored [`FileRecord`] is split by [`FileRecord::classify`] into either a
//! [`MismatchedRecord`] or an [`ActiveRecord`]. Only the former can be
//! remediated and only the latter accepts a new fingerprint, so a frozen
//! mismatch cannot be re-baselined by a plain scan.

use crate::storage::models::FileRecord;
use chrono::{DateTime, Utc};
use std::fmt;

/// Persisted as a small integer in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Mismatch,
    RemediateNew,
    RemediateOld,
    New,
}

impl Status {
    pub fn code(self) -> i64 {
        match self {
            Status::Ok => 0,
            Status::Mismatch => 1,
            Status::RemediateNew => 2,
            Status::RemediateOld => 3,
            Status::New => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Status> {
        match code {
            0 => Some(Status::Ok),
            1 => Some(Status::Mismatch),
            2 => Some(Status::RemediateNew),
            3 => Some(Status::RemediateOld),
            4 => Some(Status::New),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Ok => "OK",
            Status::Mismatch => "MISMATCH",
            Status::RemediateNew => "REMEDIATE_NEW",
            Status::RemediateOld => "REMEDIATE_OLD",
            Status::New => "NEW",
        };
        f.write_str(label)
    }
}

/// Which of the two known fingerprints the operator trusts after a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Trust the fingerprint recorded before the mismatch.
    KeepOld,
    /// Trust the fingerprint that triggered the mismatch.
    KeepNew,
}

impl Resolution {
    pub fn status(self) -> Status {
        match self {
            Resolution::KeepOld => Status::RemediateOld,
            Resolution::KeepNew => Status::RemediateNew,
        }
    }
}

/// A freshly computed fingerprint and the moment it was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub hash: String,
    pub time: DateTime<Utc>,
}

impl Observation {
    pub fn new(hash: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            hash: hash.into(),
            time,
        }
    }

    /// First sighting of a path.
    pub fn into_record(self, filename: &str, path: &str) -> FileRecord {
        FileRecord {
            filename: filename.to_string(),
            path: path.to_string(),
            hash: self.hash,
            old_hash: None,
            time: self.time,
            old_time: None,
            status: Status::New,
        }
    }
}

pub enum Tracked {
    Mismatched(MismatchedRecord),
    Active(ActiveRecord),
}

/// A record frozen in MISMATCH, waiting for the operator.
#[derive(Debug)]
pub struct MismatchedRecord(FileRecord);

/// A record in any status a scan may update.
#[derive(Debug)]
pub struct ActiveRecord(FileRecord);

impl FileRecord {
    pub fn classify(self) -> Tracked {
        if self.status == Status::Mismatch {
            Tracked::Mismatched(MismatchedRecord(self))
        } else {
            Tracked::Active(ActiveRecord(self))
        }
    }
}

impl MismatchedRecord {
    pub fn record(&self) -> &FileRecord {
        &self.0
    }

    /// Only the status changes; the next scan re-validates content.
    pub fn remediate(self, resolution: Resolution) -> FileRecord {
        FileRecord {
            status: resolution.status(),
            ..self.0
        }
    }
}

impl ActiveRecord {
    pub fn record(&self) -> &FileRecord {
        &self.0
    }

    /// Apply a scan result.
    ///
    /// REMEDIATE_OLD compares against, and keeps, the pre-mismatch baseline.
    /// Every other status compares against the current hash and shifts it into
    /// the previous slot.
    pub fn observe(self, observation: Observation) -> FileRecord {
        let record = self.0;
        match record.status {
            Status::RemediateOld => {
                let status = if record.old_hash.as_deref() == Some(observation.hash.as_str()) {
                    Status::Ok
                } else {
                    Status::Mismatch
                };
                FileRecord {
                    hash: observation.hash,
                    time: observation.time,
                    status,
                    ..record
                }
            }
            _ => {
                let status = if record.hash == observation.hash {
                    Status::Ok
                } else {
                    Status::Mismatch
                };
                FileRecord {
                    old_hash: Some(record.hash),
                    old_time: Some(record.time),
                    hash: observation.hash,
                    time: observation.time,
                    status,
                    ..record
                }
            }
        }
    }
}
