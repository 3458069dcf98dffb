use super::models::*;
use super::sqlite::Database;
use crate::state::{Observation, Resolution, Status, Tracked};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

const RECORD_COLUMNS: &str = "filename, path, hash, old_hash, time, old_time, status";

/// Result of feeding one fingerprint into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting; the record starts out NEW.
    Added,
    /// An existing record accepted the fingerprint and moved to this status.
    Updated(Status),
    /// The record is in MISMATCH and was left untouched.
    Frozen,
}

impl UpsertOutcome {
    pub fn status(self) -> Status {
        match self {
            UpsertOutcome::Added => Status::New,
            UpsertOutcome::Updated(status) => status,
            UpsertOutcome::Frozen => Status::Mismatch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    Applied(Status),
    /// Nothing to resolve. Carries the current status, `None` for untracked paths.
    Skipped(Option<Status>),
}

/// Timestamps are fixed-width so that text order matches time order in SQL.
pub fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 text and, for stores written by the original tool,
/// fractional epoch seconds.
pub fn decode_time(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time.with_timezone(&Utc));
    }
    let secs: f64 = text.trim().parse().ok()?;
    if !secs.is_finite() {
        return None;
    }
    Utc.timestamp_micros((secs * 1_000_000.0).round() as i64)
        .single()
}

fn time_column(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    decode_time(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp '{}'", text).into(),
        )
    })
}

fn optional_time_column(row: &Row<'_>, idx: usize) -> Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    match text {
        None => Ok(None),
        Some(_) => time_column(row, idx).map(Some),
    }
}

fn status_column(row: &Row<'_>, idx: usize) -> Result<Status> {
    let code: i64 = row.get(idx)?;
    Status::from_code(code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("unknown status code {}", code).into(),
        )
    })
}

fn record_from_row(row: &Row<'_>) -> Result<FileRecord> {
    Ok(FileRecord {
        filename: row.get(0)?,
        path: row.get(1)?,
        hash: row.get(2)?,
        old_hash: row.get(3)?,
        time: time_column(row, 4)?,
        old_time: optional_time_column(row, 5)?,
        status: status_column(row, 6)?,
    })
}

fn session_from_row(row: &Row<'_>) -> Result<ScanSession> {
    Ok(ScanSession {
        start: time_column(row, 0)?,
        end: time_column(row, 1)?,
        files_scanned: row.get(2)?,
        files_added: row.get(3)?,
        files_updated: row.get(4)?,
        files_mismatched: row.get(5)?,
    })
}

impl Database {
    // ── File Records ─────────────────────────────────────────────

    pub fn find_record(&self, path: &str) -> Result<Option<FileRecord>> {
        self.connection()
            .query_row(
                &format!(
                    "SELECT {} FROM files WHERE path = ?1 LIMIT 1",
                    RECORD_COLUMNS
                ),
                params![path],
                record_from_row,
            )
            .optional()
    }

    pub fn contains_path(&self, path: &str) -> Result<bool> {
        let count: i64 = self.connection().query_row(
            "SELECT COUNT(*) FROM files WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn get_status(&self, path: &str) -> Result<Option<Status>> {
        self.connection()
            .query_row(
                "SELECT status FROM files WHERE path = ?1 LIMIT 1",
                params![path],
                |row| status_column(row, 0),
            )
            .optional()
    }

    pub fn count_by_status(&self, status: Status) -> Result<i64> {
        self.connection().query_row(
            "SELECT COUNT(*) FROM files WHERE status = ?1",
            params![status.code()],
            |row| row.get(0),
        )
    }

    fn insert_record(&self, record: &FileRecord) -> Result<()> {
        self.connection().execute(
            "INSERT INTO files (filename, path, hash, old_hash, time, old_time, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.filename,
                record.path,
                record.hash,
                record.old_hash,
                encode_time(&record.time),
                record.old_time.as_ref().map(encode_time),
                record.status.code(),
            ],
        )?;
        Ok(())
    }

    fn update_record(&self, record: &FileRecord) -> Result<()> {
        self.connection().execute(
            "UPDATE files SET hash = ?1, old_hash = ?2, time = ?3, old_time = ?4, status = ?5 \
             WHERE path = ?6",
            params![
                record.hash,
                record.old_hash,
                encode_time(&record.time),
                record.old_time.as_ref().map(encode_time),
                record.status.code(),
                record.path,
            ],
        )?;
        Ok(())
    }

    /// Record a freshly computed fingerprint for `path`.
    ///
    /// Unknown paths are inserted as NEW. Records frozen in MISMATCH are left
    /// alone. Everything else goes through [`crate::state::ActiveRecord::observe`].
    pub fn upsert_file(
        &self,
        path: &str,
        filename: &str,
        hash: &str,
        time: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let tx = self.connection().unchecked_transaction()?;
        let observation = Observation::new(hash, time);
        let outcome = match self.find_record(path)? {
            None => {
                self.insert_record(&observation.into_record(filename, path))?;
                UpsertOutcome::Added
            }
            Some(existing) => match existing.classify() {
                Tracked::Mismatched(_) => UpsertOutcome::Frozen,
                Tracked::Active(active) => {
                    let updated = active.observe(observation);
                    self.update_record(&updated)?;
                    UpsertOutcome::Updated(updated.status)
                }
            },
        };
        tx.commit()?;
        debug!("Upserted {} -> {:?}", path, outcome);
        Ok(outcome)
    }

    /// Move a MISMATCH record to the chosen remediation status. Any other
    /// record, or an untracked path, is skipped.
    pub fn remediate_file(&self, path: &str, resolution: Resolution) -> Result<Remediation> {
        let tx = self.connection().unchecked_transaction()?;
        let outcome = match self.find_record(path)? {
            None => Remediation::Skipped(None),
            Some(existing) => match existing.classify() {
                Tracked::Active(active) => Remediation::Skipped(Some(active.record().status)),
                Tracked::Mismatched(mismatched) => {
                    let remediated = mismatched.remediate(resolution);
                    self.update_record(&remediated)?;
                    Remediation::Applied(remediated.status)
                }
            },
        };
        tx.commit()?;
        debug!("Remediation of {} -> {:?}", path, outcome);
        Ok(outcome)
    }

    fn query_records(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<FileRecord>> {
        let mut stmt = self.connection().prepare(sql)?;
        let records = stmt
            .query_map(params, record_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn list_mismatches(&self) -> Result<Vec<FileRecord>> {
        self.query_records(
            &format!(
                "SELECT {} FROM files WHERE status = ?1 ORDER BY path",
                RECORD_COLUMNS
            ),
            params![Status::Mismatch.code()],
        )
    }

    pub fn list_duplicates(&self, filename: &str) -> Result<Vec<FileRecord>> {
        self.query_records(
            &format!(
                "SELECT {} FROM files WHERE filename = ?1 ORDER BY path",
                RECORD_COLUMNS
            ),
            params![filename],
        )
    }

    pub fn all_records(&self) -> Result<Vec<FileRecord>> {
        self.query_records(
            &format!("SELECT {} FROM files ORDER BY path", RECORD_COLUMNS),
            [],
        )
    }

    /// Records first seen after `since`.
    pub fn count_added_since(&self, since: &DateTime<Utc>) -> Result<i64> {
        self.connection().query_row(
            "SELECT COUNT(*) FROM files WHERE status = ?1 AND time > ?2",
            params![Status::New.code(), encode_time(since)],
            |row| row.get(0),
        )
    }

    /// Existing records that accepted a fingerprint after `since`.
    pub fn count_updated_since(&self, since: &DateTime<Utc>) -> Result<i64> {
        self.connection().query_row(
            "SELECT COUNT(*) FROM files WHERE status != ?1 AND time > ?2",
            params![Status::New.code(), encode_time(since)],
            |row| row.get(0),
        )
    }

    // ── Scan Sessions ────────────────────────────────────────────

    pub fn record_session(&self, session: &ScanSession) -> Result<()> {
        self.connection().execute(
            "INSERT INTO metadata \
             (start, \"end\", files_scanned, files_added, files_updated, files_mismatched) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                encode_time(&session.start),
                encode_time(&session.end),
                session.files_scanned,
                session.files_added,
                session.files_updated,
                session.files_mismatched,
            ],
        )?;
        debug!("Recorded scan session started {}", encode_time(&session.start));
        Ok(())
    }

    /// Sessions newest-first.
    pub fn list_sessions(&self, limit: i64) -> Result<Vec<ScanSession>> {
        let mut stmt = self.connection().prepare(
            "SELECT start, \"end\", files_scanned, files_added, files_updated, files_mismatched \
             FROM metadata ORDER BY start DESC LIMIT ?1",
        )?;
        let sessions = stmt
            .query_map(params![limit], session_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(sessions)
    }

    pub fn latest_session(&self) -> Result<Option<ScanSession>> {
        Ok(self.list_sessions(1)?.into_iter().next())
    }
}
