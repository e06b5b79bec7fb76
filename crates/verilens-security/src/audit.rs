// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — append-only SQLite log of every verification run.
//
// Schema:
//   verification_log(
//     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//     run_id      TEXT    NOT NULL,   -- UUID of the engine run
//     timestamp   TEXT    NOT NULL,   -- RFC 3339
//     image_hash  TEXT    NOT NULL,   -- SHA-256 hex digest of the image
//     verdict     TEXT    NOT NULL,   -- "pass" | "suspect" | "fail"
//     success     INTEGER NOT NULL,   -- 0 = a stage failed, 1 = all passed
//     details     TEXT                -- optional JSON context
//   )

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use verilens_core::error::VerilensError;
use verilens_core::types::{RunId, Verdict};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS verification_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id      TEXT    NOT NULL,
    timestamp   TEXT    NOT NULL,
    image_hash  TEXT    NOT NULL,
    verdict     TEXT    NOT NULL,
    success     INTEGER NOT NULL,
    details     TEXT
);
CREATE INDEX IF NOT EXISTS idx_verification_log_hash ON verification_log(image_hash);";

const SELECT_COLUMNS: &str = "SELECT id, run_id, timestamp, image_hash, verdict, success, details FROM verification_log";

fn db_err(e: rusqlite::Error) -> VerilensError {
    VerilensError::Database(e.to_string())
}

/// A single recorded verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub run_id: String,
    pub timestamp: String,
    pub image_hash: String,
    pub verdict: Verdict,
    pub success: bool,
    pub details: Option<String>,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let verdict: String = row.get(4)?;
        let verdict = verdict.parse::<Verdict>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: row.get(0)?,
            run_id: row.get(1)?,
            timestamp: row.get(2)?,
            image_hash: row.get(3)?,
            verdict,
            success: row.get::<_, i32>(5)? != 0,
            details: row.get(6)?,
        })
    }
}

/// Append-only log of verification outcomes backed by SQLite.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`, in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VerilensError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, VerilensError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Record the outcome of one verification run.
    #[instrument(skip_all, fields(%run_id, %image_hash, %verdict, success = success))]
    pub fn record(
        &self,
        run_id: RunId,
        image_hash: &str,
        verdict: Verdict,
        success: bool,
        details: Option<&str>,
    ) -> Result<(), VerilensError> {
        let timestamp = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO verification_log (run_id, timestamp, image_hash, verdict, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run_id.to_string(),
                    timestamp,
                    image_hash,
                    verdict.as_str(),
                    i32::from(success),
                    details
                ],
            )
            .map_err(db_err)?;
        debug!("verification recorded");
        Ok(())
    }

    /// All runs for an image digest, oldest first.
    pub fn entries_for_hash(&self, image_hash: &str) -> Result<Vec<AuditEntry>, VerilensError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE image_hash = ?1 ORDER BY id ASC"))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![image_hash], AuditEntry::from_row)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// The most recent `limit` runs, newest first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, VerilensError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1"))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit], AuditEntry::from_row)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    pub fn count(&self) -> Result<u64, VerilensError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM verification_log", [], |row| row.get(0))
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log() -> AuditLog {
        AuditLog::open_in_memory().expect("open in-memory audit log")
    }

    #[test]
    fn record_and_count() {
        let log = make_log();
        assert_eq!(log.count().unwrap(), 0);
        log.record(RunId::new(), "abc123", Verdict::Pass, true, None)
            .unwrap();
        log.record(RunId::new(), "abc123", Verdict::Fail, false, Some("{\"stage\":\"integrity\"}"))
            .unwrap();
        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn entries_for_hash_round_trip_verdicts() {
        let log = make_log();
        let run = RunId::new();
        log.record(run, "aaa", Verdict::Suspect, true, None).unwrap();
        log.record(RunId::new(), "bbb", Verdict::Pass, true, None).unwrap();
        log.record(RunId::new(), "aaa", Verdict::Fail, false, Some("tag mismatch"))
            .unwrap();

        let entries = log.entries_for_hash("aaa").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].run_id, run.to_string());
        assert_eq!(entries[0].verdict, Verdict::Suspect);
        assert!(entries[0].success);
        assert_eq!(entries[1].verdict, Verdict::Fail);
        assert_eq!(entries[1].details.as_deref(), Some("tag mismatch"));
    }

    #[test]
    fn recent_entries_newest_first() {
        let log = make_log();
        for i in 0..5 {
            log.record(RunId::new(), &format!("hash_{i}"), Verdict::Pass, true, None)
                .unwrap();
        }
        let recent = log.recent_entries(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].id > recent[1].id);
        assert_eq!(recent[0].image_hash, "hash_4");
    }

    #[test]
    fn file_backed_log_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");
        {
            let log = AuditLog::open(&path).unwrap();
            log.record(RunId::new(), "persisted", Verdict::Pass, true, None)
                .unwrap();
        }
        let reopened = AuditLog::open(&path).unwrap();
        assert_eq!(reopened.entries_for_hash("persisted").unwrap().len(), 1);
    }
}
