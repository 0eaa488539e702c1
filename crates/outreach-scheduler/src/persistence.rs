//! SQLite-backed persistence for candidates, the email queue, and the
//! delivery log. One connection, one file, survives restarts.
//!
//! The queue is a historical record: rows are inserted by the sequencer
//! trigger and updated (pending → sent/failed) by the dispatcher, never
//! deleted. The delivery log is append-only, one row per attempt.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

use outreach_core::error::{OutreachError, Result};
use outreach_core::types::{
    Candidate, CandidateStats, DeliveryLogEntry, DeliveryOutcome, ScheduledTask, TaskStatus,
};

/// SQLite-backed store for all outreach data.
pub struct OutreachDb {
    conn: Mutex<Connection>,
}

impl OutreachDb {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| OutreachError::Storage(format!("DB open: {e}")))?;
        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database, for tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| OutreachError::Storage(format!("DB open: {e}")))?;
        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        Ok(db)
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS candidates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                position TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL
            );

            -- Scheduled email tasks (the queue). Never deleted.
            CREATE TABLE IF NOT EXISTS scheduled_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_id INTEGER NOT NULL,
                sequence_index INTEGER NOT NULL,
                scheduled_for TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                subject TEXT NOT NULL,
                body_key TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (candidate_id, sequence_index),
                FOREIGN KEY (candidate_id) REFERENCES candidates(id)
            );

            -- Delivery attempts. Append-only, one row per attempt.
            CREATE TABLE IF NOT EXISTS delivery_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                candidate_id INTEGER NOT NULL,
                sequence_index INTEGER NOT NULL,
                attempted_at TEXT NOT NULL,
                outcome TEXT NOT NULL,
                error_detail TEXT,
                FOREIGN KEY (task_id) REFERENCES scheduled_tasks(id)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_due
                ON scheduled_tasks (status, scheduled_for);
            ",
        )
        .map_err(|e| OutreachError::Storage(format!("Migration: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| OutreachError::Storage(format!("DB lock poisoned: {e}")))
    }

    // ─── Candidates ──────────────────────────────────────

    /// Add a candidate. Email must be unique.
    pub fn add_candidate(&self, name: &str, email: &str, position: &str) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO candidates (name, email, position, status, created_at)
             VALUES (?1, ?2, ?3, 'active', ?4)",
            rusqlite::params![name, email, position, Utc::now().to_rfc3339()],
        )
        .map_err(|e| OutreachError::Storage(format!("Add candidate: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    /// Look a candidate up by id.
    pub fn get_candidate(&self, id: i64) -> Result<Candidate> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, email, position, status, created_at
                 FROM candidates WHERE id = ?1",
            )
            .map_err(|e| OutreachError::Storage(format!("Get candidate: {e}")))?;
        let candidate = stmt
            .query_row(rusqlite::params![id], candidate_from_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => OutreachError::CandidateNotFound(id),
                other => OutreachError::Storage(format!("Get candidate: {other}")),
            })?;
        Ok(candidate)
    }

    /// All candidates, newest first.
    pub fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, email, position, status, created_at
                 FROM candidates ORDER BY created_at DESC, id DESC",
            )
            .map_err(|e| OutreachError::Storage(format!("List candidates: {e}")))?;
        let rows = stmt
            .query_map([], candidate_from_row)
            .map_err(|e| OutreachError::Storage(format!("List candidates: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Email Queue ──────────────────────────────────────

    /// Insert a full sequence of tasks atomically.
    ///
    /// Fails with `DuplicateSequence` if any (candidate_id, sequence_index)
    /// pair already exists — terminal or not. Nothing is inserted on
    /// failure.
    pub fn enqueue(&self, tasks: &[ScheduledTask]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| OutreachError::Storage(format!("Enqueue: {e}")))?;
        for task in tasks {
            let exists: bool = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM scheduled_tasks
                     WHERE candidate_id = ?1 AND sequence_index = ?2)",
                    rusqlite::params![task.candidate_id, task.sequence_index],
                    |row| row.get(0),
                )
                .map_err(|e| OutreachError::Storage(format!("Enqueue: {e}")))?;
            if exists {
                // Transaction drops without commit — no partial insert.
                return Err(OutreachError::DuplicateSequence(task.candidate_id));
            }
            tx.execute(
                "INSERT INTO scheduled_tasks
                 (candidate_id, sequence_index, scheduled_for, status, subject, body_key, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    task.candidate_id,
                    task.sequence_index,
                    task.scheduled_for.to_rfc3339(),
                    task.status.as_str(),
                    task.subject,
                    task.body_key,
                    task.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| OutreachError::Storage(format!("Enqueue: {e}")))?;
        }
        tx.commit()
            .map_err(|e| OutreachError::Storage(format!("Enqueue: {e}")))?;
        Ok(())
    }

    /// All pending tasks due at or before `now`, oldest first; ties broken
    /// by sequence position so an earlier email in a sequence is never
    /// processed after a later one.
    pub fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledTask>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, candidate_id, sequence_index, scheduled_for, status,
                        subject, body_key, created_at
                 FROM scheduled_tasks
                 WHERE status = 'pending' AND scheduled_for <= ?1
                 ORDER BY scheduled_for ASC, sequence_index ASC",
            )
            .map_err(|e| OutreachError::Storage(format!("Fetch due: {e}")))?;
        let rows = stmt
            .query_map(rusqlite::params![now.to_rfc3339()], task_from_row)
            .map_err(|e| OutreachError::Storage(format!("Fetch due: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Transition a task out of `Pending`.
    ///
    /// The `status = 'pending'` guard in the UPDATE is the engine's sole
    /// at-most-once mechanism: if another tick already claimed the task,
    /// zero rows change and `InvalidTransition` is returned.
    pub fn mark_result(&self, task_id: i64, outcome: DeliveryOutcome) -> Result<()> {
        let status = match outcome {
            DeliveryOutcome::Sent => TaskStatus::Sent,
            DeliveryOutcome::Failed => TaskStatus::Failed,
        };
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE scheduled_tasks SET status = ?1 WHERE id = ?2 AND status = 'pending'",
                rusqlite::params![status.as_str(), task_id],
            )
            .map_err(|e| OutreachError::Storage(format!("Mark result: {e}")))?;
        if changed == 0 {
            return Err(OutreachError::InvalidTransition(task_id));
        }
        Ok(())
    }

    /// Fetch one task by id (operator/report queries).
    pub fn get_task(&self, task_id: i64) -> Result<Option<ScheduledTask>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, candidate_id, sequence_index, scheduled_for, status,
                        subject, body_key, created_at
                 FROM scheduled_tasks WHERE id = ?1",
            )
            .map_err(|e| OutreachError::Storage(format!("Get task: {e}")))?;
        let task = stmt
            .query_row(rusqlite::params![task_id], task_from_row)
            .ok();
        Ok(task)
    }

    /// All tasks for one candidate, in sequence order.
    pub fn candidate_tasks(&self, candidate_id: i64) -> Result<Vec<ScheduledTask>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, candidate_id, sequence_index, scheduled_for, status,
                        subject, body_key, created_at
                 FROM scheduled_tasks WHERE candidate_id = ?1
                 ORDER BY sequence_index ASC",
            )
            .map_err(|e| OutreachError::Storage(format!("Candidate tasks: {e}")))?;
        let rows = stmt
            .query_map(rusqlite::params![candidate_id], task_from_row)
            .map_err(|e| OutreachError::Storage(format!("Candidate tasks: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Queue counts for one candidate.
    pub fn candidate_stats(&self, candidate_id: i64) -> Result<CandidateStats> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT
                COUNT(CASE WHEN status = 'pending' THEN 1 END),
                COUNT(CASE WHEN status = 'sent' THEN 1 END),
                COUNT(CASE WHEN status = 'failed' THEN 1 END)
             FROM scheduled_tasks WHERE candidate_id = ?1",
            rusqlite::params![candidate_id],
            |row| {
                Ok(CandidateStats {
                    pending: row.get::<_, i64>(0)? as usize,
                    sent: row.get::<_, i64>(1)? as usize,
                    failed: row.get::<_, i64>(2)? as usize,
                })
            },
        )
        .map_err(|e| OutreachError::Storage(format!("Candidate stats: {e}")))
    }

    // ─── Delivery Log ──────────────────────────────────────

    /// Append one delivery attempt record.
    pub fn append_log(&self, entry: &DeliveryLogEntry) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO delivery_log
             (task_id, candidate_id, sequence_index, attempted_at, outcome, error_detail)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                entry.task_id,
                entry.candidate_id,
                entry.sequence_index,
                entry.attempted_at.to_rfc3339(),
                entry.outcome.as_str(),
                entry.error_detail,
            ],
        )
        .map_err(|e| OutreachError::Storage(format!("Append log: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    /// Delivery history for one candidate, oldest attempt first.
    pub fn history(&self, candidate_id: i64) -> Result<Vec<DeliveryLogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, task_id, candidate_id, sequence_index, attempted_at,
                        outcome, error_detail
                 FROM delivery_log WHERE candidate_id = ?1
                 ORDER BY attempted_at ASC, id ASC",
            )
            .map_err(|e| OutreachError::Storage(format!("History: {e}")))?;
        let rows = stmt
            .query_map(rusqlite::params![candidate_id], log_from_row)
            .map_err(|e| OutreachError::Storage(format!("History: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Reporting ──────────────────────────────────────

    /// Whole-database counts for the dashboard.
    pub fn global_stats(&self) -> Result<GlobalStats> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM candidates),
                (SELECT COUNT(*) FROM candidates WHERE status = 'active'),
                (SELECT COUNT(*) FROM scheduled_tasks WHERE status = 'pending'),
                (SELECT COUNT(*) FROM scheduled_tasks WHERE status = 'sent'),
                (SELECT COUNT(*) FROM scheduled_tasks WHERE status = 'failed'),
                (SELECT COUNT(*) FROM delivery_log)",
            [],
            |row| {
                Ok(GlobalStats {
                    candidates: row.get::<_, i64>(0)? as usize,
                    active_candidates: row.get::<_, i64>(1)? as usize,
                    pending: row.get::<_, i64>(2)? as usize,
                    sent: row.get::<_, i64>(3)? as usize,
                    failed: row.get::<_, i64>(4)? as usize,
                    attempts: row.get::<_, i64>(5)? as usize,
                })
            },
        )
        .map_err(|e| OutreachError::Storage(format!("Global stats: {e}")))
    }
}

/// Whole-database counts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GlobalStats {
    pub candidates: usize,
    pub active_candidates: usize,
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
    pub attempts: usize,
}

fn candidate_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Candidate> {
    Ok(Candidate {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        position: row.get(3)?,
        status: row.get(4)?,
        created_at: parse_ts(&row.get::<_, String>(5)?),
    })
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledTask> {
    Ok(ScheduledTask {
        id: row.get(0)?,
        candidate_id: row.get(1)?,
        sequence_index: row.get(2)?,
        scheduled_for: parse_ts(&row.get::<_, String>(3)?),
        status: TaskStatus::parse(&row.get::<_, String>(4)?),
        subject: row.get(5)?,
        body_key: row.get(6)?,
        created_at: parse_ts(&row.get::<_, String>(7)?),
    })
}

fn log_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeliveryLogEntry> {
    Ok(DeliveryLogEntry {
        id: row.get(0)?,
        task_id: row.get(1)?,
        candidate_id: row.get(2)?,
        sequence_index: row.get(3)?,
        attempted_at: parse_ts(&row.get::<_, String>(4)?),
        outcome: DeliveryOutcome::parse(&row.get::<_, String>(5)?),
        error_detail: row.get(6)?,
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
