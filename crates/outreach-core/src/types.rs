//! Data model — candidates, scheduled tasks, and the delivery log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job candidate. Identity is owned by the candidates table; the engine
/// only reads it for addressing and template substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub position: String,
    /// "active" unless an operator archives the candidate.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Lifecycle state of a scheduled email task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Sent,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Sent => "sent",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "sent" => TaskStatus::Sent,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }
}

/// One time-deferred email in a candidate's sequence.
///
/// `(candidate_id, sequence_index)` is unique; tasks are never deleted and
/// only the dispatcher moves them out of `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Row id. 0 until persisted.
    pub id: i64,
    pub candidate_id: i64,
    /// 1-based position within the sequence.
    pub sequence_index: u32,
    pub scheduled_for: DateTime<Utc>,
    pub status: TaskStatus,
    /// Subject rendered at trigger time.
    pub subject: String,
    /// Key of the body template, rendered at send time.
    pub body_key: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "failed" => DeliveryOutcome::Failed,
            _ => DeliveryOutcome::Sent,
        }
    }
}

/// Append-only record of one delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    /// Row id. 0 until persisted.
    pub id: i64,
    pub task_id: i64,
    pub candidate_id: i64,
    pub sequence_index: u32,
    pub attempted_at: DateTime<Utc>,
    pub outcome: DeliveryOutcome,
    /// Present iff the attempt failed.
    pub error_detail: Option<String>,
}

/// Aggregate counts from one dispatcher tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }
}

/// Per-candidate queue counts, for reporting.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CandidateStats {
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for s in [TaskStatus::Pending, TaskStatus::Sent, TaskStatus::Failed] {
            assert_eq!(TaskStatus::parse(s.as_str()), s);
        }
        // Unknown strings fall back to pending, never to a terminal state.
        assert_eq!(TaskStatus::parse("garbage"), TaskStatus::Pending);
    }

    #[test]
    fn empty_report() {
        assert!(TickReport::default().is_empty());
        let r = TickReport { attempted: 1, sent: 1, failed: 0 };
        assert!(!r.is_empty());
    }
}
