//! Dispatcher — the due-task processing loop.
//!
//! One `tick` pulls every due task and walks them strictly in order, one
//! send at a time. Sequential processing is deliberate: it preserves
//! per-candidate ordering (email N is terminal before email N+1 is
//! attempted) without any cross-task locking. The pending-only UPDATE in
//! `mark_result` makes concurrent ticks safe — a task claimed elsewhere is
//! skipped as a benign race.
//!
//! A failed send is terminal. There is no retry loop here; a misconfigured
//! SMTP endpoint must not turn the queue into a retry storm. Re-triggering
//! is an operator decision.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use outreach_core::error::{OutreachError, Result};
use outreach_core::sequence::{render, SequenceDefinition};
use outreach_core::traits::{Clock, Mailer};
use outreach_core::types::{DeliveryLogEntry, DeliveryOutcome, ScheduledTask, TickReport};

use crate::persistence::OutreachDb;

/// Polls the queue and drives deliveries through the configured mailer.
pub struct Dispatcher {
    db: Arc<OutreachDb>,
    mailer: Arc<dyn Mailer>,
    definition: SequenceDefinition,
}

impl Dispatcher {
    pub fn new(db: Arc<OutreachDb>, mailer: Arc<dyn Mailer>, definition: SequenceDefinition) -> Self {
        Self { db, mailer, definition }
    }

    /// Process every task due at `now`. Returns aggregate counts.
    ///
    /// Storage failures abort the tick and propagate; a task whose status
    /// write already succeeded is safe either way (the next tick will not
    /// see it as pending).
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let due = self.db.fetch_due(now)?;
        let mut report = TickReport::default();
        if due.is_empty() {
            return Ok(report);
        }
        tracing::debug!(due = due.len(), "processing due tasks");

        for task in due {
            let outcome = self.attempt(&task).await?;
            match self.db.mark_result(task.id, outcome.delivery()) {
                Ok(()) => {}
                Err(e) if e.is_benign_race() => {
                    // Another tick claimed this task first. Not an attempt.
                    tracing::debug!(task_id = task.id, "task already claimed, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            }

            report.attempted += 1;
            match &outcome {
                Attempt::Sent => {
                    report.sent += 1;
                    tracing::info!(
                        task_id = task.id,
                        candidate_id = task.candidate_id,
                        sequence_index = task.sequence_index,
                        "email sent"
                    );
                }
                Attempt::Failed(detail) => {
                    report.failed += 1;
                    tracing::warn!(
                        task_id = task.id,
                        candidate_id = task.candidate_id,
                        sequence_index = task.sequence_index,
                        error = %detail,
                        "email delivery failed"
                    );
                }
            }

            self.db.append_log(&DeliveryLogEntry {
                id: 0,
                task_id: task.id,
                candidate_id: task.candidate_id,
                sequence_index: task.sequence_index,
                attempted_at: now,
                outcome: outcome.delivery(),
                error_detail: outcome.detail(),
            })?;
        }

        Ok(report)
    }

    /// Render and send one task's email. Only storage errors propagate;
    /// anything wrong with the task itself becomes a failed attempt.
    async fn attempt(&self, task: &ScheduledTask) -> Result<Attempt> {
        let candidate = match self.db.get_candidate(task.candidate_id) {
            Ok(c) => c,
            Err(OutreachError::CandidateNotFound(_)) => {
                return Ok(Attempt::Failed(format!(
                    "candidate {} no longer exists",
                    task.candidate_id
                )));
            }
            Err(e) => return Err(e),
        };

        let step = match self.definition.step_by_body_key(&task.body_key) {
            Some(s) => s,
            None => {
                return Ok(Attempt::Failed(format!(
                    "unknown body template '{}'",
                    task.body_key
                )));
            }
        };
        let body = render(&step.body_template, &candidate.name, &candidate.position);

        match self.mailer.send(&candidate.email, &task.subject, &body).await {
            Ok(()) => Ok(Attempt::Sent),
            Err(e) => Ok(Attempt::Failed(e.to_string())),
        }
    }

    /// Poll forever: tick on every interval using the given clock.
    /// Runs until the surrounding task is cancelled; storage failures are
    /// logged and the loop keeps polling.
    pub async fn run(&self, clock: &dyn Clock, poll_interval: Duration) {
        tracing::info!(
            mailer = self.mailer.name(),
            interval_secs = poll_interval.as_secs(),
            "dispatcher started"
        );
        let mut interval = tokio::time::interval(poll_interval);
        loop {
            interval.tick().await;
            match self.tick(clock.now()).await {
                Ok(report) if report.is_empty() => {}
                Ok(report) => tracing::info!(
                    attempted = report.attempted,
                    sent = report.sent,
                    failed = report.failed,
                    "tick complete"
                ),
                Err(e) => tracing::error!(error = %e, "tick aborted"),
            }
        }
    }
}

/// Outcome of one delivery attempt, before it is written back.
enum Attempt {
    Sent,
    Failed(String),
}

impl Attempt {
    fn delivery(&self) -> DeliveryOutcome {
        match self {
            Attempt::Sent => DeliveryOutcome::Sent,
            Attempt::Failed(_) => DeliveryOutcome::Failed,
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            Attempt::Sent => None,
            Attempt::Failed(detail) => Some(detail.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::Sequencer;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use outreach_core::types::TaskStatus;
    use std::sync::Mutex;

    /// Records every send; optionally fails when the subject matches.
    struct FakeMailer {
        sent: Mutex<Vec<(String, String)>>,
        fail_subject_containing: Option<String>,
        fail_all: bool,
    }

    impl FakeMailer {
        fn recording() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail_subject_containing: None,
                fail_all: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail_subject_containing: None,
                fail_all: true,
            })
        }

        fn failing_on(needle: &str) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail_subject_containing: Some(needle.into()),
                fail_all: false,
            })
        }

        fn subjects(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
        }
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        fn name(&self) -> &str {
            "fake"
        }

        async fn send(&self, _to: &str, subject: &str, body: &str) -> Result<()> {
            if self.fail_all {
                return Err(OutreachError::Mailer("connection refused".into()));
            }
            if let Some(needle) = &self.fail_subject_containing {
                if subject.contains(needle.as_str()) {
                    return Err(OutreachError::Mailer("mailbox unavailable".into()));
                }
            }
            self.sent.lock().unwrap().push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + chrono::Duration::days(n)
    }

    fn setup(mailer: Arc<FakeMailer>) -> (Arc<OutreachDb>, Sequencer, Dispatcher, i64) {
        let db = Arc::new(OutreachDb::open_in_memory().unwrap());
        let cid = db.add_candidate("Jane", "jane@example.com", "Engineer").unwrap();
        let sequencer = Sequencer::new(SequenceDefinition::default());
        let dispatcher =
            Dispatcher::new(db.clone(), mailer, SequenceDefinition::default());
        (db, sequencer, dispatcher, cid)
    }

    #[tokio::test]
    async fn day_by_day_scenario() {
        let mailer = FakeMailer::recording();
        let (db, sequencer, dispatcher, cid) = setup(mailer.clone());
        sequencer.trigger_and_enqueue(&db, cid, day(0)).unwrap();

        // Day 0: only the welcome email.
        let report = dispatcher.tick(day(0)).await.unwrap();
        assert_eq!((report.attempted, report.sent, report.failed), (1, 1, 0));

        // Day 1: nothing due.
        assert!(dispatcher.tick(day(1)).await.unwrap().is_empty());

        // Day 2 and day 6 deliver the rest.
        assert_eq!(dispatcher.tick(day(2)).await.unwrap().sent, 1);
        assert_eq!(dispatcher.tick(day(6)).await.unwrap().sent, 1);

        let stats = db.candidate_stats(cid).unwrap();
        assert_eq!((stats.pending, stats.sent, stats.failed), (0, 3, 0));
        assert_eq!(db.history(cid).unwrap().len(), 3);

        let subjects = mailer.subjects();
        assert_eq!(subjects.len(), 3);
        assert!(subjects[0].starts_with("Welcome"));
        assert!(subjects[2].starts_with("Final Steps"));
    }

    #[tokio::test]
    async fn second_tick_at_same_instant_sends_nothing() {
        let mailer = FakeMailer::recording();
        let (db, sequencer, dispatcher, cid) = setup(mailer.clone());
        sequencer.trigger_and_enqueue(&db, cid, day(0)).unwrap();

        assert_eq!(dispatcher.tick(day(0)).await.unwrap().sent, 1);
        // Same reference time again: the task is no longer pending.
        let report = dispatcher.tick(day(0)).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(mailer.subjects().len(), 1);
    }

    #[tokio::test]
    async fn mid_sequence_failure_does_not_block_later_tasks() {
        let mailer = FakeMailer::failing_on("Application Update");
        let (db, sequencer, dispatcher, cid) = setup(mailer.clone());
        sequencer.trigger_and_enqueue(&db, cid, day(0)).unwrap();

        // All three due at once; processed in sequence order.
        let report = dispatcher.tick(day(6)).await.unwrap();
        assert_eq!((report.attempted, report.sent, report.failed), (3, 2, 1));

        let tasks = db.candidate_tasks(cid).unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Sent);
        assert_eq!(tasks[1].status, TaskStatus::Failed);
        assert_eq!(tasks[2].status, TaskStatus::Sent);

        // Task 3 went out even though task 2 failed.
        let subjects = mailer.subjects();
        assert!(subjects[0].starts_with("Welcome"));
        assert!(subjects[1].starts_with("Final Steps"));
    }

    #[tokio::test]
    async fn failed_task_is_never_reattempted() {
        let mailer = FakeMailer::failing();
        let (db, sequencer, dispatcher, cid) = setup(mailer);
        sequencer.trigger_and_enqueue(&db, cid, day(0)).unwrap();

        let report = dispatcher.tick(day(0)).await.unwrap();
        assert_eq!((report.attempted, report.sent, report.failed), (1, 0, 1));

        let history = db.history(cid).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome, DeliveryOutcome::Failed);
        assert!(history[0].error_detail.as_deref().unwrap().contains("connection refused"));

        // Next day: the failed task stays failed, no new attempt or log row.
        let report = dispatcher.tick(day(1)).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(db.history(cid).unwrap().len(), 1);
        let stats = db.candidate_stats(cid).unwrap();
        assert_eq!(stats.failed, 1);
    }

    /// Mailer that simulates a concurrent dispatcher claiming the task
    /// between fetch and mark.
    struct RacingMailer {
        db: Arc<OutreachDb>,
    }

    #[async_trait]
    impl Mailer for RacingMailer {
        fn name(&self) -> &str {
            "racing"
        }

        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<()> {
            // The "other" process wins every task while we are mid-send.
            for task in self.db.fetch_due(day(30)).unwrap() {
                self.db.mark_result(task.id, DeliveryOutcome::Sent).unwrap();
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn lost_race_counts_nothing_and_logs_nothing() {
        let db = Arc::new(OutreachDb::open_in_memory().unwrap());
        let cid = db.add_candidate("Jane", "jane@example.com", "Engineer").unwrap();
        let sequencer = Sequencer::new(SequenceDefinition::default());
        sequencer.trigger_and_enqueue(&db, cid, day(0)).unwrap();

        let dispatcher = Dispatcher::new(
            db.clone(),
            Arc::new(RacingMailer { db: db.clone() }),
            SequenceDefinition::default(),
        );
        let report = dispatcher.tick(day(0)).await.unwrap();

        // The task went terminal under us: benign race, zero counts.
        assert_eq!(report, TickReport::default());
        assert!(db.history(cid).unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_candidate_at_send_time_fails_the_task() {
        let mailer = FakeMailer::recording();
        let (db, sequencer, dispatcher, cid) = setup(mailer);
        let jane = db.get_candidate(cid).unwrap();

        // Tasks reference a candidate id that was never persisted.
        let mut orphan = jane.clone();
        orphan.id = 999;
        let tasks = sequencer.trigger(&orphan, day(0));
        db.enqueue(&tasks).unwrap();

        let report = dispatcher.tick(day(0)).await.unwrap();
        assert_eq!((report.sent, report.failed), (0, 1));
        let history = db.history(999).unwrap();
        assert!(history[0].error_detail.as_deref().unwrap().contains("no longer exists"));
    }
}
