//! Sequencer — turns one trigger event into the candidate's task batch.
//!
//! Pure and stateless: it computes the batch and returns it. Deduplication
//! is the queue's job (`OutreachDb::enqueue` rejects a second sequence for
//! the same candidate), so re-trigger races cannot corrupt state here.

use chrono::{DateTime, Utc};

use outreach_core::error::Result;
use outreach_core::sequence::{render, SequenceDefinition};
use outreach_core::types::{Candidate, ScheduledTask, TaskStatus};

use crate::persistence::OutreachDb;

/// Builds scheduled task batches from the configured sequence definition.
pub struct Sequencer {
    definition: SequenceDefinition,
}

impl Sequencer {
    pub fn new(definition: SequenceDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &SequenceDefinition {
        &self.definition
    }

    /// Compute the task batch for one candidate, anchored at `trigger_time`.
    ///
    /// Subjects are rendered now; bodies are deferred to send time via
    /// `body_key`. No side effects — the caller persists the batch.
    pub fn trigger(&self, candidate: &Candidate, trigger_time: DateTime<Utc>) -> Vec<ScheduledTask> {
        self.definition
            .steps()
            .iter()
            .map(|step| ScheduledTask {
                id: 0,
                candidate_id: candidate.id,
                sequence_index: step.sequence_index,
                scheduled_for: trigger_time + step.delay,
                status: TaskStatus::Pending,
                subject: render(&step.subject_template, &candidate.name, &candidate.position),
                body_key: step.body_key.clone(),
                created_at: trigger_time,
            })
            .collect()
    }

    /// Operator entry point: validate the candidate, build the batch, and
    /// write it through to the queue as one transaction.
    pub fn trigger_and_enqueue(
        &self,
        db: &OutreachDb,
        candidate_id: i64,
        trigger_time: DateTime<Utc>,
    ) -> Result<Vec<ScheduledTask>> {
        let candidate = db.get_candidate(candidate_id)?;
        let tasks = self.trigger(&candidate, trigger_time);
        db.enqueue(&tasks)?;
        tracing::info!(
            candidate = %candidate.name,
            tasks = tasks.len(),
            "outreach sequence scheduled"
        );
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use outreach_core::error::OutreachError;

    fn jane() -> Candidate {
        Candidate {
            id: 7,
            name: "Jane".into(),
            email: "jane@example.com".into(),
            position: "Staff Engineer".into(),
            status: "active".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn trigger_builds_n_pending_tasks_with_increasing_schedule() {
        let sequencer = Sequencer::new(SequenceDefinition::default());
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let tasks = sequencer.trigger(&jane(), t0);

        assert_eq!(tasks.len(), 3);
        for (i, task) in tasks.iter().enumerate() {
            assert_eq!(task.sequence_index, i as u32 + 1);
            assert_eq!(task.status, TaskStatus::Pending);
            assert_eq!(task.candidate_id, 7);
        }
        assert!(tasks.windows(2).all(|w| w[0].scheduled_for < w[1].scheduled_for));
        assert_eq!(tasks[0].scheduled_for, t0);
        assert_eq!(tasks[2].scheduled_for, t0 + chrono::Duration::days(5));
    }

    #[test]
    fn subjects_rendered_at_trigger_time() {
        let sequencer = Sequencer::new(SequenceDefinition::default());
        let tasks = sequencer.trigger(&jane(), Utc::now());
        assert_eq!(tasks[0].subject, "Welcome to Our Recruitment Process - Jane");
        assert_eq!(tasks[2].subject, "Final Steps - Staff Engineer Opportunity");
        // Bodies stay deferred.
        assert_eq!(tasks[0].body_key, "welcome");
    }

    #[test]
    fn trigger_and_enqueue_rejects_unknown_candidate() {
        let db = OutreachDb::open_in_memory().unwrap();
        let sequencer = Sequencer::new(SequenceDefinition::default());
        match sequencer.trigger_and_enqueue(&db, 42, Utc::now()) {
            Err(OutreachError::CandidateNotFound(42)) => {}
            other => panic!("expected CandidateNotFound, got {other:?}"),
        }
    }

    #[test]
    fn re_trigger_fails_with_duplicate_sequence() {
        let db = OutreachDb::open_in_memory().unwrap();
        let cid = db.add_candidate("Jane", "jane@example.com", "Engineer").unwrap();
        let sequencer = Sequencer::new(SequenceDefinition::default());
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        sequencer.trigger_and_enqueue(&db, cid, t0).unwrap();
        match sequencer.trigger_and_enqueue(&db, cid, t0 + chrono::Duration::days(1)) {
            Err(OutreachError::DuplicateSequence(id)) => assert_eq!(id, cid),
            other => panic!("expected DuplicateSequence, got {other:?}"),
        }
        assert_eq!(db.candidate_tasks(cid).unwrap().len(), 3);
    }
}
