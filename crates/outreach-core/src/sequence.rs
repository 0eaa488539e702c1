//! Sequence definition — the static description of the outreach campaign.
//!
//! A sequence is an ordered list of steps; each step carries its delay from
//! the trigger instant and its subject/body templates. Loaded once at
//! startup, read-only afterwards. The default is the standard three-step
//! recruitment flow (day 0, day 2, day 5).

use chrono::Duration;

/// One step of the outreach sequence.
#[derive(Debug, Clone)]
pub struct SequenceStep {
    /// 1-based position within the sequence.
    pub sequence_index: u32,
    /// Offset from the trigger instant.
    pub delay: Duration,
    pub subject_template: String,
    /// Stable key used to look the body template up again at send time.
    pub body_key: String,
    pub body_template: String,
}

/// The full, ordered sequence definition.
#[derive(Debug, Clone)]
pub struct SequenceDefinition {
    steps: Vec<SequenceStep>,
}

impl SequenceDefinition {
    /// Build a definition from pre-ordered steps.
    pub fn new(steps: Vec<SequenceStep>) -> Self {
        Self { steps }
    }

    /// The built-in three-step recruitment sequence, optionally with
    /// operator-overridden day offsets (one per step, ascending).
    pub fn builtin(delay_days: Option<&[i64]>) -> Self {
        let delays = match delay_days {
            Some(d) if d.len() == 3 => [d[0], d[1], d[2]],
            _ => [0, 2, 5],
        };
        Self::new(vec![
            SequenceStep {
                sequence_index: 1,
                delay: Duration::days(delays[0]),
                subject_template: "Welcome to Our Recruitment Process - {candidate_name}".into(),
                body_key: "welcome".into(),
                body_template: WELCOME_BODY.into(),
            },
            SequenceStep {
                sequence_index: 2,
                delay: Duration::days(delays[1]),
                subject_template: "Application Update - Next Steps for {candidate_name}".into(),
                body_key: "next_steps".into(),
                body_template: NEXT_STEPS_BODY.into(),
            },
            SequenceStep {
                sequence_index: 3,
                delay: Duration::days(delays[2]),
                subject_template: "Final Steps - {position} Opportunity".into(),
                body_key: "final_steps".into(),
                body_template: FINAL_STEPS_BODY.into(),
            },
        ])
    }

    pub fn steps(&self) -> &[SequenceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look a step up by its body key (used at send time).
    pub fn step_by_body_key(&self, key: &str) -> Option<&SequenceStep> {
        self.steps.iter().find(|s| s.body_key == key)
    }
}

impl Default for SequenceDefinition {
    fn default() -> Self {
        Self::builtin(None)
    }
}

/// Substitute `{candidate_name}` and `{position}` into a template.
pub fn render(template: &str, candidate_name: &str, position: &str) -> String {
    template
        .replace("{candidate_name}", candidate_name)
        .replace("{position}", position)
}

const WELCOME_BODY: &str = "\
Hi {candidate_name},

Thank you for your interest in the {position} position at our company!

We're excited to move forward with your application. This email confirms that \
we've received your application and our team will be reviewing it shortly.

What's next:
- Our hiring team will review your application
- We'll reach out within the next few days with updates
- Please feel free to reply if you have any questions

Best regards,
The Hiring Team";

const NEXT_STEPS_BODY: &str = "\
Hi {candidate_name},

I hope this email finds you well!

We've completed our initial review of your application for the {position} \
role, and we're impressed with your background.

Next steps:
- We'd like to schedule a brief phone screening
- Please reply with your availability for this week
- The call will take approximately 30 minutes

We're looking forward to learning more about you and discussing how you might \
fit into our team.

Best regards,
The Hiring Team";

const FINAL_STEPS_BODY: &str = "\
Hi {candidate_name},

Thank you for the great conversation during our phone screening!

We're moving to the final stages of our process for the {position} role. \
Based on our discussion, we believe you could be a great fit for our team.

Final steps:
- Technical interview/presentation (1 hour)
- Meet with team members (30 minutes)
- Final decision within 48 hours after the interview

Please let us know your availability for next week, and we'll coordinate the \
schedule.

Excited to continue this process with you!

Best regards,
The Hiring Team";
