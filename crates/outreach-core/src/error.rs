//! Error taxonomy for the outreach engine.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, OutreachError>;

/// All errors the outreach engine surfaces.
#[derive(Debug, Error)]
pub enum OutreachError {
    /// A sequence is already scheduled for this candidate.
    #[error("candidate {0} already has a scheduled sequence")]
    DuplicateSequence(i64),

    /// Attempted to transition a task that is no longer pending.
    /// Benign under concurrent dispatch — the other caller won the task.
    #[error("task {0} is not pending")]
    InvalidTransition(i64),

    /// Candidate lookup failed.
    #[error("candidate {0} not found")]
    CandidateNotFound(i64),

    /// Mail transport failure (SMTP rejection, connection error, bad address).
    #[error("mail delivery failed: {0}")]
    Mailer(String),

    /// Durable store I/O failure. Fatal to the current operation.
    #[error("storage: {0}")]
    Storage(String),

    /// Configuration load/parse failure.
    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OutreachError {
    /// True for the documented benign race: a task claimed by another tick.
    pub fn is_benign_race(&self) -> bool {
        matches!(self, OutreachError::InvalidTransition(_))
    }
}
