//! # Outreach Core
//!
//! Shared foundation for the candidate outreach sequencer:
//! - Error taxonomy and crate-wide `Result` alias
//! - TOML configuration (`~/.outreach/config.toml`)
//! - Data model: candidates, scheduled tasks, delivery log entries
//! - Sequence definition + template rendering
//! - Capability traits: `Mailer` (SMTP or console simulation), `Clock`

pub mod config;
pub mod error;
pub mod sequence;
pub mod traits;
pub mod types;

pub use config::OutreachConfig;
pub use error::{OutreachError, Result};
pub use sequence::{SequenceDefinition, SequenceStep};
pub use traits::{Clock, Mailer, SystemClock};
pub use types::{
    Candidate, CandidateStats, DeliveryLogEntry, DeliveryOutcome, ScheduledTask, TaskStatus,
    TickReport,
};
