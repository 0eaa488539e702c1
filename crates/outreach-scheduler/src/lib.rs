//! # Outreach Scheduler
//!
//! The scheduling and delivery-queue engine. Given a candidate, the
//! [`Sequencer`] produces the time-deferred email tasks of the outreach
//! sequence; [`OutreachDb`] records them durably; the [`Dispatcher`] polls
//! for due tasks, hands each one to the configured `Mailer` exactly once,
//! and writes the outcome back.
//!
//! ## Architecture
//! ```text
//! Sequencer.trigger(candidate, t0)
//!   └── OutreachDb.enqueue([task1 @ t0, task2 @ t0+2d, task3 @ t0+5d])
//!
//! Dispatcher.tick(now)                 (tokio interval in `outreach run`)
//!   ├── OutreachDb.fetch_due(now)      oldest first, sequence order
//!   ├── Mailer.send(to, subject, body) one attempt per task, sequential
//!   └── mark_result + delivery_log     at-most-once via pending-only UPDATE
//! ```
//!
//! Re-running a tick never double-sends: the status transition is guarded
//! in SQL, so a task already claimed by another tick is simply skipped.

pub mod dispatcher;
pub mod persistence;
pub mod sequencer;

pub use dispatcher::Dispatcher;
pub use persistence::OutreachDb;
pub use sequencer::Sequencer;
