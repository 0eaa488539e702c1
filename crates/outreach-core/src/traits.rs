//! Capability traits — the seams between the engine and the outside world.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Sends (or simulates sending) one rendered email.
///
/// The dispatcher never branches on transport; the binary picks the
/// implementation at startup (SMTP when credentials are configured,
/// console simulation otherwise).
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Implementation name, for logs and reports.
    fn name(&self) -> &str;

    /// Deliver one message. `Err` means the attempt failed and the task
    /// will be marked failed; there is no retry inside the engine.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Source of "now" for the polling loop. Tests pass fixed instants to
/// `tick` directly; only the run loop consults a clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
