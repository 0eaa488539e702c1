//! # Outreach Mailer
//!
//! The two `Mailer` implementations the binary chooses between at startup:
//! - [`SmtpMailer`] — real delivery over async SMTP (STARTTLS).
//! - [`ConsoleMailer`] — simulation mode: prints the rendered mail and
//!   always reports success. Selected automatically whenever SMTP
//!   credentials are not configured.

pub mod console;
pub mod smtp;

use std::sync::Arc;

use outreach_core::config::SmtpConfig;
use outreach_core::traits::Mailer;

pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;

/// Pick the mailer for this process from config. The engine itself never
/// branches on transport.
pub fn from_config(config: &SmtpConfig) -> Arc<dyn Mailer> {
    if config.is_configured() {
        Arc::new(SmtpMailer::new(config.clone()))
    } else {
        tracing::warn!("SMTP credentials not configured — running in simulation mode");
        Arc::new(ConsoleMailer::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_smtp_falls_back_to_console() {
        let mailer = from_config(&SmtpConfig::default());
        assert_eq!(mailer.name(), "console");
    }

    #[test]
    fn configured_smtp_selects_real_transport() {
        let config = SmtpConfig {
            enabled: true,
            username: "hiring@example.com".into(),
            password: "secret".into(),
            ..SmtpConfig::default()
        };
        let mailer = from_config(&config);
        assert_eq!(mailer.name(), "smtp");
    }
}
