//! SMTP delivery via lettre's async transport (STARTTLS).

use async_trait::async_trait;

use outreach_core::config::SmtpConfig;
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::Mailer;

/// Sends mail over a real SMTP relay.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        use lettre::{
            message::header::ContentType, message::Mailbox,
            transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
            Message,
        };

        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.from_name, self.config.from_address())
                .parse()
                .map_err(|e| OutreachError::Mailer(format!("Invalid from: {e}")))?;

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| OutreachError::Mailer(format!("Invalid to: {e}")))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| OutreachError::Mailer(format!("Build email: {e}")))?;

        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        let mailer = AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(&self.config.host)
            .map_err(|e| OutreachError::Mailer(format!("SMTP relay: {e}")))?
            .port(self.config.port)
            .credentials(creds)
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| OutreachError::Mailer(format!("SMTP send: {e}")))?;

        tracing::info!(to, "email sent via SMTP");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bad_recipient_address_is_a_mailer_error() {
        let mailer = SmtpMailer::new(SmtpConfig {
            enabled: true,
            username: "hiring@example.com".into(),
            password: "secret".into(),
            ..SmtpConfig::default()
        });
        // Fails at message build, before any network I/O.
        match mailer.send("not-an-address", "Hi", "Body").await {
            Err(OutreachError::Mailer(msg)) => assert!(msg.contains("Invalid to")),
            other => panic!("expected Mailer error, got {other:?}"),
        }
    }
}
