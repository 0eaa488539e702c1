//! Console mailer — simulation mode.
//!
//! Prints the rendered email instead of sending it and always reports
//! success, so the full scheduling pipeline can run without SMTP
//! credentials.

use async_trait::async_trait;

use outreach_core::error::Result;
use outreach_core::traits::Mailer;

#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let preview: String = body.chars().take(100).collect();
        println!("SIMULATED EMAIL");
        println!("   To: {to}");
        println!("   Subject: {subject}");
        println!("   Body: {preview}...");
        tracing::info!(to, subject, "simulated email delivery");
        Ok(())
    }
}
