use crate::settings::EmailSettings;
use anyhow::{Context, Result};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Something that can tell a human a server went down.
pub trait Notifier {
    fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

pub struct EmailNotifier {
    settings: EmailSettings,
}

impl EmailNotifier {
    pub fn new(settings: EmailSettings) -> Result<Self> {
        if !settings.is_complete() {
            return Err(anyhow::anyhow!(
                "E-mail settings are incomplete. Run with -c -u <user> -p <password> -t <recipient>"
            ));
        }
        Ok(Self { settings })
    }

    pub fn build_message(&self, subject: &str, body: &str) -> Result<Message> {
        let from: Mailbox = self
            .settings
            .username
            .parse()
            .with_context(|| format!("Invalid sender address: {}", self.settings.username))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.settings.recipients {
            let to: Mailbox = recipient
                .parse()
                .with_context(|| format!("Invalid recipient address: {}", recipient))?;
            builder = builder.to(to);
        }

        builder
            .body(body.to_string())
            .context("Failed to build alert message")
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let creds = Credentials::new(
            self.settings.username.clone(),
            self.settings.password.clone(),
        );
        Ok(SmtpTransport::starttls_relay(&self.settings.smtp_host)
            .with_context(|| format!("Invalid SMTP relay: {}", self.settings.smtp_host))?
            .port(self.settings.smtp_port)
            .credentials(creds)
            .build())
    }
}

impl Notifier for EmailNotifier {
    fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(subject, body)?;
        self.transport()?
            .send(&message)
            .with_context(|| format!("SMTP submission to {} failed", self.settings.smtp_host))?;
        log::info!(
            "Alert mailed to {}: {}",
            self.settings.recipients.join(", "),
            subject
        );
        Ok(())
    }
}
