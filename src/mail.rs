use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::MailConfig;
use crate::models::{Frequency, TransactionKind, flexible_date};

pub const REMINDER_SUBJECT: &str = "Upcoming Recurring Payment Reminders";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("mail relay rejected the message: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
            }
            _ => tracing::warn!(host = %config.smtp_host, "SMTP credentials not set, sending unauthenticated"),
        }
        let from = format!("Finance Tracker <{}>", config.from_address)
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(e.to_string()))?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(e.to_string()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))?;
        let response = self.transport.send(message).await?;
        tracing::info!(code = %response.code(), "reminder email accepted by relay");
        Ok(())
    }
}

/// Keeps every message in memory instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    reject: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose relay refuses everything.
    pub fn rejecting() -> Self {
        Self {
            sent: Mutex::default(),
            reject: true,
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.reject {
            return Err(MailError::Rejected(format!("550 mailbox unavailable: {}", email.to)));
        }
        self.sent.lock().await.push(email);
        Ok(())
    }
}

/// One line of a reminder email.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Reminder {
    pub name: String,
    pub amount: Decimal,
    #[serde(deserialize_with = "flexible_date::deserialize")]
    pub due_date: DateTime<Utc>,
    pub frequency: Frequency,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

pub fn reminder_text(reminders: &[Reminder], currency: &str) -> String {
    reminders
        .iter()
        .map(|r| {
            format!(
                "{} ({}) of {}{} due on {} ({})",
                r.name,
                r.kind,
                currency,
                r.amount.normalize(),
                r.due_date.format("%d %b %Y"),
                r.frequency
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn reminder_html(text: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; background: #f8f9fa; padding: 24px; border-radius: 12px; border: 1px solid #e0e0e0;">
  <h2 style="color: #4f46e5;">Finance Tracker Reminder</h2>
  <p>Dear user,</p>
  <p>This is a friendly reminder from <b>Finance Tracker</b> about your upcoming recurring payments:</p>
  <pre style="background: #fff; padding: 16px; border-radius: 8px; border: 1px solid #e5e7eb; color: #222;">{}</pre>
  <p>Please ensure timely payment to avoid any inconvenience.</p>
  <p style="margin-top: 32px; color: #888; font-size: 13px;">This is an automated message from Finance Tracker.</p>
</div>"#,
        escape_html(text)
    )
}

pub fn reminder_email(to: &str, reminders: &[Reminder], currency: &str) -> OutgoingEmail {
    let text = reminder_text(reminders, currency);
    OutgoingEmail {
        to: to.to_string(),
        subject: REMINDER_SUBJECT.to_string(),
        html: reminder_html(&text),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rent() -> Reminder {
        Reminder {
            name: "Rent <flat>".to_string(),
            amount: Decimal::new(150000, 2),
            due_date: Utc.with_ymd_and_hms(2024, 4, 10, 0, 0, 0).unwrap(),
            frequency: Frequency::Monthly,
            kind: TransactionKind::Expense,
        }
    }

    #[test]
    fn text_lists_one_line_per_reminder() {
        let mut gym = rent();
        gym.name = "Gym".to_string();
        gym.frequency = Frequency::Weekly;
        let text = reminder_text(&[rent(), gym], "₹");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Rent <flat> (expense) of ₹1500 due on 10 Apr 2024 (monthly)");
        assert!(lines[1].ends_with("(weekly)"));
    }

    #[test]
    fn html_escapes_user_text() {
        let email = reminder_email("me@example.com", &[rent()], "$");
        assert_eq!(email.subject, REMINDER_SUBJECT);
        assert!(email.html.contains("Rent &lt;flat&gt;"));
        assert!(!email.html.contains("<flat>"));
        assert!(email.text.contains("<flat>"));
    }

    #[tokio::test]
    async fn recording_mailer_keeps_messages() {
        let mailer = RecordingMailer::new();
        mailer
            .send(reminder_email("me@example.com", &[rent()], "$"))
            .await
            .unwrap();
        assert_eq!(mailer.sent().await.len(), 1);

        let refusing = RecordingMailer::rejecting();
        assert!(refusing
            .send(reminder_email("me@example.com", &[rent()], "$"))
            .await
            .is_err());
    }
}
