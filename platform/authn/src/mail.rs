use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, warn};

use crate::AuthnError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AuthnError>;
}

#[derive(Clone, Debug, Default)]
pub struct MailSettings {
    pub from: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub use_starttls: bool,
}

/// SMTP when a host is configured, otherwise a mailer that only logs.
pub fn build_mailer(settings: &MailSettings) -> Result<Arc<dyn Mailer>, AuthnError> {
    if settings.smtp_host.trim().is_empty() {
        warn!("SMTP host not configured; confirmation mail will only be logged");
        return Ok(Arc::new(LogMailer::new(&settings.from)));
    }
    Ok(Arc::new(SmtpMailer::new(settings)?))
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self, AuthnError> {
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|_| AuthnError::InvalidMailbox(settings.from.clone()))?;
        let builder = if settings.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
        }
        .map_err(|err| AuthnError::Delivery(err.to_string()))?
        .port(settings.smtp_port);
        let builder = match (&settings.smtp_username, &settings.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AuthnError> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .map_err(|_| AuthnError::InvalidMailbox(mail.to.clone()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|err| AuthnError::Delivery(err.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|err| AuthnError::Delivery(err.to_string()))?;
        Ok(())
    }
}

/// Writes mail to the log instead of delivering it.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AuthnError> {
        info!(
            from = %self.from,
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "mail not delivered (no SMTP host)"
        );
        Ok(())
    }
}

/// Keeps sent mail in memory; used by tests to read confirmation codes.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    pub fn last_to(&self, recipient: &str) -> Option<OutgoingMail> {
        self.sent().into_iter().rev().find(|mail| mail.to == recipient)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AuthnError> {
        self.outbox
            .lock()
            .map_err(|_| AuthnError::Delivery("outbox poisoned".into()))?
            .push(mail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_mailer_records_in_order() {
        let mailer = MemoryMailer::new();
        for subject in ["first", "second"] {
            mailer
                .send(OutgoingMail {
                    to: "ada@example.test".into(),
                    subject: subject.into(),
                    body: String::new(),
                })
                .await
                .unwrap();
        }
        assert_eq!(mailer.sent().len(), 2);
        assert_eq!(mailer.last_to("ada@example.test").unwrap().subject, "second");
        assert!(mailer.last_to("eve@example.test").is_none());
    }

    #[tokio::test]
    async fn missing_host_falls_back_to_log_mailer() {
        let mailer = build_mailer(&MailSettings {
            from: "noreply@yamdb.local".into(),
            ..MailSettings::default()
        })
        .unwrap();
        let sent = mailer
            .send(OutgoingMail {
                to: "ada@example.test".into(),
                subject: "code".into(),
                body: "123".into(),
            })
            .await;
        assert!(sent.is_ok());
    }
}
