//! Outbound email notifications.
//!
//! Request handlers only enqueue messages; a background task owns delivery so a
//! slow or failing SMTP server never blocks or fails the request that caused it.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use thiserror::Error;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

use crate::config::SmtpConfig;

const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(message.to.clone()))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

/// Stand-in when SMTP is not configured; messages are logged and dropped.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "smtp not configured, email dropped");
        Ok(())
    }
}

/// Handle used by request handlers to queue outbound email.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<EmailMessage>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::Receiver<EmailMessage>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        (Self { tx }, rx)
    }

    /// Create a notifier whose queue is drained by a background task.
    pub fn spawn(mailer: Arc<dyn Mailer>) -> (Self, JoinHandle<()>) {
        let (notifier, rx) = Self::channel();
        let worker = tokio::spawn(run_worker(rx, mailer));
        (notifier, worker)
    }

    pub fn enqueue(&self, message: EmailMessage) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                tracing::warn!(to = %message.to, subject = %message.subject, "email queue full, message dropped");
            }
            Err(TrySendError::Closed(message)) => {
                tracing::error!(to = %message.to, subject = %message.subject, "email worker stopped, message dropped");
            }
        }
    }

    pub fn welcome(&self, to: &str, name: &str) {
        self.enqueue(EmailMessage {
            to: to.to_string(),
            subject: "Welcome to Smart Local Commerce".to_string(),
            body: format!(
                "Welcome {name}!\n\nThank you for registering with Smart Local Commerce. \
                 You can now browse local products, shop from local stores and enjoy exclusive promotions.\n\n\
                 Happy shopping!\nSmart Local Commerce Team"
            ),
        });
    }

    /// One job per recipient, so one bad address cannot hold back the others.
    pub fn shop_created(&self, shop_name: &str, location: &str, recipients: &[String]) {
        for to in recipients {
            self.enqueue(EmailMessage {
                to: to.clone(),
                subject: format!("New shop: {shop_name}"),
                body: format!(
                    "The shop \"{shop_name}\" ({location}) has just been registered on Smart Local Commerce."
                ),
            });
        }
    }
}

pub async fn run_worker(mut rx: mpsc::Receiver<EmailMessage>, mailer: Arc<dyn Mailer>) {
    while let Some(message) = rx.recv().await {
        match mailer.send(&message).await {
            Ok(()) => {
                tracing::debug!(to = %message.to, subject = %message.subject, "email sent");
            }
            Err(err) => {
                tracing::error!(
                    to = %message.to,
                    subject = %message.subject,
                    error = %err,
                    "email delivery failed"
                );
            }
        }
    }
    tracing::debug!("email worker stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingMailer {
        delivered: Mutex<Vec<String>>,
        attempts: Mutex<usize>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
            *self.attempts.lock().unwrap() += 1;
            if message.to.starts_with("broken") {
                return Err(EmailError::InvalidAddress(message.to.clone()));
            }
            self.delivered.lock().unwrap().push(message.to.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn shop_created_fans_out_and_isolates_failures() {
        let mailer = Arc::new(RecordingMailer::default());
        let (notifier, worker) = Notifier::spawn(mailer.clone());

        notifier.shop_created(
            "Corner Store",
            "Kigali",
            &[
                "owner@shop.test".to_string(),
                "broken-address".to_string(),
                "admin@shop.test".to_string(),
            ],
        );
        drop(notifier);
        worker.await.unwrap();

        assert_eq!(*mailer.attempts.lock().unwrap(), 3);
        assert_eq!(
            *mailer.delivered.lock().unwrap(),
            vec!["owner@shop.test".to_string(), "admin@shop.test".to_string()]
        );
    }

    #[tokio::test]
    async fn welcome_message_is_queued() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.welcome("ana@example.com", "Ana");

        let message = rx.recv().await.unwrap();
        assert_eq!(message.to, "ana@example.com");
        assert!(message.body.contains("Welcome Ana!"));
    }
}
