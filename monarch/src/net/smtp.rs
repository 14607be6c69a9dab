//! The outbound-mail boundary. [`InMemoryMailer`] records every message
//! sent through it instead of opening a socket, for tests and demos that
//! need to assert a notification went out without a real mail relay.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct Message {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("no recipients")]
    NoRecipients,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), MailError>;
}

/// Accepts any message with at least one recipient and appends it to an
/// in-memory log.
#[derive(Clone, Default)]
pub struct InMemoryMailer {
    sent: Arc<Mutex<Vec<Message>>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        InMemoryMailer::default()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sent_message_is_recorded() {
        let mailer = InMemoryMailer::new();
        mailer
            .send(Message {
                from: "kernel@monarch".to_string(),
                to: vec!["ops@example.invalid".to_string()],
                subject: "module load failed".to_string(),
                body: "see logs".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn message_without_recipients_is_rejected() {
        let mailer = InMemoryMailer::new();
        let err = mailer
            .send(Message {
                from: "kernel@monarch".to_string(),
                to: Vec::new(),
                subject: "".to_string(),
                body: "".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::NoRecipients));
    }
}
