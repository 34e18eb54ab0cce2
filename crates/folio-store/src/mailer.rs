//! Mail notifiers
//!
//! Delivery itself lives outside Folio. `LogMailer` writes each message to the
//! log for an external relay or for development; `MemoryMailer` keeps them for
//! inspection in tests.

use async_trait::async_trait;
use folio_core::{MailError, Mailer};
use serde::Serialize;
use tokio::sync::Mutex;

fn check_recipient(recipient: &str) -> Result<(), MailError> {
    let valid = recipient
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(MailError::InvalidRecipient(recipient.to_string()))
    }
}

/// Logs every message at info level
#[derive(Debug, Clone)]
pub struct LogMailer {
    from_address: String,
}

impl LogMailer {
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        data: serde_json::Value,
    ) -> Result<(), MailError> {
        check_recipient(recipient)?;

        tracing::info!(
            target: "mail",
            from = %self.from_address,
            to = %recipient,
            template = %template,
            data = %data,
            "Mail queued"
        );

        Ok(())
    }
}

/// A message captured by `MemoryMailer`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentMail {
    pub template: String,
    pub recipient: String,
    pub data: serde_json::Value,
}

/// Records messages instead of sending them
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }

    /// Most recent message for `recipient`
    pub async fn last_to(&self, recipient: &str) -> Option<SentMail> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.recipient == recipient)
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        data: serde_json::Value,
    ) -> Result<(), MailError> {
        check_recipient(recipient)?;

        self.sent.lock().await.push(SentMail {
            template: template.to_string(),
            recipient: recipient.to_string(),
            data,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_mailer_records() {
        let mailer = MemoryMailer::new();
        mailer
            .send("forgot_password", "jane@example.com", json!({"token": "abc"}))
            .await
            .unwrap();

        let last = mailer.last_to("jane@example.com").await.unwrap();
        assert_eq!(last.template, "forgot_password");
        assert_eq!(last.data["token"], "abc");
        assert_eq!(mailer.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let mailer = LogMailer::new("no-reply@folio.local");
        let result = mailer.send("change_password", "not-an-email", json!({})).await;
        assert!(matches!(result, Err(MailError::InvalidRecipient(_))));
    }
}
