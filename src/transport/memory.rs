//! In-memory transport.
//!
//! Records every delivered message instead of sending it. Messages are lost
//! when the transport is dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

use super::{DeliveryResult, OutgoingMessage, Transport, TransportKind};

/// A message recorded by [`MemoryTransport`]
#[derive(Debug, Clone, Serialize)]
pub struct SentMessage {
    pub id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub message: OutgoingMessage,
}

#[derive(Default)]
pub struct MemoryTransport {
    sent: RwLock<Vec<SentMessage>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, oldest first
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.sent.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sent.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.sent.write().await.clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Memory
    }

    async fn deliver(&self, message: &OutgoingMessage) -> Result<DeliveryResult> {
        let record = SentMessage {
            id: Uuid::new_v4(),
            sent_at: Utc::now(),
            message: message.clone(),
        };

        let result = DeliveryResult {
            transport: TransportKind::Memory,
            message_id: Some(record.id.to_string()),
            recipients: message.recipients(),
            raw: serde_json::to_value(&record)?,
        };

        let mut sent = self.sent.write().await;
        sent.push(record);

        tracing::debug!(
            message_id = ?result.message_id,
            total = sent.len(),
            "Message recorded"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> OutgoingMessage {
        OutgoingMessage {
            from: "noreply@example.com".into(),
            sender: None,
            to: vec![to.into()],
            cc: vec![],
            bcc: vec![],
            subject: "Hi".into(),
            html: "<p>Hi</p>".into(),
            plain: "Hi".into(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_records_messages_in_order() {
        let transport = MemoryTransport::new();
        assert!(transport.is_empty().await);

        let first = transport.deliver(&message("a@example.com")).await.unwrap();
        transport.deliver(&message("b@example.com")).await.unwrap();

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message.to, vec!["a@example.com"]);
        assert_eq!(first.message_id, Some(sent[0].id.to_string()));
        assert_eq!(first.transport, TransportKind::Memory);
        assert_eq!(first.raw["message"]["subject"], "Hi");
    }

    #[tokio::test]
    async fn test_clear() {
        let transport = MemoryTransport::new();
        transport.deliver(&message("a@example.com")).await.unwrap();
        transport.clear().await;
        assert_eq!(transport.len().await, 0);
    }
}
