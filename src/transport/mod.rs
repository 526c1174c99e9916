//! Mail transports.
//!
//! A [`Transport`] takes a fully rendered [`OutgoingMessage`] and hands it to
//! a delivery backend:
//! - `gateway`: the transactional mail server's HTTP API
//! - `smtp`: direct SMTP submission via lettre
//! - `memory`: records messages in process (tests, dry runs)

mod factory;
mod gateway;
mod memory;
mod smtp;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use factory::create_transport;
pub use gateway::{build_payload, parse_response, GatewayTransport};
pub use memory::{MemoryTransport, SentMessage};
pub use smtp::SmtpTransport;

/// Which backend delivers mail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    #[serde(alias = "postal")]
    Gateway,
    Smtp,
    Memory,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Gateway => "gateway",
            TransportKind::Smtp => "smtp",
            TransportKind::Memory => "memory",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageAttachment {
    pub filename: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub from: String,
    /// Authenticated sending address, set when `from` was caller supplied
    pub sender: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub html: String,
    pub plain: String,
    pub attachments: Vec<MessageAttachment>,
}

impl OutgoingMessage {
    /// Every envelope recipient: to, cc and bcc
    pub fn recipients(&self) -> Vec<String> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .cloned()
            .collect()
    }
}

/// What a transport reports after accepting a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryResult {
    pub transport: TransportKind,
    pub message_id: Option<String>,
    /// Addresses the backend accepted
    pub recipients: Vec<String>,
    /// Backend response as returned
    pub raw: serde_json::Value,
}

/// Delivery backend
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn deliver(&self, message: &OutgoingMessage) -> Result<DeliveryResult>;
}
