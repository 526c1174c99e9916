//! HTTP API transport for the transactional mail server.
//!
//! Messages are submitted as JSON to `/api/v1/send/message`, authenticated
//! with the server API key. Payload construction and response parsing are
//! plain functions so they can be checked without a network.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::config::MailerConfig;
use crate::error::{MailerError, Result};

use super::{DeliveryResult, OutgoingMessage, Transport, TransportKind};

const SEND_PATH: &str = "/api/v1/send/message";
const API_KEY_HEADER: &str = "X-Server-API-Key";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct GatewayAttachment {
    pub name: String,
    pub content_type: String,
    /// Base64 encoded content
    pub data: String,
}

/// JSON body of a send request
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct GatewayPayload {
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<GatewayAttachment>,
}

pub fn build_payload(message: &OutgoingMessage) -> GatewayPayload {
    GatewayPayload {
        to: message.to.clone(),
        cc: message.cc.clone(),
        bcc: message.bcc.clone(),
        from: message.from.clone(),
        sender: message.sender.clone(),
        subject: message.subject.clone(),
        plain_body: message.plain.clone(),
        html_body: message.html.clone(),
        attachments: message
            .attachments
            .iter()
            .map(|a| GatewayAttachment {
                name: a.filename.clone(),
                content_type: a.content_type.clone(),
                data: STANDARD.encode(&a.content),
            })
            .collect(),
    }
}

/// Interpret the server's `{status, data}` envelope.
pub fn parse_response(body: Value) -> Result<DeliveryResult> {
    let status = body.get("status").and_then(Value::as_str).unwrap_or("");

    if status != "success" {
        let message = body
            .pointer("/data/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("unexpected response status '{}'", status));
        return Err(MailerError::transport(TransportKind::Gateway, message));
    }

    let message_id = body
        .pointer("/data/message_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let recipients = body
        .pointer("/data/messages")
        .and_then(Value::as_object)
        .map(|messages| messages.keys().cloned().collect())
        .unwrap_or_default();

    Ok(DeliveryResult {
        transport: TransportKind::Gateway,
        message_id,
        recipients,
        raw: body,
    })
}

/// Base URL for a configured server; bare hosts get `https://`.
fn base_url(server: &str) -> String {
    let server = server.trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    }
}

pub struct GatewayTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GatewayTransport {
    pub fn new(server: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailerError::transport(TransportKind::Gateway, e))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url(server), SEND_PATH),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &MailerConfig) -> Result<Self> {
        let server = config
            .server
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MailerError::validation("gateway transport requires a server"))?;
        let key = config
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MailerError::validation("gateway transport requires an API key"))?;

        Self::new(server, key, Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for GatewayTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Gateway
    }

    async fn deliver(&self, message: &OutgoingMessage) -> Result<DeliveryResult> {
        let payload = build_payload(message);

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailerError::transport(TransportKind::Gateway, format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::transport(
                TransportKind::Gateway,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let body: Value = response.json().await.map_err(|e| {
            MailerError::transport(TransportKind::Gateway, format!("Failed to parse response: {}", e))
        })?;

        parse_response(body)
    }
}
