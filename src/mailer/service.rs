//! Mailer: renders a template and hands the result to a transport

use std::sync::Arc;

use serde_json::Value;

use crate::config::MailerConfig;
use crate::error::{MailerError, Result};
use crate::template::{CompiledEmail, EngineConfig, LocaleSet, TemplateEngine};
use crate::transport::{create_transport, DeliveryResult, OutgoingMessage, Transport, TransportKind};

use super::request::SendMailRequest;

/// Envelope and bodies produced for a request, before delivery
#[derive(Debug, Clone)]
pub struct PreparedMail {
    pub message: OutgoingMessage,
    pub compiled: CompiledEmail,
}

pub struct Mailer {
    config: MailerConfig,
    engine: TemplateEngine,
    transport: Arc<dyn Transport>,
}

impl Mailer {
    /// Build a mailer around an existing transport. Locales are scanned once here.
    pub fn new(config: MailerConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let engine = TemplateEngine::new(EngineConfig::from(&config))?;
        Ok(Self {
            config,
            engine,
            transport,
        })
    }

    /// Build a mailer with the transport named in `config`.
    pub fn from_config(config: MailerConfig) -> Result<Self> {
        let transport = create_transport(&config)?;
        Self::new(config, transport)
    }

    pub fn config(&self) -> &MailerConfig {
        &self.config
    }

    pub fn locales(&self) -> &LocaleSet {
        self.engine.locales()
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn compile(&self, template: &str, data: &Value, locale: &str) -> Result<CompiledEmail> {
        self.engine.compile(template, data, locale)
    }

    pub fn compile_html_body(&self, template: &str, data: &Value, locale: &str) -> Result<String> {
        self.engine.compile_html_body(template, data, locale)
    }

    pub fn compile_plain_body(&self, html: &str) -> String {
        self.engine.compile_plain_body(html)
    }

    /// Front-matter subject wins over the caller's; either may use `{{vars}}`.
    fn resolve_subject(&self, request: &SendMailRequest, compiled: &CompiledEmail) -> Result<String> {
        let subject = compiled
            .meta
            .subject()
            .or(request.subject.as_deref())
            .unwrap_or_default();

        let subject = if subject.contains("{{") {
            self.engine.render_header(subject, &request.data)?
        } else {
            subject.to_string()
        };

        let subject = subject.trim().to_string();
        if subject.is_empty() {
            return Err(MailerError::validation("subject is required"));
        }
        Ok(subject)
    }

    /// Validate and render a request without sending it.
    pub fn prepare(&self, request: &SendMailRequest) -> Result<PreparedMail> {
        request.validate()?;

        let compiled = self.compile(&request.template, &request.data, &request.locale)?;
        let plain = self.compile_plain_body(&compiled.html);
        let subject = self.resolve_subject(request, &compiled)?;

        // a caller supplied from address is authenticated through Sender
        let (from, sender) = match request.from.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            Some(from) => (from.to_string(), Some(self.config.sender.clone())),
            None => (self.config.sender.clone(), None),
        };

        let message = OutgoingMessage {
            from,
            sender,
            to: request.to.addresses(),
            cc: request.cc_addresses(),
            bcc: request.bcc_addresses(),
            subject,
            html: compiled.html.clone(),
            plain,
            attachments: request.attachments.iter().cloned().map(Into::into).collect(),
        };

        Ok(PreparedMail { message, compiled })
    }

    /// Render a template and deliver it.
    #[tracing::instrument(
        name = "mailer.send",
        skip(self, request),
        fields(template = %request.template, locale = %request.locale, transport = %self.transport.kind())
    )]
    pub async fn send_mail(&self, request: SendMailRequest) -> Result<DeliveryResult> {
        let prepared = match self.prepare(&request) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!(error = %e, "Mail rejected before delivery");
                return Err(e);
            }
        };

        match self.transport.deliver(&prepared.message).await {
            Ok(result) => {
                tracing::info!(
                    message_id = ?result.message_id,
                    recipients = result.recipients.len(),
                    attachments = prepared.message.attachments.len(),
                    "Mail delivered"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, "Mail delivery failed");
                Err(e)
            }
        }
    }

    /// Parse a JSON request and send it.
    pub async fn send_json(&self, request: Value) -> Result<DeliveryResult> {
        self.send_mail(SendMailRequest::from_json(request)?).await
    }
}
