//! SMTP transport using lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use crate::config::{MailerConfig, SmtpTls};
use crate::error::{MailerError, Result};

use super::{DeliveryResult, OutgoingMessage, Transport, TransportKind};

fn smtp_error(message: impl ToString) -> MailerError {
    MailerError::transport(TransportKind::Smtp, message)
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|_| MailerError::validation(format!("invalid address: {}", address)))
}

/// SMTP submission
#[derive(Clone)]
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn from_config(config: &MailerConfig) -> Result<Self> {
        let host = config
            .server
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MailerError::validation("smtp transport requires a server"))?;

        let mut builder = match config.smtp_tls {
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(smtp_error)?,
            SmtpTls::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(smtp_error)?
            }
        };

        builder = builder
            .port(config.smtp_port())
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(user), Some(key)) = (&config.user, &config.key) {
            builder = builder.credentials(Credentials::new(user.clone(), key.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }

    /// Build the MIME message: plain + html alternative, wrapped in
    /// multipart/mixed when there are attachments.
    pub fn build_message(message: &OutgoingMessage) -> Result<(String, Message)> {
        let mut builder = Message::builder()
            .from(mailbox(&message.from)?)
            .subject(message.subject.clone());

        if let Some(sender) = &message.sender {
            builder = builder.sender(mailbox(sender)?);
        }
        for to in &message.to {
            builder = builder.to(mailbox(to)?);
        }
        for cc in &message.cc {
            builder = builder.cc(mailbox(cc)?);
        }
        for bcc in &message.bcc {
            builder = builder.bcc(mailbox(bcc)?);
        }

        let domain = message.from.rsplit('@').next().unwrap_or("localhost");
        let message_id = format!("<{}@{}>", Uuid::new_v4(), domain.trim_end_matches('>'));
        builder = builder.message_id(Some(message_id.clone()));

        let alternative = MultiPart::alternative_plain_html(message.plain.clone(), message.html.clone());

        let email = if message.attachments.is_empty() {
            builder.multipart(alternative).map_err(smtp_error)?
        } else {
            let mut mixed = MultiPart::mixed().multipart(alternative);
            for attachment in &message.attachments {
                let content_type = ContentType::parse(&attachment.content_type).map_err(|_| {
                    MailerError::validation(format!(
                        "invalid content type for {}: {}",
                        attachment.filename, attachment.content_type
                    ))
                })?;
                mixed = mixed.singlepart(
                    Attachment::new(attachment.filename.clone())
                        .body(attachment.content.clone(), content_type),
                );
            }
            builder.multipart(mixed).map_err(smtp_error)?
        };

        Ok((message_id, email))
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Smtp
    }

    async fn deliver(&self, message: &OutgoingMessage) -> Result<DeliveryResult> {
        let (message_id, email) = Self::build_message(message)?;

        let response = self.transport.send(email).await.map_err(smtp_error)?;

        Ok(DeliveryResult {
            transport: TransportKind::Smtp,
            message_id: Some(message_id),
            recipients: message.recipients(),
            raw: serde_json::json!({
                "code": response.code().to_string(),
                "message": response.message().collect::<Vec<_>>(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MessageAttachment;

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            from: "Team <team@example.com>".into(),
            sender: Some("noreply@example.com".into()),
            to: vec!["john@example.com".into()],
            cc: vec![],
            bcc: vec!["audit@example.com".into()],
            subject: "Hello John".into(),
            html: "<p>Hi</p>".into(),
            plain: "Hi".into(),
            attachments: vec![],
        }
    }

    #[test]
    fn test_build_message_headers() {
        let (message_id, email) = SmtpTransport::build_message(&message()).unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();

        assert!(formatted.contains("Subject: Hello John"));
        assert!(formatted.contains("Sender: noreply@example.com"));
        assert!(formatted.contains("multipart/alternative"));
        assert!(!formatted.contains("multipart/mixed"));
        assert!(message_id.ends_with("@example.com>"));
        assert_eq!(email.envelope().to().len(), 2);
    }

    #[test]
    fn test_build_message_with_attachment() {
        let mut msg = message();
        msg.attachments.push(MessageAttachment {
            filename: "invoice.txt".into(),
            content_type: "text/plain".into(),
            content: b"total: 42".to_vec(),
        });

        let (_, email) = SmtpTransport::build_message(&msg).unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();

        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("invoice.txt"));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut msg = message();
        msg.to = vec!["not an address".into()];
        assert!(SmtpTransport::build_message(&msg).unwrap_err().is_validation());
    }

    #[test]
    fn test_requires_server() {
        let mut config = MailerConfig::for_templates("./templates", "noreply@example.com");
        config.transport = TransportKind::Smtp;
        assert!(SmtpTransport::from_config(&config).is_err());
    }
}
