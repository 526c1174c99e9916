//! Mailer integration tests
//!
//! Full send path (validate, render, derive plain text, deliver) against the
//! fixture templates, using the in-memory transport so nothing leaves the
//! process.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use postal_mailer::config::MailerConfig;
use postal_mailer::mailer::{Attachment, AttachmentData, Mailer, SendMailRequest};
use postal_mailer::transport::{create_transport, MemoryTransport, TransportKind};

fn config() -> MailerConfig {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/templates");
    let mut config = MailerConfig::for_templates(root, "mail@domain.com");
    config.default_locale = "en".to_string();
    config.assets_url = "https://assets.example.com".to_string();
    config
}

fn mailer() -> (Arc<MemoryTransport>, Mailer) {
    let transport = Arc::new(MemoryTransport::new());
    let mailer = Mailer::new(config(), transport.clone()).unwrap();
    (transport, mailer)
}

#[tokio::test]
async fn test_send_mail() {
    let (transport, mailer) = mailer();

    let result = mailer
        .send_json(json!({
            "template": "test",
            "data": { "foo": "bar" },
            "to": "foo@domain.com",
            "subject": "test"
        }))
        .await
        .unwrap();

    assert_eq!(result.transport, TransportKind::Memory);
    assert_eq!(result.recipients, vec!["foo@domain.com"]);

    let sent = transport.sent().await;
    assert_eq!(sent.len(), 1);

    let message = &sent[0].message;
    assert_eq!(message.from, "mail@domain.com");
    assert_eq!(message.sender, None);
    assert_eq!(message.to, vec!["foo@domain.com"]);
    assert_eq!(message.subject, "test");
    assert!(message.html.contains("EN: bar"));
    assert_eq!(message.plain, "EN: bar");
}

#[tokio::test]
async fn test_send_mail_in_locale() {
    let (transport, mailer) = mailer();

    let request = SendMailRequest::new("test", json!({ "foo": "bar" }), "foo@domain.com")
        .subject("test")
        .locale("de");
    mailer.send_mail(request).await.unwrap();

    assert_eq!(transport.sent().await[0].message.plain, "DE: bar");
}

#[tokio::test]
async fn test_subject_from_template_metadata() {
    let (transport, mailer) = mailer();

    let request = SendMailRequest::new("welcome", json!({ "name": "John" }), "john@example.com")
        .subject("Caller subject")
        .locale("en");
    mailer.send_mail(request).await.unwrap();

    let message = &transport.sent().await[0].message;
    assert_eq!(message.subject, "Welcome, John");
}

#[tokio::test]
async fn test_cc_bcc_and_from() {
    let (transport, mailer) = mailer();

    let result = mailer
        .send_json(json!({
            "template": "test",
            "data": { "foo": "bar" },
            "to": "foo@domain.com",
            "subject": "test",
            "from": "team@domain.com",
            "cc": "cc@domain.com",
            "bcc": ["audit@domain.com", "archive@domain.com"]
        }))
        .await
        .unwrap();

    assert_eq!(result.recipients.len(), 4);

    let message = &transport.sent().await[0].message;
    assert_eq!(message.from, "team@domain.com");
    assert_eq!(message.sender.as_deref(), Some("mail@domain.com"));
    assert_eq!(message.cc, vec!["cc@domain.com"]);
    assert_eq!(message.bcc, vec!["audit@domain.com", "archive@domain.com"]);
}

#[tokio::test]
async fn test_attachments() {
    let (transport, mailer) = mailer();

    let request = SendMailRequest::new("test", json!({ "foo": "bar" }), "foo@domain.com")
        .subject("test")
        .attach(Attachment {
            filename: "test.jpg".into(),
            content_type: "image/jpg".into(),
            data: AttachmentData::Text(String::new()),
        })
        .attach(Attachment {
            filename: "data.bin".into(),
            content_type: "application/octet-stream".into(),
            data: AttachmentData::Binary(vec![0, 159, 146, 150]),
        });
    mailer.send_mail(request).await.unwrap();

    let message = &transport.sent().await[0].message;
    assert_eq!(message.attachments.len(), 2);
    assert_eq!(message.attachments[0].filename, "test.jpg");
    assert_eq!(message.attachments[1].content, vec![0, 159, 146, 150]);
}

#[tokio::test]
async fn test_invalid_attachment_data_never_sends() {
    let (transport, mailer) = mailer();

    let err = mailer
        .send_json(json!({
            "template": "test",
            "data": { "foo": "bar" },
            "to": "foo@domain.com",
            "subject": "test",
            "attachments": [{ "filename": "test.jpg", "contentType": "image/jpg", "data": {} }]
        }))
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(transport.is_empty().await);
}

#[tokio::test]
async fn test_validation_failures_never_send() {
    let (transport, mailer) = mailer();

    let cases = vec![
        SendMailRequest::new("", json!({}), "foo@domain.com").subject("x"),
        SendMailRequest::new("test", json!("not an object"), "foo@domain.com").subject("x"),
        SendMailRequest::new("test", json!({}), "").subject("x"),
        SendMailRequest::new("test", json!({}), "foo@domain.com"),
    ];

    for request in cases {
        let err = mailer.send_mail(request).await.unwrap_err();
        assert!(err.is_validation(), "{}", err);
    }
    assert!(transport.is_empty().await);
}

#[tokio::test]
async fn test_missing_template_never_sends() {
    let (transport, mailer) = mailer();

    let err = mailer
        .send_mail(SendMailRequest::new("nope", json!({}), "foo@domain.com").subject("x"))
        .await
        .unwrap_err();

    assert!(err.is_rendering());
    assert!(transport.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_sends() {
    let (transport, mailer) = mailer();
    let mailer = Arc::new(mailer);

    let mut handles = Vec::new();
    for i in 0..10 {
        let mailer = mailer.clone();
        handles.push(tokio::spawn(async move {
            let locale = if i % 2 == 0 { "de" } else { "en" };
            let request = SendMailRequest::new("test", json!({ "foo": i }), format!("user{}@domain.com", i))
                .subject("test")
                .locale(locale);
            mailer.send_mail(request).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let sent = transport.sent().await;
    assert_eq!(sent.len(), 10);
    for record in sent {
        let i: usize = record.message.to[0]
            .trim_start_matches("user")
            .trim_end_matches("@domain.com")
            .parse()
            .unwrap();
        let expected = if i % 2 == 0 { format!("DE: {}", i) } else { format!("EN: {}", i) };
        assert_eq!(record.message.plain, expected);
    }
}

#[test]
fn test_from_config_uses_configured_transport() {
    let mailer = Mailer::from_config(config()).unwrap();
    assert_eq!(mailer.transport_kind(), TransportKind::Memory);

    let transport = create_transport(&config()).unwrap();
    assert_eq!(transport.kind(), TransportKind::Memory);
}
