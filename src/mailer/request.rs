//! Send requests and their validation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MailerError, Result};
use crate::template::is_valid_template_name;
use crate::transport::MessageAttachment;

/// A single address or a list of addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Default for Recipients {
    fn default() -> Self {
        Recipients::Many(Vec::new())
    }
}

impl Recipients {
    /// Addresses with surrounding whitespace removed and blanks dropped
    pub fn addresses(&self) -> Vec<String> {
        let raw: Vec<&String> = match self {
            Recipients::One(address) => vec![address],
            Recipients::Many(addresses) => addresses.iter().collect(),
        };
        raw.into_iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses().is_empty()
    }
}

impl From<&str> for Recipients {
    fn from(address: &str) -> Self {
        Recipients::One(address.to_string())
    }
}

impl From<String> for Recipients {
    fn from(address: String) -> Self {
        Recipients::One(address)
    }
}

impl From<Vec<String>> for Recipients {
    fn from(addresses: Vec<String>) -> Self {
        Recipients::Many(addresses)
    }
}

/// Attachment content: a JSON string or a byte array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttachmentData {
    Text(String),
    Binary(Vec<u8>),
}

impl AttachmentData {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            AttachmentData::Text(text) => text.into_bytes(),
            AttachmentData::Binary(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: AttachmentData,
}

impl From<Attachment> for MessageAttachment {
    fn from(attachment: Attachment) -> Self {
        MessageAttachment {
            filename: attachment.filename,
            content_type: attachment.content_type,
            content: attachment.data.into_bytes(),
        }
    }
}

/// Everything needed to render and send one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    /// Template basename, without the `.mjml` extension
    pub template: String,
    pub data: Value,
    pub to: Recipients,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub cc: Option<Recipients>,
    #[serde(default)]
    pub bcc: Option<Recipients>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl SendMailRequest {
    pub fn new(template: impl Into<String>, data: Value, to: impl Into<Recipients>) -> Self {
        Self {
            template: template.into(),
            data,
            to: to.into(),
            subject: None,
            locale: String::new(),
            from: None,
            cc: None,
            bcc: None,
            attachments: Vec::new(),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn cc(mut self, cc: impl Into<Recipients>) -> Self {
        self.cc = Some(cc.into());
        self
    }

    pub fn bcc(mut self, bcc: impl Into<Recipients>) -> Self {
        self.bcc = Some(bcc.into());
        self
    }

    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Parse a request from JSON; malformed input is a validation error.
    pub fn from_json(value: Value) -> Result<Self> {
        let request: Self = serde_json::from_value(value)
            .map_err(|e| MailerError::validation(format!("invalid request: {}", e)))?;
        request.validate()?;
        Ok(request)
    }

    /// Check required fields. Performs no I/O.
    pub fn validate(&self) -> Result<()> {
        if self.template.trim().is_empty() {
            return Err(MailerError::validation("providing a value for template is required"));
        }
        if !is_valid_template_name(&self.template) {
            return Err(MailerError::validation(
                "template must be a basename without path separators or '..'",
            ));
        }
        if !self.data.is_object() {
            return Err(MailerError::validation("data should be an object"));
        }
        if self.to.is_empty() {
            return Err(MailerError::validation("providing a value for to is required"));
        }
        if self.attachments.iter().any(|a| a.filename.trim().is_empty()) {
            return Err(MailerError::validation(
                "all attachments' filenames should be non-empty strings",
            ));
        }
        if self.attachments.iter().any(|a| a.content_type.trim().is_empty()) {
            return Err(MailerError::validation(
                "all attachments' content types should be non-empty strings",
            ));
        }
        Ok(())
    }

    pub fn cc_addresses(&self) -> Vec<String> {
        self.cc.as_ref().map(Recipients::addresses).unwrap_or_default()
    }

    pub fn bcc_addresses(&self) -> Vec<String> {
        self.bcc.as_ref().map(Recipients::addresses).unwrap_or_default()
    }
}
