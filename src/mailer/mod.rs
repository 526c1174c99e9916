//! Mailer boundary.
//!
//! Callers hand a [`SendMailRequest`] to [`Mailer::send_mail`]; the mailer
//! validates it, renders the template for the requested locale, derives the
//! plain-text part, resolves the subject and delivers through the configured
//! transport.

mod request;
mod service;

pub use request::{Attachment, AttachmentData, Recipients, SendMailRequest};
pub use service::{Mailer, PreparedMail};
