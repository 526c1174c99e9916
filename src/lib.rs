// Supporting modules
pub mod config;
pub mod error;
pub mod telemetry;

// Rendering
pub mod template;

// Delivery
pub mod mailer;
pub mod transport;

pub use error::{MailerError, Result};
pub use mailer::{Mailer, SendMailRequest};
