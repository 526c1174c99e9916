mod settings;

pub use settings::{LogConfig, LogFormat, MailerConfig, Settings, SmtpTls};
