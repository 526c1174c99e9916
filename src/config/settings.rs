use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::transport::TransportKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub mailer: MailerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    /// Root directory holding `<locale>/<template>.mjml` files
    #[serde(default = "default_templates")]
    pub templates: PathBuf,
    /// Gateway host (or base URL) for `gateway`, mail host for `smtp`
    #[serde(default)]
    pub server: Option<String>,
    /// Unset means 465 for implicit TLS, 587 otherwise; see [`MailerConfig::smtp_port`]
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    /// Gateway API key, or SMTP password
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub transport: TransportKind,
    /// Default From address, also used as the Sender header
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub assets_url: String,
    /// Empty means templates live directly under `templates`
    #[serde(default)]
    pub default_locale: String,
    #[serde(default)]
    pub smtp_tls: SmtpTls,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    #[default]
    Starttls,
    Tls,
    None,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_templates() -> PathBuf {
    PathBuf::from("./templates")
}

fn default_timeout_secs() -> u64 {
    30
}

impl Settings {
    /// Load and validate settings for sending.
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Self::load()?;
        settings.mailer.validate()?;
        Ok(settings)
    }

    /// Load settings without transport validation, for render-only use.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("mailer.templates", "./templates")?
            .set_default("mailer.transport", "gateway")?
            .set_default("mailer.timeout_secs", 30)?
            .set_default("log.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // POSTAL_SERVER, POSTAL_KEY, POSTAL_DEFAULT_LOCALE, ...
            .add_source(
                Environment::with_prefix("POSTAL").prefix_separator("_"),
            )
            // LOG_FORMAT
            .add_source(Environment::with_prefix("LOG").prefix_separator("_"));

        Settings::from_layers(builder.build()?)
    }

    /// Environment keys arrive flat (`server`, `default_locale`), file keys
    /// nested under `mailer.` and `log.`; fold both into one shape.
    fn from_layers(raw: Config) -> Result<Self, ConfigError> {
        let lookup = |key: &str| -> Option<config::Value> {
            raw.get::<config::Value>(key)
                .or_else(|_| raw.get::<config::Value>(&format!("mailer.{}", key)))
                .ok()
        };

        let mut mailer = serde_json::Map::new();
        for key in STRING_KEYS {
            if let Some(value) = lookup(key) {
                mailer.insert((*key).to_string(), value.into_string()?.into());
            }
        }
        for key in NUMERIC_KEYS {
            if let Some(value) = lookup(key) {
                mailer.insert((*key).to_string(), value.into_int()?.into());
            }
        }

        let format = raw
            .get::<String>("format")
            .or_else(|_| raw.get::<String>("log.format"))
            .unwrap_or_else(|_| "pretty".to_string());

        let value = serde_json::json!({
            "mailer": mailer,
            "log": { "format": format.to_lowercase() },
        });
        serde_json::from_value(value).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

const STRING_KEYS: &[&str] = &[
    "templates",
    "server",
    "user",
    "key",
    "transport",
    "sender",
    "assets_url",
    "default_locale",
    "smtp_tls",
];

const NUMERIC_KEYS: &[&str] = &["port", "timeout_secs"];

impl MailerConfig {
    /// Minimal configuration for the given template root, using the
    /// in-memory transport.
    pub fn for_templates(templates: impl Into<PathBuf>, sender: impl Into<String>) -> Self {
        Self {
            templates: templates.into(),
            server: None,
            port: None,
            user: None,
            key: None,
            transport: TransportKind::Memory,
            sender: sender.into(),
            assets_url: String::new(),
            default_locale: String::new(),
            smtp_tls: SmtpTls::default(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// SMTP port: the configured one, else the conventional port for the
    /// TLS mode (465 for implicit TLS, 587 for submission).
    pub fn smtp_port(&self) -> u16 {
        self.port.unwrap_or(match self.smtp_tls {
            SmtpTls::Tls => 465,
            SmtpTls::Starttls | SmtpTls::None => 587,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sender.trim().is_empty() {
            return Err(ConfigError::Message(
                "mailer.sender (POSTAL_SENDER) is required".to_string(),
            ));
        }

        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        match self.transport {
            TransportKind::Gateway => {
                if !has(&self.server) || !has(&self.key) {
                    return Err(ConfigError::Message(
                        "gateway transport requires POSTAL_SERVER and POSTAL_KEY".to_string(),
                    ));
                }
            }
            TransportKind::Smtp => {
                if !has(&self.server) {
                    return Err(ConfigError::Message(
                        "smtp transport requires POSTAL_SERVER".to_string(),
                    ));
                }
            }
            TransportKind::Memory => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = MailerConfig::for_templates("/tmp/templates", "noreply@example.com");
        assert_eq!(config.port, None);
        assert_eq!(config.smtp_port(), 587);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.smtp_tls, SmtpTls::Starttls);
        assert!(config.default_locale.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gateway_requires_server_and_key() {
        let mut config = MailerConfig::for_templates("/tmp/templates", "noreply@example.com");
        config.transport = TransportKind::Gateway;
        config.server = Some("postal.example.com".to_string());
        assert!(config.validate().is_err());

        config.key = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_smtp_requires_server() {
        let mut config = MailerConfig::for_templates("/tmp/templates", "noreply@example.com");
        config.transport = TransportKind::Smtp;
        assert!(config.validate().is_err());

        config.server = Some("localhost".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_smtp_port_defaults_by_tls_mode() {
        let mut config = MailerConfig::for_templates("/tmp/templates", "noreply@example.com");
        config.smtp_tls = SmtpTls::Tls;
        assert_eq!(config.smtp_port(), 465);

        config.smtp_tls = SmtpTls::None;
        assert_eq!(config.smtp_port(), 587);

        config.smtp_tls = SmtpTls::Tls;
        config.port = Some(2525);
        assert_eq!(config.smtp_port(), 2525);
    }

    #[test]
    fn test_sender_required() {
        let config = MailerConfig::for_templates("/tmp/templates", "  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_layers() {
        let raw = Config::builder()
            .set_default("mailer.templates", "./templates")
            .unwrap()
            .set_override("server", "postal.example.com")
            .unwrap()
            .set_override("key", "secret")
            .unwrap()
            .set_override("sender", "noreply@example.com")
            .unwrap()
            .set_override("default_locale", "en")
            .unwrap()
            .set_override("transport", "smtp")
            .unwrap()
            .set_override("port", "2525")
            .unwrap()
            .set_override("format", "json")
            .unwrap()
            .build()
            .unwrap();

        let settings = Settings::from_layers(raw).unwrap();
        assert_eq!(settings.mailer.server.as_deref(), Some("postal.example.com"));
        assert_eq!(settings.mailer.default_locale, "en");
        assert_eq!(settings.mailer.transport, TransportKind::Smtp);
        assert_eq!(settings.mailer.port, Some(2525));
        assert_eq!(settings.mailer.templates, PathBuf::from("./templates"));
        assert_eq!(settings.log.format, LogFormat::Json);
    }
}
