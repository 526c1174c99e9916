use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Template not found: {template} (searched: {})", display_paths(.searched))]
    TemplateNotFound {
        template: String,
        searched: Vec<PathBuf>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Variable substitution failed: {0}")]
    Substitution(String),

    #[error("Markup expansion failed: {0}")]
    Markup(String),

    #[error("Transport error ({transport}): {message}")]
    Transport { transport: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MailerError {
    pub fn validation(message: impl Into<String>) -> Self {
        MailerError::Validation(message.into())
    }

    pub fn transport(transport: impl ToString, message: impl ToString) -> Self {
        MailerError::Transport {
            transport: transport.to_string(),
            message: message.to_string(),
        }
    }

    /// Raised before any template or network I/O took place
    pub fn is_validation(&self) -> bool {
        matches!(self, MailerError::Validation(_))
    }

    /// Raised by the render pipeline, after template I/O but before delivery
    pub fn is_rendering(&self) -> bool {
        matches!(
            self,
            MailerError::Substitution(_)
                | MailerError::Markup(_)
                | MailerError::TemplateNotFound { .. }
        )
    }
}

impl From<handlebars::RenderError> for MailerError {
    fn from(err: handlebars::RenderError) -> Self {
        MailerError::Substitution(err.to_string())
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, MailerError>;
