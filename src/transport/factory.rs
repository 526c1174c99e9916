//! Transport factory

use std::sync::Arc;

use crate::config::MailerConfig;
use crate::error::Result;

use super::gateway::GatewayTransport;
use super::memory::MemoryTransport;
use super::smtp::SmtpTransport;
use super::{Transport, TransportKind};

/// Create a transport based on configuration.
///
/// - `gateway` (default): HTTP API of the mail server at `server`, keyed by `key`
/// - `smtp`: SMTP submission to `server:port`, authenticated with `user`/`key`
/// - `memory`: in-process recorder, nothing leaves the process
pub fn create_transport(config: &MailerConfig) -> Result<Arc<dyn Transport>> {
    match config.transport {
        TransportKind::Gateway => {
            let transport = GatewayTransport::from_config(config)?;
            tracing::info!(
                transport = "gateway",
                endpoint = %transport.endpoint(),
                "Creating gateway transport"
            );
            Ok(Arc::new(transport))
        }
        TransportKind::Smtp => {
            let transport = SmtpTransport::from_config(config)?;
            tracing::info!(
                transport = "smtp",
                server = config.server.as_deref().unwrap_or_default(),
                port = config.smtp_port(),
                tls = ?config.smtp_tls,
                "Creating SMTP transport"
            );
            Ok(Arc::new(transport))
        }
        TransportKind::Memory => {
            tracing::info!(transport = "memory", "Creating memory transport");
            Ok(Arc::new(MemoryTransport::new()))
        }
    }
}
