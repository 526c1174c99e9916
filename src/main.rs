use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use postal_mailer::config::Settings;
use postal_mailer::mailer::{Attachment, AttachmentData, Mailer, SendMailRequest};
use postal_mailer::telemetry::init_tracing;
use postal_mailer::transport::{MemoryTransport, Transport};

/// Render MJML email templates and send them through Postal or SMTP
#[derive(Parser)]
#[command(name = "postal-mailer", version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List locale directories found under the template root
    Locales,

    /// Render a template and print the result
    Render {
        /// Template basename (`invite` for `<locale>/invite.mjml`)
        template: String,

        #[arg(short, long, default_value = "")]
        locale: String,

        /// JSON object with template data; `-` reads stdin
        #[arg(short, long)]
        data: Option<String>,

        /// Print the plain-text body instead of HTML
        #[arg(long)]
        plain: bool,

        /// Print the template's metadata as JSON
        #[arg(long)]
        meta: bool,
    },

    /// Render a template and send it
    Send {
        template: String,

        #[arg(long, required = true)]
        to: Vec<String>,

        #[arg(short, long)]
        subject: Option<String>,

        #[arg(short, long, default_value = "")]
        locale: String,

        /// JSON object with template data; `-` reads stdin
        #[arg(short, long)]
        data: Option<String>,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        cc: Vec<String>,

        #[arg(long)]
        bcc: Vec<String>,

        /// File to attach, optionally suffixed with `:content/type`
        #[arg(long)]
        attach: Vec<String>,

        /// Record the message in memory instead of delivering it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration; only real deliveries need transport credentials
    let delivers = matches!(cli.command, Commands::Send { dry_run: false, .. });
    let settings = (if delivers { Settings::new() } else { Settings::load() })
        .context("Failed to load configuration")?;
    init_tracing(&settings.log)?;
    tracing::debug!(transport = %settings.mailer.transport, "Configuration loaded");

    match cli.command {
        Commands::Locales => {
            let memory: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
            let mailer = Mailer::new(settings.mailer, memory)?;
            for locale in mailer.locales().iter() {
                println!("{}", locale);
            }
        }
        Commands::Render {
            template,
            locale,
            data,
            plain,
            meta,
        } => {
            let memory: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
            let mailer = Mailer::new(settings.mailer, memory)?;
            let data = read_data(data.as_deref())?;
            let compiled = mailer.compile(&template, &data, &locale)?;

            if meta {
                println!("{}", serde_json::to_string_pretty(&compiled.meta)?);
            } else if plain {
                println!("{}", mailer.compile_plain_body(&compiled.html));
            } else {
                println!("{}", compiled.html);
            }
        }
        Commands::Send {
            template,
            to,
            subject,
            locale,
            data,
            from,
            cc,
            bcc,
            attach,
            dry_run,
        } => {
            let mailer = if dry_run {
                let memory: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
                Mailer::new(settings.mailer, memory)?
            } else {
                Mailer::from_config(settings.mailer)?
            };

            let mut request = SendMailRequest::new(template, read_data(data.as_deref())?, to)
                .locale(locale)
                .cc(cc)
                .bcc(bcc);
            if let Some(subject) = subject {
                request = request.subject(subject);
            }
            if let Some(from) = from {
                request = request.from(from);
            }
            for arg in &attach {
                request = request.attach(read_attachment(arg)?);
            }

            let result = mailer.send_mail(request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn read_data(source: Option<&str>) -> Result<Value> {
    let raw = match source {
        None => return Ok(Value::Object(Default::default())),
        Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file {}", path))?,
    };

    let value: Value = serde_json::from_str(&raw).context("Template data is not valid JSON")?;
    if !value.is_object() {
        bail!("Template data must be a JSON object");
    }
    Ok(value)
}

/// `path/to/file.pdf:application/pdf` or just `path/to/file.pdf`
fn read_attachment(arg: &str) -> Result<Attachment> {
    let (path, content_type) = match arg.rsplit_once(':') {
        Some((path, content_type)) if content_type.contains('/') && !path.is_empty() => {
            (PathBuf::from(path), content_type.to_string())
        }
        _ => (PathBuf::from(arg), "application/octet-stream".to_string()),
    };

    let bytes = std::fs::read(&path)
        .with_context(|| format!("Failed to read attachment {}", path.display()))?;

    Ok(Attachment {
        filename: file_name(&path),
        content_type,
        data: AttachmentData::Binary(bytes),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
