//! Plain SMTP delivery of notification emails.
//!
//! The relay is either given explicitly or taken from `mail.address` of the `servers`
//! configuration. No authentication or TLS is attempted; the relay is expected to be
//! an internal host.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{ConfigClient, ServersConfig};
use crate::sources::SourceError;

const DEFAULT_SMTP_PORT: u16 = 25;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Could not find the mail server: {0}")]
    Config(#[from] SourceError),

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Invalid MIME subtype {0}")]
    ContentType(String),

    #[error("No recipients")]
    NoRecipients,

    #[error("Could not read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("Invalid mail server {0}")]
    Server(String),

    #[error("There was an error and the email was not sent: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// An outgoing email
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub sender: String,
    pub receivers: Vec<String>,
    pub subject: String,
    pub body: String,
    /// MIME subtype of the body, `plain` or `html`
    pub mime: String,
    pub attachment: Option<PathBuf>,
}

impl EmailMessage {
    pub fn new(
        sender: impl Into<String>,
        receivers: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receivers,
            subject: subject.into(),
            body: body.into(),
            mime: "plain".to_string(),
            attachment: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }
}

/// Build the MIME message: a multipart/mixed container with the body and the
/// optional attachment as `application/octet-stream`
pub async fn build_message(email: &EmailMessage) -> Result<Message, EmailError> {
    if email.receivers.is_empty() {
        return Err(EmailError::NoRecipients);
    }

    let mut builder = Message::builder()
        .from(email.sender.parse::<Mailbox>()?)
        .subject(email.subject.as_str());
    for receiver in &email.receivers {
        builder = builder.to(receiver.parse::<Mailbox>()?);
    }

    let body_type = ContentType::parse(&format!("text/{}; charset=utf-8", email.mime))
        .map_err(|_| EmailError::ContentType(email.mime.clone()))?;
    let mut parts = MultiPart::mixed().singlepart(
        SinglePart::builder()
            .header(body_type)
            .body(email.body.clone()),
    );

    if let Some(path) = &email.attachment {
        parts = parts.singlepart(attachment_part(path).await?);
    }

    Ok(builder.multipart(parts)?)
}

async fn attachment_part(path: &Path) -> Result<SinglePart, EmailError> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|source| EmailError::Attachment {
            path: path.to_path_buf(),
            source,
        })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let octet_stream = ContentType::parse("application/octet-stream")
        .map_err(|_| EmailError::ContentType("octet-stream".to_string()))?;

    Ok(Attachment::new(filename).body(content, octet_stream))
}

/// Split `host[:port]`, defaulting to port 25
pub fn parse_server(server: &str) -> Result<(String, u16), EmailError> {
    let server = server.trim();
    let (host, port) = match server.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| EmailError::Server(server.to_string()))?;
            (host, port)
        }
        None => (server, DEFAULT_SMTP_PORT),
    };

    if host.is_empty() {
        return Err(EmailError::Server(server.to_string()));
    }
    Ok((host.to_string(), port))
}

/// Send an email through `server`, or through the configured mail relay when `None`
pub async fn send_email(
    email: &EmailMessage,
    server: Option<&str>,
    config: &ConfigClient,
) -> Result<(), EmailError> {
    let address = match server {
        Some(server) => server.to_string(),
        None => config.get_config::<ServersConfig>("servers").await?.mail.address,
    };
    let (host, port) = parse_server(&address)?;
    let message = build_message(email).await?;

    tracing::debug!("Sending \"{}\" via {}:{}", email.subject, host, port);
    let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        .port(port)
        .build();
    transport.send(message).await?;
    Ok(())
}
