//! Outgoing mail
//!
//! Builds a plain-text message with lettre and hands it to a
//! [`MailTransport`]. Everything that can be rejected locally (body,
//! addresses) is checked before the transport is touched.

use crate::config::{Config, Credentials};
use crate::error::{MailError, Result};
use crate::message::SendReceipt;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

pub const BODY_REQUIRED: &str = "Email body is required. Use --body or --body-file option.";

/// A message as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl OutgoingMessage {
    /// `cc` and `bcc` are comma-separated lists
    pub fn new(to: &str, subject: &str, body: String, cc: Option<&str>, bcc: Option<&str>) -> Self {
        Self {
            to: to.trim().to_string(),
            subject: subject.to_string(),
            body,
            cc: split_addresses(cc),
            bcc: split_addresses(bcc),
        }
    }

    /// Build the RFC 5322 message sent as `sender`
    pub fn build(&self, sender: &str, message_id: &str) -> Result<Message> {
        let mut builder = Message::builder()
            .from(parse_mailbox(sender)?)
            .to(parse_mailbox(&self.to)?)
            .subject(self.subject.as_str())
            .message_id(Some(message_id.to_string()));

        for addr in &self.cc {
            builder = builder.cc(parse_mailbox(addr)?);
        }
        for addr in &self.bcc {
            builder = builder.bcc(parse_mailbox(addr)?);
        }

        builder
            .header(ContentType::TEXT_PLAIN)
            .body(self.body.clone())
            .map_err(|e| MailError::Validation(format!("Failed to build message: {}", e)))
    }
}

/// Delivers a built message, returning the server's reply
#[async_trait]
pub trait MailTransport: Send {
    async fn deliver(&mut self, message: Message) -> Result<String>;
}

/// SMTP with opportunistic STARTTLS
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self> {
        let host = config.smtp.host.clone();
        let tls = TlsParameters::builder(host.clone())
            .dangerous_accept_invalid_certs(!config.tls.verify)
            .build()
            .map_err(|e| MailError::Tls(e.to_string()))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(config.smtp.port)
            .tls(Tls::Opportunistic(tls))
            .credentials(SmtpCredentials::new(credentials.user, credentials.pass))
            .build();

        Ok(Self { mailer })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(&mut self, message: Message) -> Result<String> {
        let response = self
            .mailer
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(format!(
            "{} {}",
            response.code(),
            response.message().collect::<Vec<_>>().join(" ")
        ))
    }
}

/// The body to send: the file's content when a file is given, otherwise `body`
pub async fn resolve_body(body: Option<&str>, body_file: Option<&Path>) -> Result<String> {
    let content = match body_file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|source| MailError::BodyFile {
                path: path.to_path_buf(),
                source,
            })?,
        None => body.unwrap_or_default().to_string(),
    };

    if content.is_empty() {
        return Err(MailError::Validation(BODY_REQUIRED.to_string()));
    }
    Ok(content)
}

/// Build and deliver `outgoing` from `sender`
pub async fn send<T>(transport: &mut T, sender: &str, outgoing: &OutgoingMessage) -> Result<SendReceipt>
where
    T: MailTransport + ?Sized,
{
    let message_id = message_id(sender);
    let message = outgoing.build(sender, &message_id)?;

    debug!(
        "Sending {} to {} ({} cc, {} bcc)",
        message_id,
        outgoing.to,
        outgoing.cc.len(),
        outgoing.bcc.len()
    );
    let response = transport.deliver(message).await?;
    info!("Message {} accepted: {}", message_id, response);

    Ok(SendReceipt {
        message_id,
        to: outgoing.to.clone(),
        subject: outgoing.subject.clone(),
        response,
    })
}

/// `<uuid@domain>` using the sender's domain
pub fn message_id(sender: &str) -> String {
    let domain = sender
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim_end_matches('>').trim())
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost");

    format!("<{}@{}>", Uuid::new_v4(), domain)
}

/// Split a comma-separated address list, dropping blanks
pub fn split_addresses(list: Option<&str>) -> Vec<String> {
    list.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_mailbox(raw: &str) -> Result<Mailbox> {
    raw.trim()
        .parse()
        .map_err(|_| MailError::InvalidAddress(raw.to_string()))
}
