//! IMAP-backed [`MailStore`]
//!
//! Connects in plaintext, upgrades with STARTTLS when the server accepts it
//! (never implicit TLS), then logs in.

use super::{tls, BodyPart, FetchCursor, MailStore};
use crate::config::Config;
use crate::error::{MailError, Result};
use crate::message::{decode_header_text, Address, Folder, RawMessage};
use crate::search::{is_quotable, SearchExpression};
use async_imap::imap_proto::types::{Address as ImapAddress, MessageSection, NameAttribute, SectionPath};
use async_imap::types::{Fetch, Flag, Name};
use async_imap::{Client, Session};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Envelope-level items fetched for listings
const ENVELOPE_QUERY: &str = "(UID FLAGS ENVELOPE INTERNALDATE RFC822.SIZE)";

/// RFC 6154 special-use attributes
const SPECIAL_USE: &[&str] = &[
    "\\All", "\\Archive", "\\Drafts", "\\Flagged", "\\Junk", "\\Sent", "\\Trash",
];

/// Plain TCP before STARTTLS, TLS after
pub trait ImapStream: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug {}

impl<T> ImapStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug {}

type BoxedStream = Box<dyn ImapStream>;

pub struct ImapStore {
    session: Session<BoxedStream>,
    selected: Option<String>,
}

impl ImapStore {
    /// Connect, negotiate STARTTLS and log in with the configured credentials
    pub async fn connect(config: &Config) -> Result<Self> {
        let credentials = config.imap_credentials()?;
        let addr = config.imap.addr();

        info!("Connecting to IMAP server {}", addr);
        let tcp = TcpStream::connect((config.imap.host.as_str(), config.imap.port))
            .await
            .map_err(|e| MailError::Connection(format!("Failed to connect to {}: {}", addr, e)))?;

        let mut client = Client::new(Box::new(tcp) as BoxedStream);
        client
            .read_response()
            .await
            .ok_or_else(|| {
                MailError::Connection("Server closed the connection before greeting".to_string())
            })?
            .map_err(|e| MailError::Connection(format!("Failed to read IMAP greeting: {}", e)))?;

        let client = match client.run_command_and_check_ok("STARTTLS", None).await {
            Ok(()) => {
                let stream = client.into_inner();
                let server_name = tls::server_name(&config.imap.host)?;
                let tls_stream = tls::connector(&config.tls)
                    .connect(server_name, stream)
                    .await
                    .map_err(|e| MailError::Tls(format!("STARTTLS handshake failed: {}", e)))?;
                debug!("STARTTLS negotiated with {}", addr);
                Client::new(Box::new(tls_stream) as BoxedStream)
            }
            Err(e) => {
                warn!("STARTTLS not available on {} ({}), continuing without TLS", addr, e);
                client
            }
        };

        let session = client
            .login(&credentials.user, &credentials.pass)
            .await
            .map_err(|(e, _)| MailError::Connection(format!("IMAP login failed: {}", e)))?;

        info!("Logged in to {} as {}", addr, credentials.user);
        Ok(Self {
            session,
            selected: None,
        })
    }
}

#[async_trait]
impl MailStore for ImapStore {
    async fn list_folders(&mut self) -> Result<Vec<Folder>> {
        let names: Vec<Name> = self
            .session
            .list(Some(""), Some("*"))
            .await?
            .try_collect()
            .await?;

        debug!("LIST returned {} folder(s)", names.len());
        Ok(names.iter().map(folder_from_name).collect())
    }

    async fn select(&mut self, folder: &str) -> Result<()> {
        let mailbox = self.session.select(folder).await?;
        debug!("Selected {} ({} message(s))", folder, mailbox.exists);
        self.selected = Some(folder.to_string());
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        if let Some(folder) = self.selected.take() {
            self.session.close().await?;
            debug!("Released {}", folder);
        }
        Ok(())
    }

    async fn search(&mut self, expr: &SearchExpression) -> Result<Vec<u32>> {
        let criteria = expr.to_imap();
        if !is_quotable(&criteria) {
            return Err(MailError::Validation(
                "Search criteria must not contain line breaks or NUL characters".to_string(),
            ));
        }

        // UTF-8 inside quoted strings (RFC 6855); literals are not used
        let query = if criteria.is_ascii() {
            criteria
        } else {
            format!("CHARSET UTF-8 {}", criteria)
        };

        debug!("UID SEARCH {}", query);
        let mut uids: Vec<u32> = self.session.uid_search(&query).await?.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    async fn fetch_envelopes<'a>(&'a mut self, uids: &[u32]) -> Result<FetchCursor<'a>> {
        if uids.is_empty() {
            return Ok(FetchCursor::empty());
        }

        let stream = self.session.uid_fetch(uid_set(uids), ENVELOPE_QUERY).await?;
        Ok(FetchCursor::new(stream.map(|item| {
            item.map(|fetch| raw_from_fetch(&fetch))
                .map_err(MailError::from)
        })))
    }

    async fn fetch_section(&mut self, uid: u32, part: BodyPart) -> Result<Option<Vec<u8>>> {
        let query = format!("(UID BODY.PEEK[{}])", part.section());
        let fetches: Vec<Fetch> = self
            .session
            .uid_fetch(uid.to_string(), &query)
            .await?
            .try_collect()
            .await?;

        let path = section_path(part);
        Ok(fetches
            .iter()
            .filter(|fetch| fetch.uid.map_or(true, |u| u == uid))
            .find_map(|fetch| fetch.section(&path))
            .map(<[u8]>::to_vec))
    }

    async fn logout(&mut self) -> Result<()> {
        self.session.logout().await?;
        debug!("Logged out");
        Ok(())
    }
}

/// Comma-separated UID list for UID FETCH
fn uid_set(uids: &[u32]) -> String {
    uids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn section_path(part: BodyPart) -> SectionPath {
    match part {
        BodyPart::FirstPartText => SectionPath::Part(vec![1], Some(MessageSection::Text)),
        BodyPart::FirstPart => SectionPath::Part(vec![1], None),
    }
}

fn raw_from_fetch(fetch: &Fetch) -> RawMessage {
    let envelope = fetch.envelope();

    RawMessage {
        uid: fetch.uid.unwrap_or_default(),
        subject: envelope
            .and_then(|e| e.subject.as_deref())
            .map(decode_header_text),
        from: addresses(envelope.and_then(|e| e.from.as_deref())),
        to: addresses(envelope.and_then(|e| e.to.as_deref())),
        cc: addresses(envelope.and_then(|e| e.cc.as_deref())),
        date: envelope
            .and_then(|e| e.date.as_deref())
            .map(|d| String::from_utf8_lossy(d).into_owned()),
        internal_date: fetch.internal_date(),
        flags: Some(fetch.flags().map(|flag| flag_token(&flag)).collect()),
        size: fetch.size,
        message_id: envelope
            .and_then(|e| e.message_id.as_deref())
            .map(|id| String::from_utf8_lossy(id).into_owned()),
    }
}

fn addresses(list: Option<&[ImapAddress<'_>]>) -> Vec<Address> {
    list.unwrap_or_default()
        .iter()
        .map(|addr| {
            let mailbox = addr.mailbox.as_deref().map(String::from_utf8_lossy);
            let host = addr.host.as_deref().map(String::from_utf8_lossy);
            let address = match (mailbox, host) {
                (Some(mailbox), Some(host)) => Some(format!("{}@{}", mailbox, host)),
                (Some(mailbox), None) => Some(mailbox.into_owned()),
                _ => None,
            };

            Address {
                name: addr.name.as_deref().map(decode_header_text),
                address,
            }
        })
        .collect()
}

#[allow(unreachable_patterns)]
fn flag_token(flag: &Flag<'_>) -> String {
    match flag {
        Flag::Seen => "\\Seen".to_string(),
        Flag::Answered => "\\Answered".to_string(),
        Flag::Flagged => "\\Flagged".to_string(),
        Flag::Deleted => "\\Deleted".to_string(),
        Flag::Draft => "\\Draft".to_string(),
        Flag::Recent => "\\Recent".to_string(),
        Flag::MayCreate => "\\*".to_string(),
        Flag::Custom(custom) => custom.to_string(),
        other => format!("{:?}", other),
    }
}

fn folder_from_name(name: &Name) -> Folder {
    let flags: Vec<String> = name.attributes().iter().filter_map(attribute_token).collect();

    Folder {
        path: name.name().to_string(),
        delimiter: name.delimiter().map(str::to_string),
        special_use: special_use(&flags),
        flags,
    }
}

/// `\Noselect`-style token for a LIST attribute
fn attribute_token(attr: &NameAttribute<'_>) -> Option<String> {
    let token = match attr {
        NameAttribute::NoInferiors => "\\Noinferiors",
        NameAttribute::NoSelect => "\\Noselect",
        NameAttribute::Marked => "\\Marked",
        NameAttribute::Unmarked => "\\Unmarked",
        NameAttribute::All => "\\All",
        NameAttribute::Archive => "\\Archive",
        NameAttribute::Drafts => "\\Drafts",
        NameAttribute::Flagged => "\\Flagged",
        NameAttribute::Junk => "\\Junk",
        NameAttribute::Sent => "\\Sent",
        NameAttribute::Trash => "\\Trash",
        NameAttribute::Extension(extension) => return Some(extension.to_string()),
        _ => return None,
    };
    Some(token.to_string())
}

fn special_use(flags: &[String]) -> Option<String> {
    flags
        .iter()
        .find(|flag| SPECIAL_USE.iter().any(|s| s.eq_ignore_ascii_case(flag)))
        .cloned()
}
