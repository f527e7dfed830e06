//! Message records
//!
//! [`RawMessage`] is what a mail store hands back for one FETCH item;
//! [`MessageSummary`] and [`MessageDetail`] are the normalized shapes that
//! get printed.

use chrono::{DateTime, FixedOffset, Utc};
use mail_parser::MessageParser;
use serde::{Deserialize, Serialize};

pub const NO_SUBJECT: &str = "(no subject)";
pub const UNKNOWN_SENDER: &str = "(unknown sender)";
pub const SEEN_FLAG: &str = "\\Seen";

/// Envelope address (RFC 3501 section 7.4.2)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl Address {
    pub fn new(name: Option<&str>, address: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            address: address.map(str::to_string),
        }
    }

    /// `Name <user@host>`, or whatever part is present
    pub fn display(&self) -> Option<String> {
        let name = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let address = self.address.as_deref().map(str::trim).filter(|a| !a.is_empty());

        match (name, address) {
            (Some(name), Some(address)) => Some(format!("{} <{}>", name, address)),
            (None, Some(address)) => Some(format!("<{}>", address)),
            (Some(name), None) => Some(name.to_string()),
            (None, None) => None,
        }
    }
}

/// One message as returned by the store, before normalization
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    pub uid: u32,
    pub subject: Option<String>,
    pub from: Vec<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    /// Envelope `Date:` header, unparsed
    pub date: Option<String>,
    /// Server INTERNALDATE
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// `None` when the server sent no FLAGS item
    pub flags: Option<Vec<String>>,
    pub size: Option<u32>,
    pub message_id: Option<String>,
}

impl RawMessage {
    /// Sent date from the envelope, falling back to the server's received date
    pub fn effective_date(&self) -> Option<DateTime<Utc>> {
        self.date
            .as_deref()
            .and_then(parse_header_date)
            .or_else(|| self.internal_date.map(|d| d.with_timezone(&Utc)))
    }

    fn subject_or_placeholder(&self) -> String {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_SUBJECT)
            .to_string()
    }

    fn sender_or_placeholder(&self) -> String {
        self.from
            .first()
            .and_then(Address::display)
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string())
    }
}

/// Listing/search record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub uid: u32,
    pub subject: String,
    pub from: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl MessageSummary {
    pub fn from_raw(raw: &RawMessage) -> Self {
        Self {
            uid: raw.uid,
            subject: raw.subject_or_placeholder(),
            from: raw.sender_or_placeholder(),
            date: raw.effective_date(),
            flags: raw.flags.clone().unwrap_or_default(),
            size: raw.size,
        }
    }

    pub fn is_unread(&self) -> bool {
        is_unread(&self.flags)
    }
}

/// Single-message record with recipients and body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    pub uid: u32,
    pub subject: String,
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub flags: Vec<String>,
    pub message_id: Option<String>,
    pub body: String,
}

impl MessageDetail {
    pub fn from_raw(raw: &RawMessage, body: String) -> Self {
        Self {
            uid: raw.uid,
            subject: raw.subject_or_placeholder(),
            from: raw.sender_or_placeholder(),
            to: display_all(&raw.to),
            cc: display_all(&raw.cc),
            date: raw.effective_date(),
            flags: raw.flags.clone().unwrap_or_default(),
            message_id: raw.message_id.clone(),
            body,
        }
    }

    pub fn is_unread(&self) -> bool {
        is_unread(&self.flags)
    }
}

/// Mailbox entry from LIST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub path: String,
    pub delimiter: Option<String>,
    /// RFC 6154 role such as `\Sent`
    pub special_use: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Outcome of a successful send
#[derive(Debug, Clone, PartialEq)]
pub struct SendReceipt {
    pub message_id: String,
    pub to: String,
    pub subject: String,
    pub response: String,
}

/// A message is unread unless it carries `\Seen`
pub fn is_unread(flags: &[String]) -> bool {
    !flags.iter().any(|flag| flag.eq_ignore_ascii_case(SEEN_FLAG))
}

fn display_all(addresses: &[Address]) -> Vec<String> {
    addresses.iter().filter_map(Address::display).collect()
}

/// Parse an RFC 2822 `Date:` header into UTC
pub fn parse_header_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.with_timezone(&Utc));
    }

    // mail-parser copes with obsolete zones and trailing comments
    mail_parser::DateTime::parse_rfc822(raw)
        .and_then(|date| DateTime::from_timestamp(date.to_timestamp(), 0))
}

/// Decode header text that may contain RFC 2047 encoded words
pub fn decode_header_text(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if !text.contains("=?") {
        return text.into_owned();
    }

    let mut header = Vec::with_capacity(raw.len() + 16);
    header.extend_from_slice(b"Subject: ");
    header.extend_from_slice(raw);
    header.extend_from_slice(b"\r\n\r\n");

    MessageParser::default()
        .parse(&header)
        .and_then(|message| message.subject().map(str::to_string))
        .unwrap_or_else(|| text.into_owned())
}
