//! In-memory doubles for the mail store and SMTP transport

#![allow(dead_code)]

pub mod imap_server;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use imap_cli::error::{MailError, Result};
use imap_cli::message::{Address, Folder, RawMessage};
use imap_cli::search::{MatchTarget, SearchExpression};
use imap_cli::send::MailTransport;
use imap_cli::store::{BodyPart, FetchCursor, MailStore};
use lettre::Message;
use std::collections::HashMap;

/// A stored message with its body sections keyed by section name
#[derive(Debug, Clone, Default)]
pub struct StoredMessage {
    pub raw: RawMessage,
    pub body: String,
    pub sections: HashMap<&'static str, Vec<u8>>,
}

impl StoredMessage {
    pub fn new(uid: u32, subject: &str, from: &str, date: &str) -> Self {
        Self {
            raw: RawMessage {
                uid,
                subject: Some(subject.to_string()),
                from: vec![Address::new(None, Some(from))],
                to: vec![Address::new(Some("Me"), Some("me@example.com"))],
                date: Some(date.to_string()),
                flags: Some(vec!["\\Seen".to_string()]),
                size: Some(1024),
                message_id: Some(format!("<{}@example.com>", uid)),
                ..RawMessage::default()
            },
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self.sections.insert("1.TEXT", body.as_bytes().to_vec());
        self
    }

    pub fn with_section(mut self, section: &'static str, content: &str) -> Self {
        self.sections.insert(section, content.as_bytes().to_vec());
        self
    }

    pub fn unread(mut self) -> Self {
        self.raw.flags = Some(Vec::new());
        self
    }
}

/// RFC 2822 date header for noon UTC on the given day
pub fn header_date(year: i32, month: u32, day: u32) -> String {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .unwrap()
        .to_rfc2822()
}

pub fn internal_date(year: i32, month: u32, day: u32) -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .unwrap()
        .fixed_offset()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub folders: Vec<Folder>,
    pub messages: HashMap<String, Vec<StoredMessage>>,
    pub selected: Option<String>,
    /// Store calls in order, e.g. `select INBOX`, `release`
    pub events: Vec<String>,
    pub fail_search: bool,
    pub fail_sections: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(folder: &str, messages: Vec<StoredMessage>) -> Self {
        let mut store = Self::new();
        store.add_folder(folder, None);
        store.messages.insert(folder.to_string(), messages);
        store
    }

    pub fn add_folder(&mut self, path: &str, special_use: Option<&str>) {
        self.folders.push(Folder {
            path: path.to_string(),
            delimiter: Some("/".to_string()),
            special_use: special_use.map(str::to_string),
            flags: special_use.into_iter().map(str::to_string).collect(),
        });
        self.messages.entry(path.to_string()).or_default();
    }

    fn selected_messages(&self) -> Result<&[StoredMessage]> {
        let folder = self
            .selected
            .as_deref()
            .ok_or_else(|| MailError::Imap("No mailbox selected".to_string()))?;
        Ok(self
            .messages
            .get(folder)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }
}

#[async_trait]
impl MailStore for MemoryStore {
    async fn list_folders(&mut self) -> Result<Vec<Folder>> {
        self.events.push("list".to_string());
        Ok(self.folders.clone())
    }

    async fn select(&mut self, folder: &str) -> Result<()> {
        self.events.push(format!("select {}", folder));
        if !self.messages.contains_key(folder) {
            return Err(MailError::Imap(format!("Mailbox doesn't exist: {}", folder)));
        }
        self.selected = Some(folder.to_string());
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        self.events.push("release".to_string());
        self.selected = None;
        Ok(())
    }

    async fn search(&mut self, expr: &SearchExpression) -> Result<Vec<u32>> {
        self.events.push(format!("search {}", expr.to_imap()));
        if self.fail_search {
            return Err(MailError::Imap("SEARCH failed".to_string()));
        }

        Ok(self
            .selected_messages()?
            .iter()
            .filter(|message| {
                let from = message
                    .raw
                    .from
                    .first()
                    .and_then(Address::display)
                    .unwrap_or_default();
                let target = MatchTarget {
                    subject: message.raw.subject.as_deref().unwrap_or_default(),
                    from: &from,
                    body: &message.body,
                    date: message.raw.effective_date().map(|d| d.date_naive()),
                };
                expr.matches(&target)
            })
            .map(|message| message.raw.uid)
            .collect())
    }

    async fn fetch_envelopes<'a>(&'a mut self, uids: &[u32]) -> Result<FetchCursor<'a>> {
        self.events.push(format!("fetch {:?}", uids));
        let raw = self
            .selected_messages()?
            .iter()
            .filter(|message| uids.contains(&message.raw.uid))
            .map(|message| message.raw.clone())
            .collect();
        Ok(FetchCursor::from_messages(raw))
    }

    async fn fetch_section(&mut self, uid: u32, part: BodyPart) -> Result<Option<Vec<u8>>> {
        self.events.push(format!("section {} {}", uid, part.section()));
        if self.fail_sections {
            return Err(MailError::Imap("FETCH BODY failed".to_string()));
        }

        Ok(self
            .selected_messages()?
            .iter()
            .find(|message| message.raw.uid == uid)
            .and_then(|message| message.sections.get(part.section()).cloned()))
    }

    async fn logout(&mut self) -> Result<()> {
        self.events.push("logout".to_string());
        Ok(())
    }
}

/// Records delivered messages instead of sending them
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub delivered: Vec<Message>,
    pub fail_with: Option<String>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&mut self, message: Message) -> Result<String> {
        if let Some(reason) = &self.fail_with {
            return Err(MailError::Transport(reason.clone()));
        }
        self.delivered.push(message);
        Ok("250 2.0.0 OK queued".to_string())
    }
}
