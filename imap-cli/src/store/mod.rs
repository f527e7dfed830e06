//! Mail store abstraction
//!
//! Everything the commands need from an IMAP server, behind a trait so the
//! fetch pipeline can run against an in-memory store in tests.

pub mod imap;
pub mod tls;

use crate::error::Result;
use crate::message::{Folder, RawMessage};
use crate::search::SearchExpression;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};

pub use self::imap::ImapStore;

/// Body sections tried when reading a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    /// `1.TEXT` - text of the first part
    FirstPartText,
    /// `1` - the first MIME part
    FirstPart,
}

impl BodyPart {
    pub fn section(&self) -> &'static str {
        match self {
            BodyPart::FirstPartText => "1.TEXT",
            BodyPart::FirstPart => "1",
        }
    }
}

/// Connected, authenticated mailbox access.
///
/// `select` takes the folder lock that `search`, `fetch_envelopes` and
/// `fetch_section` operate under; `release` gives it back. Callers must call
/// `release` before `logout` on every path once `select` succeeded.
#[async_trait]
pub trait MailStore: Send {
    async fn list_folders(&mut self) -> Result<Vec<Folder>>;

    async fn select(&mut self, folder: &str) -> Result<()>;

    async fn release(&mut self) -> Result<()>;

    /// UIDs matching the expression in the selected folder
    async fn search(&mut self, expr: &SearchExpression) -> Result<Vec<u32>>;

    /// Envelope metadata only; bodies are never downloaded here
    async fn fetch_envelopes<'a>(&'a mut self, uids: &[u32]) -> Result<FetchCursor<'a>>;

    /// Raw bytes of one body section, `None` if the server returned nothing
    async fn fetch_section(&mut self, uid: u32, part: BodyPart) -> Result<Option<Vec<u8>>>;

    async fn logout(&mut self) -> Result<()>;
}

/// Single-pass cursor over fetched messages.
///
/// Once the underlying stream ends the cursor is exhausted for good and
/// keeps returning `None`.
pub struct FetchCursor<'a> {
    stream: Option<BoxStream<'a, Result<RawMessage>>>,
}

impl<'a> FetchCursor<'a> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<RawMessage>> + Send + 'a,
    {
        Self {
            stream: Some(stream.boxed()),
        }
    }

    pub fn from_messages(messages: Vec<RawMessage>) -> Self {
        Self::new(stream::iter(messages.into_iter().map(Ok)))
    }

    pub fn empty() -> Self {
        Self { stream: None }
    }

    pub async fn next_message(&mut self) -> Option<Result<RawMessage>> {
        let item = self.stream.as_mut()?.next().await;
        if item.is_none() {
            self.stream = None;
        }
        item
    }

    pub fn is_exhausted(&self) -> bool {
        self.stream.is_none()
    }

    /// Drain the cursor, stopping at the first error
    pub async fn collect_all(mut self) -> Result<Vec<RawMessage>> {
        let mut messages = Vec::new();
        while let Some(item) = self.next_message().await {
            messages.push(item?);
        }
        Ok(messages)
    }
}
