//! Fetch and normalize
//!
//! Runs a compiled search through a [`MailStore`], turns envelopes into
//! summaries, sorts newest first and truncates. Each operation selects its
//! folder and releases it again whether or not the operation succeeded.

use crate::error::{MailError, Result};
use crate::extract;
use crate::message::{Folder, MessageDetail, MessageSummary};
use crate::search::{FilterSet, SearchExpression};
use crate::store::MailStore;
use tracing::{debug, warn};

pub const DEFAULT_FOLDER: &str = "INBOX";
pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// A truncated result set
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Messages that matched on the server
    pub total: usize,
    /// At most `limit` of them, newest first
    pub messages: Vec<MessageSummary>,
}

pub async fn list_folders<S>(store: &mut S) -> Result<Vec<Folder>>
where
    S: MailStore + ?Sized,
{
    store.list_folders().await
}

/// The `limit` most recent messages of `folder`
pub async fn recent<S>(store: &mut S, folder: &str, limit: usize) -> Result<Page>
where
    S: MailStore + ?Sized,
{
    search(store, folder, &FilterSet::default(), limit).await
}

/// The `limit` most recent messages of `folder` matching `filters`
pub async fn search<S>(store: &mut S, folder: &str, filters: &FilterSet, limit: usize) -> Result<Page>
where
    S: MailStore + ?Sized,
{
    let expr = filters.compile();

    store.select(folder).await?;
    let outcome = search_selected(store, &expr, limit).await;
    release(store, folder).await;

    outcome
}

/// One message with recipients and body
pub async fn read<S>(store: &mut S, folder: &str, uid: u32) -> Result<MessageDetail>
where
    S: MailStore + ?Sized,
{
    store.select(folder).await?;
    let outcome = read_selected(store, folder, uid).await;
    release(store, folder).await;

    outcome
}

async fn search_selected<S>(store: &mut S, expr: &SearchExpression, limit: usize) -> Result<Page>
where
    S: MailStore + ?Sized,
{
    let uids = store.search(expr).await?;
    let total = uids.len();
    debug!("{} message(s) matched {}", total, expr.to_imap());

    if total == 0 {
        return Ok(Page {
            total,
            messages: Vec::new(),
        });
    }

    let raw = store.fetch_envelopes(&uids).await?.collect_all().await?;
    let mut messages: Vec<MessageSummary> = raw.iter().map(MessageSummary::from_raw).collect();

    sort_newest_first(&mut messages);
    messages.truncate(limit);

    Ok(Page { total, messages })
}

async fn read_selected<S>(store: &mut S, folder: &str, uid: u32) -> Result<MessageDetail>
where
    S: MailStore + ?Sized,
{
    let raw = store
        .fetch_envelopes(&[uid])
        .await?
        .collect_all()
        .await?
        .into_iter()
        .find(|message| message.uid == uid)
        .ok_or_else(|| MailError::NotFound {
            uid,
            folder: folder.to_string(),
        })?;

    let body = extract::extract_body(store, uid).await;
    Ok(MessageDetail::from_raw(&raw, body))
}

/// Release the folder lock; a failure here must not hide the operation's result
async fn release<S>(store: &mut S, folder: &str)
where
    S: MailStore + ?Sized,
{
    if let Err(e) = store.release().await {
        warn!("Failed to release folder {}: {}", folder, e);
    }
}

/// Date descending, undated last, newer UID first on ties
pub fn sort_newest_first(messages: &mut [MessageSummary]) {
    messages.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.uid.cmp(&a.uid)));
}
