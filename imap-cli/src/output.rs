//! Output formatting
//!
//! Every command renders either pretty JSON or a fixed text layout. Output
//! is built as a whole string so nothing reaches stdout when a command fails
//! halfway.

use crate::error::Result;
use crate::fetch::Page;
use crate::message::{Folder, MessageDetail, MessageSummary, SendReceipt};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const RULE_WIDTH: usize = 60;
pub const UNKNOWN_DATE: &str = "(unknown date)";
pub const UNREAD_MARKER: &str = "[UNREAD] ";

/// Pretty-printed JSON with the record's field order
pub fn to_json<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn folders_text(folders: &[Folder]) -> String {
    let mut lines = vec!["Available Folders:".to_string()];
    for folder in folders {
        match &folder.special_use {
            Some(special) => lines.push(format!("  {} ({})", folder.path, special)),
            None => lines.push(format!("  {}", folder.path)),
        }
    }
    lines.join("\n")
}

pub fn recent_text(page: &Page, folder: &str, limit: usize) -> String {
    with_entries(
        format!("Recent {} emails from {}:", limit, folder),
        &page.messages,
    )
}

pub fn search_text(page: &Page) -> String {
    if page.messages.is_empty() {
        return "No emails found matching the search criteria.".to_string();
    }

    with_entries(
        format!(
            "Found {} emails (showing first {}):",
            page.total,
            page.messages.len()
        ),
        &page.messages,
    )
}

/// Numbered entries: header line, indented sender and date, blank line
/// between entries and none after the last
pub fn summaries_text(messages: &[MessageSummary]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let unread = if message.is_unread() { UNREAD_MARKER } else { "" };
            format!(
                "{}. {}UID:{} - {}\n   From: {}\n   Date: {}",
                i + 1,
                unread,
                message.uid,
                message.subject,
                message.from,
                short_date(message.date)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn with_entries(header: String, messages: &[MessageSummary]) -> String {
    if messages.is_empty() {
        return header;
    }
    format!("{}\n{}", header, summaries_text(messages))
}

pub fn detail_text(detail: &MessageDetail) -> String {
    let mut lines = vec![
        rule(),
        format!("Subject: {}", detail.subject),
        format!("From: {}", detail.from),
        format!("To: {}", detail.to.join(", ")),
    ];
    if !detail.cc.is_empty() {
        lines.push(format!("CC: {}", detail.cc.join(", ")));
    }
    lines.push(format!("Date: {}", long_date(detail.date)));
    lines.push(format!("UID: {}", detail.uid));
    lines.push(format!(
        "Flags: {}",
        if detail.flags.is_empty() {
            "None".to_string()
        } else {
            detail.flags.join(", ")
        }
    ));
    lines.push(rule());
    lines.push(String::new());
    lines.push(detail.body.clone());
    lines.push(String::new());
    lines.push(rule());

    lines.join("\n")
}

pub fn send_text(receipt: &SendReceipt) -> String {
    [
        "Email sent successfully!".to_string(),
        format!("Message ID: {}", receipt.message_id),
        format!("To: {}", receipt.to),
        format!("Subject: {}", receipt.subject),
    ]
    .join("\n")
}

fn short_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

fn long_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}
