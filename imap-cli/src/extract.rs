//! Best-effort plain-text body extraction
//!
//! Strategies run in order until one returns content. A miss is a value,
//! not an error: when every strategy misses the body becomes a placeholder
//! and the read still succeeds.

use crate::store::{BodyPart, MailStore};
use tracing::debug;

pub const EMPTY_BODY: &str = "(Empty body)";
pub const EXTRACTION_FAILED: &str = "(Body extraction failed - complex content structure)";

/// Sections tried, in order
pub const STRATEGIES: &[BodyPart] = &[BodyPart::FirstPartText, BodyPart::FirstPart];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Content(String),
    Miss(Miss),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    /// Server answered without the section
    NotReturned,
    /// The fetch itself failed
    Failed(String),
}

/// Run one strategy
pub async fn try_part<S>(store: &mut S, uid: u32, part: BodyPart) -> Extraction
where
    S: MailStore + ?Sized,
{
    match store.fetch_section(uid, part).await {
        Ok(Some(bytes)) => Extraction::Content(body_text(&bytes)),
        Ok(None) => Extraction::Miss(Miss::NotReturned),
        Err(e) => Extraction::Miss(Miss::Failed(e.to_string())),
    }
}

/// Body text for `uid`, or [`EXTRACTION_FAILED`] when all strategies miss
pub async fn extract_body<S>(store: &mut S, uid: u32) -> String
where
    S: MailStore + ?Sized,
{
    for part in STRATEGIES {
        match try_part(store, uid, *part).await {
            Extraction::Content(text) => return text,
            Extraction::Miss(miss) => {
                debug!("Body section {} of UID {} missed: {:?}", part.section(), uid, miss);
            }
        }
    }

    EXTRACTION_FAILED.to_string()
}

fn body_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        EMPTY_BODY.to_string()
    } else {
        trimmed.to_string()
    }
}
