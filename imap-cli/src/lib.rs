//! imap-cli: scriptable IMAP/SMTP mail client
//!
//! Lists folders, lists and searches messages, reads single messages and
//! sends plain-text mail. Built for inspecting a local mail bridge from
//! scripts, so every listing is also available as JSON.
//!
//! # Features
//!
//! - **Search**: filters compile to IMAP `SEARCH` criteria
//! - **Listing**: envelope-only fetches, newest first, truncated to a limit
//! - **Read**: best-effort plain-text body extraction
//! - **Send**: SMTP with opportunistic STARTTLS
//!
//! # Example
//!
//! ```no_run
//! use imap_cli::config::Config;
//! use imap_cli::fetch;
//! use imap_cli::search::FilterSet;
//! use imap_cli::store::{ImapStore, MailStore};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let mut store = ImapStore::connect(&config).await?;
//!
//!     let filters = FilterSet::from_args(Some("invoice"), None, None, Some("2024-01-01"), None)?;
//!     let page = fetch::search(&mut store, "INBOX", &filters, 20).await?;
//!     store.logout().await?;
//!
//!     for message in page.messages {
//!         println!("{} {}", message.uid, message.subject);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`search`]: Filter compilation
//! - [`fetch`]: Search, sort and truncate
//! - [`extract`]: Body extraction
//! - [`output`]: Text and JSON rendering
//! - [`send`]: Outgoing mail
//! - [`store`]: IMAP session and TLS

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod message;
pub mod output;
pub mod search;
pub mod send;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{MailError, Result};
