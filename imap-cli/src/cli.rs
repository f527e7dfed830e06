//! Command-line definitions
//!
//! ```bash
//! # List folders
//! imapcli folders
//!
//! # Ten most recent messages of INBOX as JSON
//! imapcli recent --limit 10 --json
//!
//! # Search a date range
//! imapcli search invoice --after 2024-01-01 --before 2024-01-31
//!
//! # Read one message
//! imapcli read 42 --folder Archive
//!
//! # Send a message whose body comes from a file
//! imapcli send --to a@example.com --subject hi --body-file body.txt
//! ```

use crate::fetch::{DEFAULT_FOLDER, DEFAULT_RECENT_LIMIT, DEFAULT_SEARCH_LIMIT};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "imapcli")]
#[command(version, about = "List, search, read and send email over IMAP and SMTP", long_about = None)]
pub struct Cli {
    /// TOML config file; environment variables override it
    #[arg(long, global = true, env = "IMAPCLI_CONFIG")]
    pub config: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List all folders
    Folders {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent messages of a folder
    Recent {
        /// Number of messages
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
        /// Folder to read
        #[arg(short, long, default_value = DEFAULT_FOLDER)]
        folder: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search messages
    Search {
        /// Text matched against subject or body
        query: Option<String>,
        /// Sender address
        #[arg(long)]
        from: Option<String>,
        /// Subject substring
        #[arg(long)]
        subject: Option<String>,
        /// Messages on or after this date (YYYY-MM-DD)
        #[arg(long)]
        after: Option<String>,
        /// Messages before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,
        /// Folder to search
        #[arg(short, long, default_value = DEFAULT_FOLDER)]
        folder: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read one message by UID
    Read {
        /// Message UID
        uid: u32,
        /// Folder containing the message
        #[arg(short, long, default_value = DEFAULT_FOLDER)]
        folder: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a plain-text message
    Send {
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Subject line
        #[arg(short, long)]
        subject: String,
        /// Body text
        #[arg(short, long)]
        body: Option<String>,
        /// Read the body from a file (takes precedence over --body)
        #[arg(long)]
        body_file: Option<PathBuf>,
        /// CC recipients, comma-separated
        #[arg(long)]
        cc: Option<String>,
        /// BCC recipients, comma-separated
        #[arg(long)]
        bcc: Option<String>,
    },
}

impl Cli {
    /// Filter directive for the log subscriber
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
