//! Command dispatch
//!
//! Every command produces its complete output as a string; the binary
//! prints it only once the command has succeeded.

use crate::cli::Command;
use crate::config::Config;
use crate::error::Result;
use crate::fetch;
use crate::output;
use crate::search::FilterSet;
use crate::send::{self, OutgoingMessage, SmtpTransport};
use crate::store::{ImapStore, MailStore};
use std::path::Path;
use tracing::warn;

/// A read-only request against the mail store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Folders {
        json: bool,
    },
    Recent {
        folder: String,
        limit: usize,
        json: bool,
    },
    Search {
        folder: String,
        filters: FilterSet,
        limit: usize,
        json: bool,
    },
    Read {
        folder: String,
        uid: u32,
        json: bool,
    },
}

pub async fn dispatch(command: Command, config: &Config) -> Result<String> {
    match command {
        Command::Folders { json } => run_query(config, Query::Folders { json }).await,
        Command::Recent { limit, folder, json } => {
            run_query(config, Query::Recent { folder, limit, json }).await
        }
        Command::Search {
            query: text,
            from,
            subject,
            after,
            before,
            folder,
            limit,
            json,
        } => {
            // Dates are validated here, before any connection is made
            let filters = FilterSet::from_args(
                text.as_deref(),
                from.as_deref(),
                subject.as_deref(),
                after.as_deref(),
                before.as_deref(),
            )?;
            run_query(
                config,
                Query::Search {
                    folder,
                    filters,
                    limit,
                    json,
                },
            )
            .await
        }
        Command::Read { uid, folder, json } => run_query(config, Query::Read { folder, uid, json }).await,
        Command::Send {
            to,
            subject,
            body,
            body_file,
            cc,
            bcc,
        } => {
            send_message(
                config,
                &to,
                &subject,
                body.as_deref(),
                body_file.as_deref(),
                cc.as_deref(),
                bcc.as_deref(),
            )
            .await
        }
    }
}

/// Connect, run `query`, and log out whatever the outcome
async fn run_query(config: &Config, query: Query) -> Result<String> {
    let mut store = ImapStore::connect(config).await?;
    let outcome = execute(&mut store, &query).await;

    if let Err(e) = store.logout().await {
        warn!("IMAP logout failed: {}", e);
    }
    outcome
}

/// Run `query` against a connected store and render its output
pub async fn execute<S>(store: &mut S, query: &Query) -> Result<String>
where
    S: MailStore + ?Sized,
{
    match query {
        Query::Folders { json } => {
            let folders = fetch::list_folders(store).await?;
            if *json {
                output::to_json(&folders)
            } else {
                Ok(output::folders_text(&folders))
            }
        }
        Query::Recent {
            folder,
            limit,
            json,
        } => {
            let page = fetch::recent(store, folder, *limit).await?;
            if *json {
                output::to_json(&page.messages)
            } else {
                Ok(output::recent_text(&page, folder, *limit))
            }
        }
        Query::Search {
            folder,
            filters,
            limit,
            json,
        } => {
            let page = fetch::search(store, folder, filters, *limit).await?;
            if *json {
                output::to_json(&page.messages)
            } else {
                Ok(output::search_text(&page))
            }
        }
        Query::Read { folder, uid, json } => {
            let detail = fetch::read(store, folder, *uid).await?;
            if *json {
                output::to_json(&detail)
            } else {
                Ok(output::detail_text(&detail))
            }
        }
    }
}

/// Body and credentials are checked before the SMTP server is contacted
async fn send_message(
    config: &Config,
    to: &str,
    subject: &str,
    body: Option<&str>,
    body_file: Option<&Path>,
    cc: Option<&str>,
    bcc: Option<&str>,
) -> Result<String> {
    let body = send::resolve_body(body, body_file).await?;
    let credentials = config.smtp_credentials()?;
    let sender = credentials.user.clone();

    let outgoing = OutgoingMessage::new(to, subject, body, cc, bcc);
    let mut transport = SmtpTransport::new(config, credentials)?;
    let receipt = send::send(&mut transport, &sender, &outgoing).await?;

    Ok(output::send_text(&receipt))
}
