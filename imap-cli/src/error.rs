use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("{protocol} credentials not provided. Set {protocol}_USER and {protocol}_PASS environment variables.")]
    MissingCredentials { protocol: &'static str },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Invalid date format: {0}. Use YYYY-MM-DD format.")]
    InvalidDate(String),

    #[error("Email with UID {uid} not found in folder {folder}")]
    NotFound { uid: u32, folder: String },

    #[error("{0}")]
    Validation(String),

    #[error("Failed to read body file {}: {source}", path.display())]
    BodyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("{0}")]
    Transport(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<async_imap::error::Error> for MailError {
    fn from(err: async_imap::error::Error) -> Self {
        MailError::Imap(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MailError>;
