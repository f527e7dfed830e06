//! Connection settings
//!
//! Settings come from the environment, optionally layered on top of a TOML
//! file. Defaults target a mail bridge listening on the loopback interface.

use crate::error::{MailError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_IMAP_PORT: u16 = 1143;
pub const DEFAULT_SMTP_PORT: u16 = 1025;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub imap: ServerConfig,
    pub smtp: ServerConfig,
    pub tls: TlsConfig,
}

#[derive(Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
}

/// Certificate handling for STARTTLS upgrades.
///
/// Verification is off by default: local bridges present self-signed
/// certificates. Set `MAIL_TLS_VERIFY=true` to check against the webpki roots.
#[derive(Debug, Clone, PartialEq)]
pub struct TlsConfig {
    pub verify: bool,
}

/// Login pair for one protocol
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

/// On-disk layout; every field is optional so a file can set just a few keys
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub imap: FileServerConfig,
    #[serde(default)]
    pub smtp: FileServerConfig,
    #[serde(default)]
    pub tls: FileTlsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub pass: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTlsConfig {
    pub verify: Option<bool>,
}

impl Config {
    /// Load settings: optional file first, environment on top
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Self::read_file(path)?,
            None => FileConfig::default(),
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MailError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| MailError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Merge a file layer with variables provided by `env`.
    ///
    /// Empty variables count as unset. SMTP credentials fall back to the
    /// IMAP ones when neither layer sets them.
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|value| !value.is_empty());

        let imap = ServerConfig {
            host: var("IMAP_HOST")
                .or(file.imap.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: match var("IMAP_PORT") {
                Some(raw) => parse_port("IMAP_PORT", &raw)?,
                None => file.imap.port.unwrap_or(DEFAULT_IMAP_PORT),
            },
            user: var("IMAP_USER").or(file.imap.user),
            pass: var("IMAP_PASS").or(file.imap.pass),
        };

        let smtp = ServerConfig {
            host: var("SMTP_HOST")
                .or(file.smtp.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: match var("SMTP_PORT") {
                Some(raw) => parse_port("SMTP_PORT", &raw)?,
                None => file.smtp.port.unwrap_or(DEFAULT_SMTP_PORT),
            },
            user: var("SMTP_USER")
                .or(file.smtp.user)
                .or_else(|| imap.user.clone()),
            pass: var("SMTP_PASS")
                .or(file.smtp.pass)
                .or_else(|| imap.pass.clone()),
        };

        let verify = match var("MAIL_TLS_VERIFY") {
            Some(raw) => parse_bool("MAIL_TLS_VERIFY", &raw)?,
            None => file.tls.verify.unwrap_or(false),
        };

        Ok(Self {
            imap,
            smtp,
            tls: TlsConfig { verify },
        })
    }

    pub fn imap_credentials(&self) -> Result<Credentials> {
        self.imap.credentials("IMAP")
    }

    pub fn smtp_credentials(&self) -> Result<Credentials> {
        self.smtp.credentials("SMTP")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            imap: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_IMAP_PORT,
                user: None,
                pass: None,
            },
            smtp: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_SMTP_PORT,
                user: None,
                pass: None,
            },
            tls: TlsConfig { verify: false },
        }
    }
}

impl ServerConfig {
    fn credentials(&self, protocol: &'static str) -> Result<Credentials> {
        match (&self.user, &self.pass) {
            (Some(user), Some(pass)) => Ok(Credentials {
                user: user.clone(),
                pass: pass.clone(),
            }),
            _ => Err(MailError::MissingCredentials { protocol }),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "***"))
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"***")
            .finish()
    }
}

fn parse_port(key: &str, raw: &str) -> Result<u16> {
    raw.trim()
        .parse()
        .map_err(|_| MailError::Config(format!("{} must be a port number, got '{}'", key, raw)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MailError::Config(format!(
            "{} must be true or false, got '{}'",
            key, raw
        ))),
    }
}
