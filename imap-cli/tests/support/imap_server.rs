//! Scripted IMAP server for driving the real adapter over TCP
//!
//! Speaks just enough IMAP4rev1 for the commands the client issues.
//! STARTTLS is refused so sessions stay in plaintext. Every command line is
//! recorded without its tag.

use imap_cli::config::{Config, FileConfig};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

pub const USER: &str = "alice@example.com";
pub const PASS: &str = "bridge-secret";

/// A message held by the server, with its FETCH items pre-rendered
#[derive(Debug, Clone)]
pub struct ServerMessage {
    pub uid: u32,
    pub flags: &'static str,
    pub internal_date: &'static str,
    pub size: u32,
    pub envelope: String,
    pub sections: HashMap<&'static str, &'static str>,
}

impl ServerMessage {
    /// `from` is `(name, mailbox, host)`
    pub fn new(uid: u32, date: &str, subject: &str, from: (&str, &str, &str)) -> Self {
        let (name, mailbox, host) = from;
        let sender = format!("((\"{}\" NIL \"{}\" \"{}\"))", name, mailbox, host);
        let envelope = format!(
            "(\"{date}\" \"{subject}\" {sender} {sender} {sender} ((\"Me\" NIL \"me\" \"example.com\")) NIL NIL NIL \"<{uid}@example.com>\")",
            date = date,
            subject = subject,
            sender = sender,
            uid = uid
        );

        Self {
            uid,
            flags: "\\Seen",
            internal_date: "10-Jan-2024 12:00:00 +0000",
            size: 1024,
            envelope,
            sections: HashMap::new(),
        }
    }

    pub fn with_section(mut self, section: &'static str, content: &'static str) -> Self {
        self.sections.insert(section, content);
        self
    }

    pub fn unread(mut self) -> Self {
        self.flags = "";
        self
    }
}

pub struct ScriptedImap {
    pub addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
}

impl ScriptedImap {
    /// Serve `messages` as the content of INBOX until the test ends
    pub async fn start(messages: Vec<ServerMessage>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let messages = Arc::new(messages);

        let log = commands.clone();
        tokio::spawn(async move {
            loop {
                if let Ok((socket, _)) = listener.accept().await {
                    let messages = messages.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let _ = serve(socket, &messages, &log).await;
                    });
                }
            }
        });

        Self { addr, commands }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Command lines received so far, tags stripped
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Command names only: `LOGIN`, `UID FETCH`, ...
    pub fn verbs(&self) -> Vec<String> {
        self.commands()
            .iter()
            .map(|command| {
                let mut words = command.split(' ');
                let first = words.next().unwrap_or_default().to_ascii_uppercase();
                match words.next() {
                    Some(second) if first == "UID" => format!("UID {}", second.to_ascii_uppercase()),
                    _ => first,
                }
            })
            .collect()
    }

    pub fn config(&self) -> Config {
        self.config_with(USER, PASS)
    }

    pub fn config_with(&self, user: &str, pass: &str) -> Config {
        let port = self.port().to_string();
        Config::resolve(FileConfig::default(), |key| match key {
            "IMAP_PORT" => Some(port.clone()),
            "IMAP_USER" => Some(user.to_string()),
            "IMAP_PASS" => Some(pass.to_string()),
            _ => None,
        })
        .unwrap()
    }
}

async fn serve(
    socket: TcpStream,
    messages: &[ServerMessage],
    log: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    write_line(&mut writer, "* OK [CAPABILITY IMAP4rev1] Scripted IMAP ready").await?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }

        let Some((tag, command)) = line.trim_end().split_once(' ') else {
            continue;
        };
        let (tag, command) = (tag.to_string(), command.to_string());
        log.lock().unwrap().push(command.clone());
        let upper = command.to_ascii_uppercase();

        if upper == "STARTTLS" {
            write_line(&mut writer, &format!("{} BAD STARTTLS not supported", tag)).await?;
        } else if upper.starts_with("LOGIN ") {
            if command.contains(USER) && command.contains(PASS) {
                write_line(&mut writer, &format!("{} OK LOGIN completed", tag)).await?;
            } else {
                write_line(&mut writer, &format!("{} NO [AUTHENTICATIONFAILED] Invalid credentials", tag))
                    .await?;
            }
        } else if upper.starts_with("LIST ") {
            write_line(&mut writer, "* LIST (\\HasNoChildren) \"/\" \"INBOX\"").await?;
            write_line(&mut writer, "* LIST (\\HasNoChildren \\Sent) \"/\" \"Sent\"").await?;
            write_line(&mut writer, &format!("{} OK LIST completed", tag)).await?;
        } else if upper.starts_with("SELECT ") {
            if upper.contains("INBOX") {
                write_line(&mut writer, "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)").await?;
                write_line(&mut writer, &format!("* {} EXISTS", messages.len())).await?;
                write_line(&mut writer, "* 0 RECENT").await?;
                write_line(&mut writer, "* OK [UIDVALIDITY 1] UIDs valid").await?;
                write_line(&mut writer, &format!("{} OK [READ-WRITE] SELECT completed", tag)).await?;
            } else {
                write_line(&mut writer, &format!("{} NO Mailbox does not exist", tag)).await?;
            }
        } else if upper.starts_with("UID SEARCH ") {
            let mut found = String::from("* SEARCH");
            for message in messages {
                found.push_str(&format!(" {}", message.uid));
            }
            write_line(&mut writer, &found).await?;
            write_line(&mut writer, &format!("{} OK SEARCH completed", tag)).await?;
        } else if upper.starts_with("UID FETCH ") {
            uid_fetch(&mut writer, messages, &command["UID FETCH ".len()..]).await?;
            write_line(&mut writer, &format!("{} OK FETCH completed", tag)).await?;
        } else if upper == "CLOSE" {
            write_line(&mut writer, &format!("{} OK CLOSE completed", tag)).await?;
        } else if upper == "LOGOUT" {
            write_line(&mut writer, &format!("{} OK LOGOUT completed", tag)).await?;
            return Ok(());
        } else {
            write_line(&mut writer, &format!("{} BAD Unknown command", tag)).await?;
        }
    }
}

/// Answer `UID FETCH <set> <items>` for the UIDs the server holds
async fn uid_fetch(
    writer: &mut OwnedWriteHalf,
    messages: &[ServerMessage],
    args: &str,
) -> std::io::Result<()> {
    let (set, items) = args.split_once(' ').unwrap_or((args, ""));
    let wanted: Vec<u32> = set.split(',').filter_map(|uid| uid.parse().ok()).collect();
    let section = items
        .split_once("BODY.PEEK[")
        .and_then(|(_, rest)| rest.split_once(']'))
        .map(|(section, _)| section);

    for (index, message) in messages.iter().enumerate() {
        if !wanted.contains(&message.uid) {
            continue;
        }
        let seq = index + 1;

        match section {
            Some(section) => {
                if let Some(content) = message.sections.get(section) {
                    let head = format!(
                        "* {} FETCH (UID {} BODY[{}] {{{}}}\r\n",
                        seq,
                        message.uid,
                        section,
                        content.len()
                    );
                    writer.write_all(head.as_bytes()).await?;
                    writer.write_all(content.as_bytes()).await?;
                    writer.write_all(b")\r\n").await?;
                }
            }
            None => {
                let line = format!(
                    "* {} FETCH (UID {} FLAGS ({}) INTERNALDATE \"{}\" RFC822.SIZE {} ENVELOPE {})",
                    seq, message.uid, message.flags, message.internal_date, message.size, message.envelope
                );
                write_line(writer, &line).await?;
            }
        }
    }
    Ok(())
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(format!("{}\r\n", line).as_bytes()).await
}
