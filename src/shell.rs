//! Interactive shell
//!
//! Line-oriented command interpreter used by `kvlog-cli`. Runs against any
//! `Backend`: a remote server through `Client`, or a local log file through
//! `StoreService`.

use std::io::{BufRead, Write};

use crate::error::{KvError, Result};
use crate::network::Client;
use crate::protocol::{KeyValuePair, Response};
use crate::service::StoreService;

pub const HELP: &str = "Available commands: exit|quit|bye|help|set|get|list|remove";

/// Something the shell can issue commands against
pub trait Backend {
    fn get(&mut self, key: &str) -> Result<Response>;
    fn set(&mut self, key: &str, value: &str) -> Result<Response>;
    fn remove(&mut self, key: &str) -> Result<Response>;
    fn list(&mut self) -> Result<Vec<KeyValuePair>>;
}

impl Backend for Client {
    fn get(&mut self, key: &str) -> Result<Response> {
        Client::get(self, key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<Response> {
        Client::set(self, key, value)
    }

    fn remove(&mut self, key: &str) -> Result<Response> {
        Client::remove(self, key)
    }

    fn list(&mut self) -> Result<Vec<KeyValuePair>> {
        Client::list(self)?.collect()
    }
}

impl Backend for StoreService {
    fn get(&mut self, key: &str) -> Result<Response> {
        StoreService::get(self, key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<Response> {
        StoreService::set(self, key, value)
    }

    fn remove(&mut self, key: &str) -> Result<Response> {
        Ok(StoreService::remove(self, key))
    }

    fn list(&mut self) -> Result<Vec<KeyValuePair>> {
        StoreService::list(self)?
            .map(|record| record.map(KeyValuePair::from))
            .collect()
    }
}

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Exit,
    List,
    Get { key: String },
    Set { key: String, value: String },
    Remove { key: String },
}

impl ShellCommand {
    /// Parse one input line
    ///
    /// Keys are word characters (`[A-Za-z0-9_]+`); values are a single
    /// token without whitespace.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let command = match tokens.as_slice() {
            ["exit"] | ["quit"] | ["bye"] => ShellCommand::Exit,
            ["help"] => ShellCommand::Help,
            ["list"] => ShellCommand::List,
            ["get", key] => ShellCommand::Get {
                key: parse_key("get", key)?,
            },
            ["set", key, value] => ShellCommand::Set {
                key: parse_key("set", key)?,
                value: value.to_string(),
            },
            ["remove", key] => ShellCommand::Remove {
                key: parse_key("remove", key)?,
            },
            ["get", ..] | ["remove", ..] => {
                return Err(KvError::InvalidArgument(format!(
                    "{} takes exactly one key",
                    tokens[0]
                )))
            }
            ["set", ..] => {
                return Err(KvError::InvalidArgument(
                    "set takes a key and a value".to_string(),
                ))
            }
            _ => {
                return Err(KvError::InvalidArgument(format!(
                    "Unknown command: {}",
                    line.trim()
                )))
            }
        };
        Ok(command)
    }
}

fn parse_key(op: &str, key: &str) -> Result<String> {
    if key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(key.to_string())
    } else {
        Err(KvError::InvalidArgument(format!(
            "{} operation takes word-character keys, got {:?}",
            op, key
        )))
    }
}

/// What the shell should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this text and read the next command
    Continue(String),

    /// Leave the shell
    Exit,
}

/// Execute one command against `backend`
pub fn execute<B: Backend + ?Sized>(command: ShellCommand, backend: &mut B) -> Result<Outcome> {
    let text = match command {
        ShellCommand::Exit => return Ok(Outcome::Exit),
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::List => {
            let mut text = String::new();
            for pair in backend.list()? {
                text.push_str(&pair.key);
                text.push(':');
                text.push_str(&pair.value);
                text.push('\n');
            }
            text
        }
        ShellCommand::Get { key } => render(&backend.get(&key)?),
        ShellCommand::Set { key, value } => render(&backend.set(&key, &value)?),
        ShellCommand::Remove { key } => render(&backend.remove(&key)?),
    };
    Ok(Outcome::Continue(text))
}

fn render(response: &Response) -> String {
    match response {
        Response::Value(value) => value.clone(),
        Response::Error(message) => format!("Err -> {}", message),
    }
}

/// Read commands from `input` until exit or end of input
///
/// Errors from a single command are printed and the shell keeps going.
pub fn run<B, R, W>(backend: &mut B, input: R, mut output: W) -> Result<()>
where
    B: Backend + ?Sized,
    R: BufRead,
    W: Write,
{
    writeln!(output, "Entering shell. Type 'help' for list of available commands")?;
    write!(output, "> ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            write!(output, "> ")?;
            output.flush()?;
            continue;
        }

        let outcome = ShellCommand::parse(&line).and_then(|cmd| execute(cmd, backend));
        match outcome {
            Ok(Outcome::Exit) => {
                writeln!(output, "Exiting... Bye")?;
                return Ok(());
            }
            Ok(Outcome::Continue(text)) => writeln!(output, "{}", text.trim_end_matches('\n'))?,
            Err(KvError::InvalidArgument(message)) => writeln!(output, "{}", message)?,
            Err(e) => {
                tracing::debug!("Command failed: {}", e);
                writeln!(output, "An error occurred: {}", e)?;
            }
        }
        write!(output, "> ")?;
        output.flush()?;
    }

    writeln!(output)?;
    Ok(())
}
