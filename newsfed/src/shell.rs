//! Interactive command loop: `login`, `logout`, `post`, `news`, `list`, `delete`, `exit`.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::clients::agency::AgencyClient;
use crate::error::NewsError;
use crate::filter::QueryFilter;
use crate::models::{Category, Region, StoryDraft};
use crate::render;
use crate::session::SessionManager;

pub const PROMPT: &str = "Enter command (login + URL, logout, post, news, list, delete, exit): ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Logout,
    Post,
    News(QueryFilter),
    List,
    Delete(String),
    Exit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Query(#[from] NewsError),
}

impl Command {
    /// Parse one input line. Blank lines give `Ok(None)`. `news` arguments are fully
    /// validated here, so a bad query never reaches the network.
    pub fn parse(line: &str) -> std::result::Result<Option<Command>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("login", [target]) => Command::Login(target.to_string()),
            ("login", _) => return Err(CommandError::Usage("login <url|local>")),
            ("logout", []) => Command::Logout,
            ("post", []) => Command::Post,
            ("news", tokens) => Command::News(QueryFilter::parse(tokens)?),
            ("list", []) => Command::List,
            ("delete", [key]) => Command::Delete(key.to_string()),
            ("delete", _) => return Err(CommandError::Usage("delete <story key>")),
            ("exit", []) => Command::Exit,
            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };
        Ok(Some(command))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell<R, W> {
    input: R,
    out: W,
    sessions: SessionManager,
    agency: Arc<AgencyClient>,
    aggregator: Aggregator,
}

impl<R, W> Shell<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W, sessions: SessionManager, agency: Arc<AgencyClient>, aggregator: Aggregator) -> Self {
        Self {
            input,
            out,
            sessions,
            agency,
            aggregator,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Read and execute commands until `exit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.write_prompt(PROMPT)?;
            let Some(line) = self.read_line().await? else {
                break;
            };
            if self.execute(&line).await? == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    /// Execute a single command line. Command failures are printed, never returned;
    /// the error path is reserved for I/O on the shell's own streams.
    pub async fn execute(&mut self, line: &str) -> Result<Flow> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(e) => {
                writeln!(self.out, "{}", e)?;
                return Ok(Flow::Continue);
            }
        };
        debug!(?command, "executing");

        match command {
            Command::Login(target) => self.login(&target).await,
            Command::Logout => {
                if self.sessions.logout(&*self.agency).await {
                    writeln!(self.out, "Logged out successfully.")?;
                } else {
                    writeln!(self.out, "Not logged in.")?;
                }
                Ok(Flow::Continue)
            }
            Command::Post => self.post().await,
            Command::News(filter) => {
                match self.aggregator.query(&filter).await {
                    Ok(outcome) => writeln!(self.out, "{}", render::outcome(&outcome))?,
                    Err(e) => writeln!(self.out, "{}", e)?,
                }
                Ok(Flow::Continue)
            }
            Command::List => {
                match self.aggregator.directory().list_agencies().await {
                    Ok(agencies) if agencies.is_empty() => writeln!(self.out, "No agencies found.")?,
                    Ok(agencies) => {
                        for agency in &agencies {
                            writeln!(self.out, "{}", render::agency(agency))?;
                        }
                    }
                    Err(e) => writeln!(self.out, "Failed to list agencies: {}", e)?,
                }
                Ok(Flow::Continue)
            }
            Command::Delete(key) => {
                match self.sessions.delete_story(&*self.agency, &key).await {
                    Ok(()) => writeln!(self.out, "Story deleted successfully.")?,
                    Err(e) => writeln!(self.out, "Failed to delete story: {}", e)?,
                }
                Ok(Flow::Continue)
            }
            Command::Exit => Ok(Flow::Exit),
        }
    }

    async fn login(&mut self, target: &str) -> Result<Flow> {
        // Reject a bad URL before asking for credentials.
        if let Err(e) = self.sessions.resolve_target(target) {
            writeln!(self.out, "{}", e)?;
            return Ok(Flow::Continue);
        }
        let Some(username) = self.prompt("Enter username: ").await? else {
            return Ok(Flow::Exit);
        };
        let Some(password) = self.prompt("Enter password: ").await? else {
            return Ok(Flow::Exit);
        };

        match self.sessions.login(&*self.agency, target, &username, &password).await {
            Ok(session) => {
                let agency = session.agency_base_url.clone();
                writeln!(self.out, "Logged in successfully to {}.", agency)?;
            }
            Err(e) => writeln!(self.out, "Failed to log in: {}", e)?,
        }
        Ok(Flow::Continue)
    }

    async fn post(&mut self) -> Result<Flow> {
        if let Err(e) = self.sessions.active() {
            writeln!(self.out, "{}.", e)?;
            return Ok(Flow::Continue);
        }

        let categories = Category::ALL.map(Category::code).join(", ");
        let regions = Region::ALL.map(Region::code).join(", ");

        let Some(headline) = self.prompt_required("Enter headline: ").await? else {
            return Ok(Flow::Exit);
        };
        let Some(category) = self.prompt_required(&format!("Enter category: {{{}}} ", categories)).await? else {
            return Ok(Flow::Exit);
        };
        let Some(region) = self.prompt_required(&format!("Enter region: {{{}}} ", regions)).await? else {
            return Ok(Flow::Exit);
        };
        let Some(details) = self.prompt_required("Enter details: ").await? else {
            return Ok(Flow::Exit);
        };

        let draft = StoryDraft { headline, category, region, details };
        match self.sessions.post_story(&*self.agency, &draft).await {
            Ok(()) => writeln!(self.out, "Story posted successfully.")?,
            Err(e) => writeln!(self.out, "Failed to post story: {}", e)?,
        }
        Ok(Flow::Continue)
    }

    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        self.write_prompt(label)?;
        Ok(self.read_line().await?.map(|line| line.trim().to_string()))
    }

    /// Prompt until a non-blank answer is given. `None` at end of input.
    async fn prompt_required(&mut self, label: &str) -> Result<Option<String>> {
        loop {
            match self.prompt(label).await? {
                Some(answer) if answer.is_empty() => {
                    writeln!(self.out, "Input cannot be empty. Please try again.")?;
                }
                other => return Ok(other),
            }
        }
    }

    /// Next input line without its terminator. Bytes that are not UTF-8 are replaced, so a
    /// garbled line becomes an ordinary bad command. `None` at end of input.
    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw).await? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&raw);
        Ok(Some(line.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string()))
    }

    fn write_prompt(&mut self, label: &str) -> Result<()> {
        write!(self.out, "{}", label)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("login local").unwrap(), Some(Command::Login("local".into())));
        assert_eq!(Command::parse("logout").unwrap(), Some(Command::Logout));
        assert_eq!(Command::parse("post").unwrap(), Some(Command::Post));
        assert_eq!(Command::parse("list").unwrap(), Some(Command::List));
        assert_eq!(Command::parse("delete 42").unwrap(), Some(Command::Delete("42".into())));
        assert_eq!(Command::parse("exit").unwrap(), Some(Command::Exit));
        assert_eq!(Command::parse("news").unwrap(), Some(Command::News(QueryFilter::default())));

        match Command::parse("news -cat=tech -id=XY").unwrap() {
            Some(Command::News(filter)) => {
                assert!(filter.selects_agency("XY"));
                assert_eq!(filter.category.as_exact(), Some(&Category::Tech));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_commands() {
        assert_eq!(Command::parse("login").unwrap_err(), CommandError::Usage("login <url|local>"));
        assert_eq!(Command::parse("delete").unwrap_err(), CommandError::Usage("delete <story key>"));
        assert_eq!(Command::parse("fetch all").unwrap_err(), CommandError::Unknown("fetch all".into()));
        assert_eq!(Command::parse("exit now").unwrap_err(), CommandError::Unknown("exit now".into()));
        assert_eq!(
            Command::parse("news -cat=sports").unwrap_err(),
            CommandError::Query(NewsError::InvalidValue { key: "category".into(), value: "sports".into() })
        );
    }
}
