//! Command Parsing
//!
//! Turns a decoded frame into a [`Command`]. Tokens are separated by runs of
//! whitespace; the first token names the command and is matched
//! case-insensitively. `SELECT` keeps the full frame text so the query reaches
//! the store exactly as the client wrote it.

use std::fmt;

/// The fixed command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `LOGIN <username> <password>`
    Login,
    /// `LOGOUT <username>`
    Logout,
    /// `ADD_FILE <username> <filename>`
    AddFile,
    /// `SELECT <query text>`
    Select,
    /// Anything else, including an empty frame
    Unknown,
}

impl CommandKind {
    /// Routes an upper-cased command name.
    fn from_name(name: &str) -> Self {
        match name {
            "LOGIN" => CommandKind::Login,
            "LOGOUT" => CommandKind::Logout,
            "ADD_FILE" => CommandKind::AddFile,
            "SELECT" => CommandKind::Select,
            _ => CommandKind::Unknown,
        }
    }

    /// Number of arguments the command requires, if fixed.
    pub fn arity(&self) -> Option<usize> {
        match self {
            CommandKind::Login | CommandKind::AddFile => Some(2),
            CommandKind::Logout => Some(1),
            CommandKind::Select | CommandKind::Unknown => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Login => "LOGIN",
            CommandKind::Logout => "LOGOUT",
            CommandKind::AddFile => "ADD_FILE",
            CommandKind::Select => "SELECT",
            CommandKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Where the command is routed
    pub kind: CommandKind,
    /// The command name, upper-cased (empty for an empty frame)
    pub name: String,
    /// Remaining tokens in order
    pub args: Vec<String>,
    /// The frame text with surrounding whitespace trimmed
    pub raw: String,
}

impl Command {
    /// Parses a frame into a command.
    ///
    /// # Example
    ///
    /// ```
    /// use stompsql::protocol::{Command, CommandKind};
    ///
    /// let cmd = Command::parse("add_file alice  notes.txt");
    /// assert_eq!(cmd.kind, CommandKind::AddFile);
    /// assert_eq!(cmd.args, vec!["alice", "notes.txt"]);
    /// ```
    pub fn parse(frame: &str) -> Self {
        let mut tokens = frame.split_whitespace();

        let name = tokens.next().map(str::to_uppercase).unwrap_or_default();
        let args = tokens.map(str::to_string).collect();

        Self {
            kind: CommandKind::from_name(&name),
            name,
            args,
            raw: frame.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login() {
        let cmd = Command::parse("LOGIN alice secret");
        assert_eq!(cmd.kind, CommandKind::Login);
        assert_eq!(cmd.name, "LOGIN");
        assert_eq!(cmd.args, vec!["alice", "secret"]);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(Command::parse("login a b").kind, CommandKind::Login);
        assert_eq!(Command::parse("LogOut a").kind, CommandKind::Logout);
        assert_eq!(Command::parse("add_file a f").kind, CommandKind::AddFile);
        assert_eq!(Command::parse("select 1").kind, CommandKind::Select);
    }

    #[test]
    fn test_whitespace_runs() {
        let cmd = Command::parse("  LOGIN\t alice \n secret  ");
        assert_eq!(cmd.kind, CommandKind::Login);
        assert_eq!(cmd.args, vec!["alice", "secret"]);
    }

    #[test]
    fn test_select_keeps_raw_text() {
        let cmd = Command::parse("SELECT username,  filename FROM files WHERE filename = 'a  b'");
        assert_eq!(cmd.kind, CommandKind::Select);
        assert_eq!(
            cmd.raw,
            "SELECT username,  filename FROM files WHERE filename = 'a  b'"
        );
    }

    #[test]
    fn test_empty_frame() {
        let cmd = Command::parse("");
        assert_eq!(cmd.kind, CommandKind::Unknown);
        assert!(cmd.name.is_empty());
        assert!(cmd.args.is_empty());

        assert_eq!(Command::parse("   ").kind, CommandKind::Unknown);
    }

    #[test]
    fn test_unknown() {
        let cmd = Command::parse("FOO bar");
        assert_eq!(cmd.kind, CommandKind::Unknown);
        assert_eq!(cmd.name, "FOO");

        // Prefix matches are not commands
        assert_eq!(Command::parse("SELECTX 1").kind, CommandKind::Unknown);
    }

    #[test]
    fn test_arity() {
        assert_eq!(CommandKind::Login.arity(), Some(2));
        assert_eq!(CommandKind::Logout.arity(), Some(1));
        assert_eq!(CommandKind::AddFile.arity(), Some(2));
        assert_eq!(CommandKind::Select.arity(), None);
    }
}
