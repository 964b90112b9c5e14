//! Text console grammar and output buffer.

use std::path::PathBuf;

pub const HELP_TEXT: &str =
    "Available commands: help, clear, select <id>, delete, add <name>, undo, redo, tool <name>, list, save <path>, load <path>, view <preset>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Clear,
    Select(String),
    Delete,
    Add(String),
    Undo,
    Redo,
    Tool(String),
    List,
    Save(PathBuf),
    Load(PathBuf),
    View(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl ConsoleCommand {
    /// Parses one line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ConsoleError> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(None);
        };
        let arg = parts.next().map(str::to_string);
        let command = match head.to_ascii_lowercase().as_str() {
            "help" => Self::Help,
            "clear" => Self::Clear,
            "delete" => Self::Delete,
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "list" => Self::List,
            "select" => Self::Select(arg.ok_or(ConsoleError::Usage("select <objectId>"))?),
            "add" => Self::Add(arg.ok_or(ConsoleError::Usage("add <assetName>"))?),
            "tool" => Self::Tool(arg.ok_or(ConsoleError::Usage("tool <name>"))?),
            "view" => Self::View(arg.ok_or(ConsoleError::Usage("view <preset>"))?),
            "save" => Self::Save(arg.ok_or(ConsoleError::Usage("save <path>"))?.into()),
            "load" => Self::Load(arg.ok_or(ConsoleError::Usage("load <path>"))?.into()),
            other => return Err(ConsoleError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Command,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub kind: LineKind,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ConsoleLog {
    lines: Vec<ConsoleLine>,
}

impl ConsoleLog {
    pub fn push(&mut self, kind: LineKind, text: impl Into<String>) {
        self.lines.push(ConsoleLine {
            kind,
            text: text.into(),
        });
    }

    pub fn lines(&self) -> &[ConsoleLine] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
