use std::sync::Arc;

use crate::commands::registry::CommandRegistry;

/// One message interpreted as a command invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercase, without prefix.
    pub name: String,
    /// Whitespace-separated tokens after the name, case preserved.
    pub args: Vec<String>,
    /// The trimmed message text.
    pub raw_text: String,
}

impl ParsedCommand {
    /// Arguments joined back with single spaces.
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }
}

#[derive(Clone, Debug)]
pub struct CommandParser {
    prefix: char,
    registry: Arc<CommandRegistry>,
}

impl CommandParser {
    pub fn new(prefix: char, registry: Arc<CommandRegistry>) -> Self {
        Self { prefix, registry }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// `.name args...`, or a bare known command name. Anything else is not a
    /// command and yields `None`.
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let raw_text = text.trim();
        let mut tokens = raw_text.split_whitespace();
        let first = tokens.next()?;

        let name = match first.strip_prefix(self.prefix) {
            Some(stripped) => stripped.to_lowercase(),
            None => {
                let lowered = first.to_lowercase();
                if !self.registry.is_known(&lowered) {
                    return None;
                }
                lowered
            }
        };
        if name.is_empty() {
            return None;
        }

        Some(ParsedCommand {
            name,
            args: tokens.map(str::to_string).collect(),
            raw_text: raw_text.to_string(),
        })
    }
}
