use anyhow::{Context, Result};
use regex::Regex;

use crate::errors::ToolError;

/// Command whitelist for the bash tool: exact first-token names plus
/// full-command regex patterns.
///
/// A command is accepted iff its first token is in the exact list, or the
/// full trimmed command matches at least one pattern. Adding an entry to
/// either list never rejects a previously accepted command.
pub struct CommandWhitelist {
    exact: Vec<String>,
    patterns: Vec<Regex>,
}

impl CommandWhitelist {
    pub fn new(exact: Vec<String>, patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                // Anchor so a pattern must match the whole command string.
                Regex::new(&format!("^(?:{})$", p))
                    .with_context(|| format!("invalid whitelist pattern '{}'", p))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { exact, patterns })
    }

    pub fn is_whitelisted(&self, command: &str) -> bool {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return false;
        }
        if let Some(first) = trimmed.split_whitespace().next()
            && self.exact.iter().any(|c| c == first)
        {
            return true;
        }
        self.patterns.iter().any(|p| p.is_match(trimmed))
    }

    /// Whitelist check as a policy error, for use inside validate/execute.
    pub fn check(&self, command: &str) -> Result<(), ToolError> {
        if self.is_whitelisted(command) {
            Ok(())
        } else {
            Err(ToolError::Policy(format!(
                "command '{}' is not whitelisted",
                crate::utils::truncate_chars(command.trim(), 120, "...")
            )))
        }
    }
}
