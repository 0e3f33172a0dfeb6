//! Turning raw message text into command invocations.
//!
//! A message is a command when it starts with one of the configured prefixes
//! (ignoring case) directly followed by a registered trigger. Everything else
//! is ordinary conversation and yields `None`, never an error.

use std::sync::Arc;

use tracing::trace;

use crate::command::CommandRegistry;
use crate::context::CommandContext;
use howl_core::{InboundEvent, Messenger};

/// Parses inbound events into [`CommandContext`]s.
#[derive(Debug, Clone)]
pub struct ContextParser {
    prefixes: Vec<String>,
}

impl ContextParser {
    /// Creates a parser accepting any of `prefixes`. Empty prefixes are ignored.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Parses `event` against `registry`.
    ///
    /// Returns `None` when no prefix matches, when the trigger is missing, or
    /// when the trigger is not registered.
    pub fn parse(
        &self,
        registry: &CommandRegistry,
        event: InboundEvent,
        messenger: Arc<dyn Messenger>,
    ) -> Option<CommandContext> {
        let content = event.content.trim_start();
        let rest = self
            .prefixes
            .iter()
            .find_map(|prefix| strip_prefix_ignore_case(content, prefix))?;

        let (trigger, raw_args) = match rest.split_once(char::is_whitespace) {
            Some((trigger, args)) => (trigger, args.trim()),
            None => (rest, ""),
        };
        if trigger.is_empty() {
            return None;
        }

        let Some(command) = registry.resolve(trigger) else {
            trace!(trigger, "Unknown trigger, ignoring message");
            return None;
        };

        let command = command.clone();
        let trigger = trigger.to_lowercase();
        let raw_args = raw_args.to_string();
        let args = shell_split(&raw_args);

        Some(CommandContext::new(
            command, trigger, raw_args, args, event, messenger,
        ))
    }
}

/// Strips `prefix` from the start of `text`, comparing case-insensitively.
///
/// Returns `None` for text shorter than the prefix or when the prefix would
/// end inside a multi-byte character.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) || head.to_lowercase() == prefix.to_lowercase() {
        text.get(prefix.len()..)
    } else {
        None
    }
}

/// Simple shell-like argument splitting.
///
/// Handles:
/// - Whitespace-separated arguments
/// - Quoted strings (single and double quotes)
/// - Escape sequences within double quotes
pub(crate) fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;
    let mut quoted = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => escape_next = true,
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                quoted = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                quoted = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if !current.is_empty() || quoted {
                    args.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    args
}
