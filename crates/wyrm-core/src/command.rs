//! Command records and the wire-level command grammar.
//!
//! A [`Command`] is an explicit registration record built by its plugin at
//! construction time: name, required access level, usage text, description,
//! and an async handler. There is no runtime reflection; plugins hand the
//! framework fixed lists of these records.
//!
//! The command grammar is `!<word>( <rest>)?`: a marker character
//! immediately followed by a command word (word characters only),
//! optionally followed by one whitespace character and free-form trailing
//! text. Lines not matching this pattern are never treated as commands.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::CommandContext;
use crate::error::CommandResult;

/// Marker character opening a command line.
pub const COMMAND_MARKER: char = '!';

/// Type-erased async command handler.
pub type CommandHandler =
    Arc<dyn Fn(CommandContext, String) -> BoxFuture<'static, CommandResult<()>> + Send + Sync>;

// =============================================================================
// Command
// =============================================================================

/// A named command exposed by a plugin.
///
/// Names are unique within a protocol, not globally; the router's merge
/// policy is last registration wins. Immutable once built; a plugin reload
/// replaces its commands wholesale.
#[derive(Clone)]
pub struct Command {
    name: String,
    level: i32,
    usage: String,
    desc: String,
    handler: CommandHandler,
}

impl Command {
    /// Starts building a command with the given name.
    pub fn named(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            name: name.into(),
            level: 0,
            usage: String::new(),
            desc: String::new(),
        }
    }

    /// The command word (without the marker).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required access level.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Usage text shown on bad arguments and in help.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Description text shown in help.
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Invokes the handler with the given context and raw argument string.
    pub async fn invoke(&self, ctx: CommandContext, args: String) -> CommandResult<()> {
        (self.handler)(ctx, args).await
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Command`] records.
pub struct CommandBuilder {
    name: String,
    level: i32,
    usage: String,
    desc: String,
}

impl CommandBuilder {
    /// Sets the required access level (default 0).
    pub fn level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Sets the usage text.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Sets the description text.
    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    /// Finishes the record with an async handler taking the context and the
    /// raw argument string.
    pub fn handler<F, Fut>(self, f: F) -> Command
    where
        F: Fn(CommandContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult<()>> + Send + 'static,
    {
        Command {
            name: self.name,
            level: self.level,
            usage: self.usage,
            desc: self.desc,
            handler: Arc::new(move |ctx, args| Box::pin(f(ctx, args))),
        }
    }
}

// =============================================================================
// Command Grammar
// =============================================================================

/// Reads a line of user input and returns the embedded command word and
/// argument string, if any.
///
/// Matches `!<word>( <rest>)?`: the word is one or more ASCII word
/// characters, separated from the free-form rest by exactly one whitespace
/// character.
pub fn parse_command(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(COMMAND_MARKER)?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let (word, tail) = rest.split_at(end);
    if tail.is_empty() {
        return Some((word, ""));
    }
    let mut chars = tail.chars();
    if !chars.next().is_some_and(char::is_whitespace) {
        return None;
    }
    Some((word, chars.as_str()))
}
