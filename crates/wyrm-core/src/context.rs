//! Per-event command context.
//!
//! A [`CommandContext`] binds a protocol, a channel (empty for private
//! exchanges), a user (absent when unauthenticated), a display alias, and
//! a timestamp. It is created once per inbound event and never persisted.
//!
//! The context is also the reply surface for handlers: [`reply`] goes back
//! to the invoking channel (or alias for private contexts) and [`notify`]
//! always goes directly and privately to the invoking alias.
//!
//! [`reply`]: CommandContext::reply
//! [`notify`]: CommandContext::notify

use std::time::SystemTime;

use crate::error::ProtocolResult;
use crate::protocol::{BoxedProtocol, Style};
use crate::user::User;

// =============================================================================
// Content
// =============================================================================

/// Reply payload: a single line or an ordered sequence of lines.
///
/// Each line is sent individually so transports that would reorder a
/// multi-line payload deliver them in order.
#[derive(Debug, Clone, Default)]
pub struct Content(Vec<String>);

impl Content {
    /// The lines to send, in order.
    pub fn lines(&self) -> &[String] {
        &self.0
    }

    /// True when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Content {
    fn from(line: &str) -> Self {
        Self(vec![line.to_string()])
    }
}

impl From<String> for Content {
    fn from(line: String) -> Self {
        Self(vec![line])
    }
}

impl From<Vec<String>> for Content {
    fn from(lines: Vec<String>) -> Self {
        Self(lines)
    }
}

impl From<&[String]> for Content {
    fn from(lines: &[String]) -> Self {
        Self(lines.to_vec())
    }
}

// =============================================================================
// CommandContext
// =============================================================================

/// All the variables bound to one inbound event.
///
/// Cheap to clone; handlers receive it by value. Note that this object is
/// also used for notifications which aren't really commands (like joins).
#[derive(Clone)]
pub struct CommandContext {
    /// The adapter the event arrived on.
    pub protocol: BoxedProtocol,
    /// Originating channel; `None` for private exchanges.
    pub channel: Option<String>,
    /// The resolved user; `None` when anonymous/unauthenticated.
    pub user: Option<User>,
    /// Display name the user is currently seen under on this protocol.
    pub alias: String,
    /// When the event arrived.
    pub when: SystemTime,
}

impl CommandContext {
    /// Creates a context stamped with the current time.
    pub fn new(
        protocol: BoxedProtocol,
        channel: Option<String>,
        user: Option<User>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            channel,
            user,
            alias: alias.into(),
            when: SystemTime::now(),
        }
    }

    /// Where replies go: the invoking channel if the context was
    /// channel-scoped, else the invoking alias.
    pub fn target(&self) -> &str {
        self.channel.as_deref().unwrap_or(&self.alias)
    }

    /// Replies to the user or the channel the event originated in.
    ///
    /// Empty content is a no-op.
    pub async fn reply(&self, content: impl Into<Content>) -> ProtocolResult<()> {
        let content = content.into();
        let style = Style::plain();
        for line in content.lines() {
            self.protocol
                .send_message(self.target(), line, &style)
                .await?;
        }
        Ok(())
    }

    /// Replies directly and privately to the invoking alias, regardless of
    /// the originating channel.
    pub async fn notify(&self, content: impl Into<Content>) -> ProtocolResult<()> {
        let content = content.into();
        let style = Style::plain();
        for line in content.lines() {
            self.protocol
                .send_notification(&self.alias, line, &style)
                .await?;
        }
        Ok(())
    }
}
