//! Protocol adapter trait and the shared protocol registry.
//!
//! A [`Protocol`] is the capability set the core requires from every
//! connected transport: send a message, send a private notification,
//! render style attributes, report channel membership, identify itself,
//! and disconnect. Wire-level concerns (handshake, framing, presence)
//! live entirely inside the adapter.
//!
//! Core code stays style-agnostic: it calls [`Protocol::format`] with an
//! abstract [`Style`] and trusts the adapter to render it however the
//! transport requires, or to no-op.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::ProtocolResult;

/// Marker character selecting a channel in a target string.
///
/// A target beginning with this character is a channel name; anything else
/// is a user alias.
pub const CHANNEL_MARKER: char = '#';

// =============================================================================
// Style
// =============================================================================

/// Abstract text style attributes.
///
/// Adapters render these however their transport allows. An adapter with no
/// styling support simply returns the text unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    /// Bold text.
    pub bold: bool,
    /// Underlined text.
    pub underline: bool,
    /// Reverse video.
    pub reverse: bool,
    /// Named color (e.g. `"red"`), if any.
    pub color: Option<String>,
}

impl Style {
    /// The empty style.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Returns a copy with bold enabled.
    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Returns a copy with the given named color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// True when no attribute is set.
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// Protocol Trait
// =============================================================================

/// The capability set every protocol adapter implements.
///
/// One instance exists per connected transport. Adapters drive their own
/// transport I/O as independently scheduled tasks and call back into the
/// orchestrator with inbound events.
#[async_trait]
pub trait Protocol: Send + Sync + 'static {
    /// Short identifier for this transport (e.g. `"irc"`, `"discord"`).
    fn proto(&self) -> &str;

    /// Names of the public channels this adapter monitors, each prefixed
    /// with [`CHANNEL_MARKER`].
    fn public_channels(&self) -> Vec<String>;

    /// Sends one line to a channel or user.
    ///
    /// `target` follows the addressing convention: a leading
    /// [`CHANNEL_MARKER`] selects a channel by name, otherwise the string
    /// is a user alias.
    async fn send_message(&self, target: &str, line: &str, style: &Style) -> ProtocolResult<()>;

    /// Sends one line directly and privately to a user, alerting them if
    /// the transport supports it.
    async fn send_notification(
        &self,
        target: &str,
        line: &str,
        style: &Style,
    ) -> ProtocolResult<()>;

    /// Renders `text` with the given style attributes.
    ///
    /// The default implementation returns the text unchanged.
    fn format(&self, text: &str, style: &Style) -> String {
        let _ = style;
        text.to_string()
    }

    /// Renders a sender prefix for relayed lines.
    fn format_sender(&self, alias: &str) -> String {
        format!("{alias}: ")
    }

    /// Disconnects from the transport gracefully.
    ///
    /// Adapters typically send a quit line, wait briefly for it to flush,
    /// then close the connection.
    async fn disconnect(&self) -> ProtocolResult<()>;

    /// True when this adapter monitors the named channel.
    fn has_channel(&self, name: &str) -> bool {
        self.public_channels().iter().any(|c| c == name)
    }
}

/// A shared protocol adapter handle.
pub type BoxedProtocol = Arc<dyn Protocol>;

// =============================================================================
// Protocol Set
// =============================================================================

/// Registry of connected protocol adapters, keyed by protocol id.
///
/// Owned by the orchestrator and handed (cloned) to components that need to
/// resolve a protocol by name, such as the tunnel subsystem.
#[derive(Clone, Default)]
pub struct ProtocolSet {
    inner: Arc<RwLock<HashMap<String, BoxedProtocol>>>,
}

impl ProtocolSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its own protocol id, replacing any
    /// previous registration.
    pub fn insert(&self, protocol: BoxedProtocol) {
        self.inner
            .write()
            .insert(protocol.proto().to_string(), protocol);
    }

    /// Looks up an adapter by protocol id.
    pub fn get(&self, proto: &str) -> Option<BoxedProtocol> {
        self.inner.read().get(proto).cloned()
    }

    /// True when an adapter with this id is registered.
    pub fn contains(&self, proto: &str) -> bool {
        self.inner.read().contains_key(proto)
    }

    /// Registered protocol ids.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// All registered adapters.
    pub fn all(&self) -> Vec<BoxedProtocol> {
        self.inner.read().values().cloned().collect()
    }
}
