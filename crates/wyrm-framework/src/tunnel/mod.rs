//! Inter-protocol tunnels.
//!
//! A tunnel is a one-directional relay link between two [`Party`] endpoints,
//! possibly on different protocols. Opening a tunnel always creates a
//! mutual pair: a forward link and a reverse link, each holding the other's
//! id. A "chunnel" is a tunnel whose source or destination is an entire
//! channel rather than a single user.
//!
//! All tunnels live in one id-indexed table inside [`TunnelManager`];
//! reverse links are ids into that table, not owned references, so paired
//! creation and removal happen atomically under a single lock and no
//! reference cycles exist.

pub mod plugin;

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::info;

use wyrm_core::{
    BoxedProtocol, CHANNEL_MARKER, CommandContext, ProtocolResult, Style, User, handle,
};

// =============================================================================
// Party
// =============================================================================

/// An addressable tunnel endpoint: a user, or an entire channel, on one
/// protocol.
///
/// A channel party has no alias and no user; a personal party has an alias
/// and, when the alias resolved against the directory, a user. A personal
/// party without a user can still relay but never passes authorization
/// gates.
#[derive(Clone)]
pub struct Party {
    /// The adapter this endpoint lives on.
    pub protocol: BoxedProtocol,
    /// Channel name for whole-channel parties.
    pub channel: Option<String>,
    /// Directory identity, when the alias resolved to one.
    pub user: Option<User>,
    /// Display alias for personal parties.
    pub alias: Option<String>,
}

impl Party {
    /// A personal endpoint for an alias, with its directory identity when
    /// one was found.
    pub fn user(protocol: BoxedProtocol, alias: impl Into<String>, user: Option<User>) -> Self {
        Self {
            protocol,
            channel: None,
            user,
            alias: Some(alias.into()),
        }
    }

    /// A whole-channel endpoint.
    pub fn channel(protocol: BoxedProtocol, channel: impl Into<String>) -> Self {
        Self {
            protocol,
            channel: Some(channel.into()),
            user: None,
            alias: None,
        }
    }

    /// The endpoint a context speaks for: the whole channel when the event
    /// was channel-scoped, otherwise the user behind the alias.
    pub fn from_context(ctx: &CommandContext) -> Self {
        match &ctx.channel {
            Some(channel) if channel.starts_with(CHANNEL_MARKER) => {
                Self::channel(ctx.protocol.clone(), channel.clone())
            }
            _ => Self::user(ctx.protocol.clone(), ctx.alias.clone(), ctx.user.clone()),
        }
    }

    /// The protocol id this endpoint lives on.
    pub fn proto(&self) -> &str {
        self.protocol.proto()
    }

    /// Display name: the alias for personal parties, the channel name for
    /// channel parties.
    pub fn name(&self) -> &str {
        self.alias
            .as_deref()
            .or(self.channel.as_deref())
            .unwrap_or_default()
    }

    fn alias_key(&self) -> String {
        self.alias
            .as_deref()
            .map(|a| handle(a).to_lowercase())
            .unwrap_or_default()
    }
}

impl PartialEq for Party {
    /// Endpoint identity: same protocol, same channel, and for personal
    /// parties the same user (by id when both resolved, by handle
    /// otherwise).
    fn eq(&self, other: &Self) -> bool {
        if self.proto() != other.proto() || self.channel != other.channel {
            return false;
        }
        match (&self.user, &other.user) {
            (Some(a), Some(b)) if !a.is_anonymous() && !b.is_anonymous() => a.id == b.id,
            _ => self.alias_key() == other.alias_key(),
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.proto(), self.name())
    }
}

impl fmt::Debug for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Party")
            .field("proto", &self.proto())
            .field("channel", &self.channel)
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tunnel
// =============================================================================

/// Index of a tunnel in the manager's table.
pub type TunnelId = u64;

/// One direction of an open tunnel pair.
#[derive(Clone)]
pub struct Tunnel {
    id: TunnelId,
    reverse: TunnelId,
    from: Party,
    to: Party,
}

impl Tunnel {
    /// This tunnel's table id.
    pub fn id(&self) -> TunnelId {
        self.id
    }

    /// The table id of the paired reverse tunnel.
    pub fn reverse_id(&self) -> TunnelId {
        self.reverse
    }

    /// The source endpoint.
    pub fn from(&self) -> &Party {
        &self.from
    }

    /// The destination endpoint.
    pub fn to(&self) -> &Party {
        &self.to
    }

    /// Relays a line spoken by the source party to the destination.
    ///
    /// The line is prefixed with the source's sender label and delivered
    /// with the source user's display color, when one is set.
    pub async fn relay_line(&self, line: &str) -> ProtocolResult<()> {
        let sender = self.from.protocol.format_sender(self.from.name());
        let text = format!("{sender}{}", self.to.protocol.format(line, &Style::plain()));
        let style = match self.from.user.as_ref().and_then(|u| u.color.clone()) {
            Some(color) => Style::plain().with_color(color),
            None => Style::plain(),
        };
        self.deliver(&text, &style).await
    }

    /// Relays a line heard in this tunnel's source channel.
    ///
    /// Channel-sourced tunnels carry lines from many speakers, so the
    /// sender label qualifies the speaker's alias with the channel name.
    pub async fn relay_channel_line(
        &self,
        speaker: &CommandContext,
        line: &str,
    ) -> ProtocolResult<()> {
        let channel = self.from.channel.as_deref().unwrap_or_default();
        let sender = speaker
            .protocol
            .format_sender(&format!("{channel}:{}", speaker.alias));
        let text = format!("{sender}{}", self.to.protocol.format(line, &Style::plain()));
        let style = match speaker.user.as_ref().and_then(|u| u.color.clone()) {
            Some(color) => Style::plain().with_color(color),
            None => Style::plain(),
        };
        self.deliver(&text, &style).await
    }

    /// Sends a control notice to the source end.
    pub async fn message_source(&self, line: &str) -> ProtocolResult<()> {
        let target = self.from.channel.as_deref().unwrap_or_else(|| self.from.name());
        self.from
            .protocol
            .send_message(target, line, &Style::plain())
            .await
    }

    /// Sends a control notice (or a relayed line) to the destination end.
    pub async fn message_destination(&self, line: &str) -> ProtocolResult<()> {
        self.deliver(line, &Style::plain()).await
    }

    async fn deliver(&self, line: &str, style: &Style) -> ProtocolResult<()> {
        let target = self.to.channel.as_deref().unwrap_or_else(|| self.to.name());
        self.to.protocol.send_message(target, line, style).await
    }
}

impl fmt::Display for Tunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

impl fmt::Debug for Tunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tunnel")
            .field("id", &self.id)
            .field("reverse", &self.reverse)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

// =============================================================================
// Tunnel Manager
// =============================================================================

/// Identity a tunnel list is kept under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum OwnerId {
    /// A whole-channel party; the channel itself is on the tunnel.
    Channel,
    /// A resolved directory user.
    User(u64),
    /// An unresolved alias, keyed by lowercased handle.
    Alias(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct OwnerKey {
    proto: String,
    owner: OwnerId,
}

impl OwnerKey {
    fn of(party: &Party) -> Self {
        let owner = if party.channel.is_some() {
            OwnerId::Channel
        } else {
            match &party.user {
                Some(user) if !user.is_anonymous() => OwnerId::User(user.id),
                _ => OwnerId::Alias(party.alias_key()),
            }
        };
        Self {
            proto: party.proto().to_string(),
            owner,
        }
    }

    fn speaker(user: Option<&User>, alias: &str, proto: &str) -> Self {
        let owner = match user {
            Some(user) if !user.is_anonymous() => OwnerId::User(user.id),
            _ => OwnerId::Alias(handle(alias).to_lowercase()),
        };
        Self {
            proto: proto.to_string(),
            owner,
        }
    }
}

#[derive(Default)]
struct TunnelTable {
    next_id: TunnelId,
    tunnels: HashMap<TunnelId, Tunnel>,
    by_owner: HashMap<OwnerKey, Vec<TunnelId>>,
}

impl TunnelTable {
    fn insert(&mut self, tunnel: Tunnel) {
        let key = OwnerKey::of(&tunnel.from);
        self.by_owner.entry(key).or_default().push(tunnel.id);
        self.tunnels.insert(tunnel.id, tunnel);
    }

    fn remove(&mut self, id: TunnelId) -> Option<Tunnel> {
        let tunnel = self.tunnels.remove(&id)?;
        let key = OwnerKey::of(&tunnel.from);
        if let Some(ids) = self.by_owner.get_mut(&key) {
            ids.retain(|t| *t != id);
            if ids.is_empty() {
                self.by_owner.remove(&key);
            }
        }
        Some(tunnel)
    }

    fn owned_by(&self, key: &OwnerKey) -> Vec<Tunnel> {
        self.by_owner
            .get(key)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.tunnels.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Owner of every open tunnel.
///
/// Open and close always act on a mutual pair and do so under one lock, so
/// a concurrent relay observes either both directions or neither.
#[derive(Default)]
pub struct TunnelManager {
    inner: Mutex<TunnelTable>,
}

impl TunnelManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a tunnel pair between two parties.
    ///
    /// Returns the forward and reverse tunnels, already cross-linked and
    /// appended to their owners' lists. Notices to either end are the
    /// caller's concern.
    pub fn open(&self, from: Party, to: Party) -> (Tunnel, Tunnel) {
        let mut table = self.inner.lock();
        let forward_id = table.next_id;
        let reverse_id = table.next_id + 1;
        table.next_id += 2;

        let forward = Tunnel {
            id: forward_id,
            reverse: reverse_id,
            from: from.clone(),
            to: to.clone(),
        };
        let reverse = Tunnel {
            id: reverse_id,
            reverse: forward_id,
            from: to,
            to: from,
        };
        info!(tunnel = %forward, "Established tunnel");
        info!(tunnel = %reverse, "Established tunnel");
        table.insert(forward.clone());
        table.insert(reverse.clone());
        (forward, reverse)
    }

    /// Collapses a tunnel pair given either side's id.
    ///
    /// Removes both directions from their owners' lists in one operation;
    /// never leaves one side without the other. Returns the removed
    /// `(tunnel, reverse)` pair, or `None` when the id was already closed.
    pub fn close(&self, id: TunnelId) -> Option<(Tunnel, Tunnel)> {
        let mut table = self.inner.lock();
        let tunnel = table.remove(id)?;
        info!(tunnel = %tunnel, "Closing tunnel");
        // The pair is created atomically, so the reverse must exist.
        let reverse = table.remove(tunnel.reverse)?;
        info!(tunnel = %reverse, "Closing tunnel");
        Some((tunnel, reverse))
    }

    /// Tunnels owned by a party, in open order.
    pub fn for_party(&self, party: &Party) -> Vec<Tunnel> {
        self.inner.lock().owned_by(&OwnerKey::of(party))
    }

    /// Tunnels owned by whoever spoke a line, resolved the same way party
    /// ownership is keyed.
    pub fn for_speaker(&self, user: Option<&User>, alias: &str, proto: &str) -> Vec<Tunnel> {
        self.inner
            .lock()
            .owned_by(&OwnerKey::speaker(user, alias, proto))
    }

    /// Tunnels whose source is an entire channel on the given protocol.
    pub fn channel_tunnels(&self, proto: &str) -> Vec<Tunnel> {
        let key = OwnerKey {
            proto: proto.to_string(),
            owner: OwnerId::Channel,
        };
        self.inner.lock().owned_by(&key)
    }

    /// Every open tunnel, both directions included.
    pub fn all(&self) -> Vec<Tunnel> {
        let table = self.inner.lock();
        let mut tunnels: Vec<Tunnel> = table.tunnels.values().cloned().collect();
        tunnels.sort_by_key(Tunnel::id);
        tunnels
    }

    /// Number of open tunnels, both directions included.
    pub fn len(&self) -> usize {
        self.inner.lock().tunnels.len()
    }

    /// True when no tunnels are open.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().tunnels.is_empty()
    }
}
