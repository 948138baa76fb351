//! Plugin and listener contracts.
//!
//! A plugin is a named, stateful unit that exposes a fixed set of
//! [`Command`]s and [`Listener`]s, both built as explicit registration
//! records at construction time. The registry owns the live instance for
//! its lifetime (process lifetime, or until a reload swaps it out).

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::command::Command;
use crate::context::CommandContext;
use crate::error::CommandResult;
use crate::event::EventKind;

/// Type-erased async listener handler, invoked with the triggering context
/// and an optional message.
pub type ListenerHandler =
    Arc<dyn Fn(CommandContext, String) -> BoxFuture<'static, CommandResult<()>> + Send + Sync>;

// =============================================================================
// Listener
// =============================================================================

/// A plugin's subscription to one event kind.
///
/// The bus keeps at most one listener per (plugin, event kind); registering
/// a second overwrites the first with a logged warning.
#[derive(Clone)]
pub struct Listener {
    kind: EventKind,
    handler: ListenerHandler,
}

impl Listener {
    /// Creates a listener for the given event kind.
    pub fn new<F, Fut>(kind: EventKind, f: F) -> Self
    where
        F: Fn(CommandContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult<()>> + Send + 'static,
    {
        Self {
            kind,
            handler: Arc::new(move |ctx, message| Box::pin(f(ctx, message))),
        }
    }

    /// The event kind this listener subscribes to.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The type-erased handler.
    pub fn handler(&self) -> ListenerHandler {
        Arc::clone(&self.handler)
    }

    /// Invokes the handler.
    pub async fn invoke(&self, ctx: CommandContext, message: String) -> CommandResult<()> {
        (self.handler)(ctx, message).await
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Plugin
// =============================================================================

/// The contract every plugin satisfies.
///
/// Implementations build their command and listener records once, at
/// construction, and return clones here; the records are immutable for
/// the instance's lifetime. Plugin state mutated by handlers lives behind
/// the `Arc`s those handlers capture.
pub trait Plugin: Send + Sync {
    /// Unique plugin name; also the module key used by `!load`/`!reload`.
    fn name(&self) -> &str;

    /// Commands this plugin exposes.
    fn commands(&self) -> Vec<Command>;

    /// Listeners this plugin exposes.
    fn listeners(&self) -> Vec<Listener> {
        Vec::new()
    }
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// A shared plugin instance.
pub type BoxedPlugin = Arc<dyn Plugin>;
