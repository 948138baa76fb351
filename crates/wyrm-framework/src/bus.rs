//! Event bus with isolated fan-out.
//!
//! The bus holds, per event kind, a mapping from plugin name to a single
//! listener. [`EventBus::notify`] invokes every listener registered for the
//! kind; a failure inside one listener is caught, reported back to the
//! triggering context as a reply, logged, and does not prevent the
//! remaining listeners from running. No invocation order is promised
//! across plugins.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use wyrm_core::{CommandContext, EventKind, Listener, ListenerHandler};

/// Per-kind listener tables shared by all transports.
pub struct EventBus {
    listeners: RwLock<HashMap<EventKind, HashMap<String, ListenerHandler>>>,
}

impl EventBus {
    /// Creates a bus with an empty table for every event kind.
    pub fn new() -> Self {
        let mut listeners = HashMap::new();
        for kind in EventKind::ALL {
            listeners.insert(kind, HashMap::new());
        }
        Self {
            listeners: RwLock::new(listeners),
        }
    }

    /// Registers a listener on behalf of a plugin.
    ///
    /// One listener per (plugin, event kind): a second registration
    /// overwrites the first with a logged warning.
    pub fn register(&self, module: &str, listener: Listener) {
        let kind = listener.kind();
        let mut table = self.listeners.write();
        let slot = table.entry(kind).or_default();
        if slot.insert(module.to_string(), listener.handler()).is_some() {
            warn!(module = %module, kind = %kind, "Redefining listener");
        } else {
            debug!(module = %module, kind = %kind, "Adding listener");
        }
    }

    /// Drops every listener a plugin registered.
    ///
    /// Used before re-registering on reload so stale kinds don't linger.
    pub fn unregister_module(&self, module: &str) {
        let mut table = self.listeners.write();
        for slot in table.values_mut() {
            slot.remove(module);
        }
    }

    /// Number of listeners currently registered for a kind.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .get(&kind)
            .map_or(0, HashMap::len)
    }

    /// Fans `message` out to every listener registered for `kind`.
    ///
    /// Each invocation is isolated: one failing listener is reported to the
    /// triggering context and logged, and the rest still run.
    pub async fn notify(&self, kind: EventKind, ctx: &CommandContext, message: &str) {
        // Snapshot under the lock; never hold it across an await.
        let handlers: Vec<(String, ListenerHandler)> = {
            let table = self.listeners.read();
            table
                .get(&kind)
                .map(|slot| {
                    slot.iter()
                        .map(|(name, h)| (name.clone(), h.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        for (module, handler) in handlers {
            if let Err(e) = handler(ctx.clone(), message.to_string()).await {
                error!(module = %module, kind = %kind, error = %e, "Error notifying listener");
                if let Err(send_err) = ctx.reply(e.to_string()).await {
                    warn!(module = %module, error = %send_err, "Could not report listener failure");
                }
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockProtocol, ctx_on};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wyrm_core::CommandError;

    fn counting_listener(kind: EventKind, calls: &Arc<AtomicUsize>) -> Listener {
        let calls = Arc::clone(calls);
        Listener::new(kind, move |_ctx, _msg| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn notify_reaches_every_listener_for_the_kind() {
        let bus = EventBus::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        bus.register("alpha", counting_listener(EventKind::Hear, &a));
        bus.register("beta", counting_listener(EventKind::Hear, &b));
        bus.register("gamma", counting_listener(EventKind::Joined, &b));

        let proto = MockProtocol::shared("irc");
        bus.notify(EventKind::Hear, &ctx_on(&proto, None, None, "alice"), "hi")
            .await;

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1); // gamma's Joined listener did not fire
    }

    #[tokio::test]
    async fn failing_listener_does_not_stop_the_rest() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        bus.register(
            "broken",
            Listener::new(EventKind::Hear, |_ctx, _msg| async {
                Err(CommandError::unexpected("TestError", "boom"))
            }),
        );
        bus.register("fine", counting_listener(EventKind::Hear, &calls));

        let proto = MockProtocol::shared("irc");
        bus.notify(EventKind::Hear, &ctx_on(&proto, None, None, "alice"), "hi")
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The failure was reported back to the triggering context.
        let sent = proto.sent();
        assert!(sent.iter().any(|m| m.line == "TestError: boom"));
    }

    #[tokio::test]
    async fn second_registration_overwrites_the_first() {
        let bus = EventBus::new();
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));
        bus.register("mod", counting_listener(EventKind::Hear, &old));
        bus.register("mod", counting_listener(EventKind::Hear, &new));
        assert_eq!(bus.listener_count(EventKind::Hear), 1);

        let proto = MockProtocol::shared("irc");
        bus.notify(EventKind::Hear, &ctx_on(&proto, None, None, "alice"), "hi")
            .await;

        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unregister_module_clears_all_kinds() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        bus.register("mod", counting_listener(EventKind::Hear, &calls));
        bus.register("mod", counting_listener(EventKind::HearExit, &calls));
        bus.unregister_module("mod");
        assert_eq!(bus.listener_count(EventKind::Hear), 0);
        assert_eq!(bus.listener_count(EventKind::HearExit), 0);
    }
}
