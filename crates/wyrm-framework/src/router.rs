//! Per-protocol command tables with access control.
//!
//! Each configured protocol gets one lookup table. Loaded plugins
//! contribute their commands via [`CommandRouter::add_module`]; name
//! collisions are resolved by last registration wins (logged, not an
//! error); there is no namespacing by plugin.
//!
//! [`CommandRouter::execute`] resolves and authorizes an invocation and
//! converts every failure into user-facing lines; it never propagates an
//! error to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, info};

use crate::error::{FrameworkError, FrameworkResult};
use crate::registry::PluginRegistry;
use wyrm_core::{Command, CommandContext, CommandError};

#[derive(Default)]
struct ProtocolTable {
    commands: HashMap<String, Command>,
    modules: Vec<String>,
}

/// Resolves command invocations against per-protocol tables.
pub struct CommandRouter {
    registry: Arc<PluginRegistry>,
    tables: RwLock<HashMap<String, ProtocolTable>>,
    /// Minimum command level above which explicit authentication is
    /// required on top of access-level checks.
    auth_threshold: i32,
}

impl CommandRouter {
    /// Creates a router over the given registry.
    pub fn new(registry: Arc<PluginRegistry>, auth_threshold: i32) -> Self {
        Self {
            registry,
            tables: RwLock::new(HashMap::new()),
            auth_threshold,
        }
    }

    /// Declares a protocol id as configured, creating its empty table.
    pub fn add_protocol(&self, proto: &str) {
        self.tables
            .write()
            .entry(proto.to_string())
            .or_default();
    }

    /// Configured protocol ids.
    pub fn protocols(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Merges a plugin's commands into a protocol's table.
    ///
    /// Loads the plugin first if needed. Existing bindings for the same
    /// command name are overwritten (logged as a redefinition).
    pub fn add_module(&self, proto: &str, module: &str) -> FrameworkResult<()> {
        let plugin = self.registry.load(module)?;

        let mut tables = self.tables.write();
        let table = tables
            .get_mut(proto)
            .ok_or_else(|| FrameworkError::UnknownProtocol(proto.to_string()))?;

        for command in plugin.commands() {
            if table.commands.contains_key(command.name()) {
                info!(command = %command.name(), proto = %proto, "Redefining command");
            } else {
                info!(command = %command.name(), proto = %proto, "Adding command");
            }
            table.commands.insert(command.name().to_string(), command);
        }

        if !table.modules.iter().any(|m| m == module) {
            table.modules.push(module.to_string());
        }
        Ok(())
    }

    /// Re-merges a plugin into every protocol that already had it, so
    /// tables pick up the handler bindings of a freshly reloaded instance.
    pub fn remerge(&self, module: &str) -> FrameworkResult<()> {
        let protos: Vec<String> = {
            let tables = self.tables.read();
            tables
                .iter()
                .filter(|(_, t)| t.modules.iter().any(|m| m == module))
                .map(|(p, _)| p.clone())
                .collect()
        };
        for proto in protos {
            self.add_module(&proto, module)?;
        }
        Ok(())
    }

    /// Looks up a command in a protocol's table.
    pub fn command(&self, proto: &str, name: &str) -> Option<Command> {
        self.tables
            .read()
            .get(proto)
            .and_then(|t| t.commands.get(name).cloned())
    }

    /// Modules merged into a protocol, in merge order.
    pub fn modules(&self, proto: &str) -> Vec<String> {
        self.tables
            .read()
            .get(proto)
            .map(|t| t.modules.clone())
            .unwrap_or_default()
    }

    /// Executes a command on behalf of an adapter.
    ///
    /// `authed` indicates whether the user actually authenticated (rather
    /// than merely matching a known host); it is only checked when the
    /// command's level is at or above the auth threshold.
    ///
    /// Always returns user-facing lines; an empty list means success with
    /// no message.
    pub async fn execute(
        &self,
        name: &str,
        ctx: &CommandContext,
        args: &str,
        authed: bool,
    ) -> Vec<String> {
        let Some(command) = self.command(ctx.protocol.proto(), name) else {
            return vec!["Not a valid command".to_string()];
        };

        let Some(user) = &ctx.user else {
            return vec!["Insufficient privileges".to_string()];
        };
        if user.access < command.level() {
            return vec!["Insufficient privileges".to_string()];
        }

        if command.level() >= self.auth_threshold && !authed {
            return vec!["You must authenticate to run this method.".to_string()];
        }

        info!(
            command = %name,
            user = %user.name,
            proto = %ctx.protocol.proto(),
            "Executing command"
        );
        match command.invoke(ctx.clone(), args.to_string()).await {
            Ok(()) => Vec::new(),
            Err(CommandError::BadParams) => vec![format!("Usage: {}", command.usage())],
            Err(CommandError::Failed(message)) => vec![message],
            Err(err @ CommandError::Unexpected { .. }) => {
                error!(command = %name, error = %err, "Error executing command");
                vec![err.to_string()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::testing::{MockProtocol, ctx_on, user};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wyrm_core::{BoxedPlugin, Plugin};

    struct FixedPlugin {
        name: String,
        commands: Vec<Command>,
    }

    impl Plugin for FixedPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn commands(&self) -> Vec<Command> {
            self.commands.clone()
        }
    }

    fn fixed(name: &str, commands: Vec<Command>) -> BoxedPlugin {
        Arc::new(FixedPlugin {
            name: name.to_string(),
            commands,
        })
    }

    fn router_with(auth_threshold: i32) -> (CommandRouter, Arc<PluginRegistry>) {
        let registry = Arc::new(PluginRegistry::new(Arc::new(EventBus::new())));
        let router = CommandRouter::new(Arc::clone(&registry), auth_threshold);
        router.add_protocol("irc");
        (router, registry)
    }

    fn ping_command(calls: &Arc<AtomicUsize>) -> Command {
        let counter = Arc::clone(calls);
        Command::named("ping")
            .level(1)
            .usage("!ping")
            .desc("Pong.")
            .handler(move |ctx, _args| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ctx.reply("pong").await?;
                    Ok(())
                }
            })
    }

    #[tokio::test]
    async fn ping_replies_pong_and_returns_no_lines() {
        let (router, registry) = router_with(30);
        let calls = Arc::new(AtomicUsize::new(0));
        registry.install("echo", fixed("echo", vec![ping_command(&calls)]));
        router.add_module("irc", "echo").unwrap();

        let proto = MockProtocol::shared("irc");
        let ctx = ctx_on(&proto, None, Some(user(7, "alice", 5)), "alice");
        let out = router.execute("ping", &ctx, "", true).await;

        assert!(out.is_empty());
        let sent = proto.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].line, "pong");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_command_is_a_message_not_an_error() {
        let (router, _registry) = router_with(30);
        let proto = MockProtocol::shared("irc");
        let ctx = ctx_on(&proto, None, Some(user(7, "alice", 5)), "alice");
        let out = router.execute("nope", &ctx, "", true).await;
        assert_eq!(out, vec!["Not a valid command".to_string()]);
    }

    #[tokio::test]
    async fn low_access_never_reaches_the_handler() {
        let (router, registry) = router_with(30);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cmd = Command::named("op")
            .level(50)
            .usage("!op")
            .handler(move |_ctx, _args| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        registry.install("admin", fixed("admin", vec![cmd]));
        router.add_module("irc", "admin").unwrap();

        let proto = MockProtocol::shared("irc");
        let ctx = ctx_on(&proto, None, Some(user(7, "alice", 5)), "alice");
        let out = router.execute("op", &ctx, "", true).await;
        assert_eq!(out, vec!["Insufficient privileges".to_string()]);

        // Anonymous contexts are rejected the same way.
        let anon = ctx_on(&proto, None, None, "drifter");
        let out = router.execute("op", &anon, "", true).await;
        assert_eq!(out, vec!["Insufficient privileges".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn high_level_commands_require_authentication() {
        let (router, registry) = router_with(30);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cmd = Command::named("secret")
            .level(50)
            .usage("!secret")
            .handler(move |_ctx, _args| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        registry.install("vault", fixed("vault", vec![cmd]));
        router.add_module("irc", "vault").unwrap();

        let proto = MockProtocol::shared("irc");
        let ctx = ctx_on(&proto, None, Some(user(7, "alice", 60)), "alice");
        let out = router.execute("secret", &ctx, "", false).await;
        assert_eq!(
            out,
            vec!["You must authenticate to run this method.".to_string()]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_failures_become_user_facing_lines() {
        let (router, registry) = router_with(30);
        let commands = vec![
            Command::named("fussy")
                .level(1)
                .usage("!fussy <arg>")
                .handler(|_ctx, _args| async { Err(CommandError::BadParams) }),
            Command::named("flaky")
                .level(1)
                .usage("!flaky")
                .handler(|_ctx, _args| async {
                    Err(CommandError::failed("The tape is unreadable"))
                }),
            Command::named("cursed")
                .level(1)
                .usage("!cursed")
                .handler(|_ctx, _args| async {
                    Err(CommandError::unexpected("IndexError", "out of range"))
                }),
        ];
        registry.install("moody", fixed("moody", commands));
        router.add_module("irc", "moody").unwrap();

        let proto = MockProtocol::shared("irc");
        let ctx = ctx_on(&proto, None, Some(user(7, "alice", 5)), "alice");

        let out = router.execute("fussy", &ctx, "", true).await;
        assert_eq!(out, vec!["Usage: !fussy <arg>".to_string()]);

        let out = router.execute("flaky", &ctx, "", true).await;
        assert_eq!(out, vec!["The tape is unreadable".to_string()]);

        let out = router.execute("cursed", &ctx, "", true).await;
        assert_eq!(out, vec!["IndexError: out of range".to_string()]);
    }

    #[tokio::test]
    async fn last_module_added_wins_name_collisions() {
        let (router, registry) = router_with(30);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        registry.install("one", fixed("one", vec![ping_command(&first)]));
        registry.install("two", fixed("two", vec![ping_command(&second)]));
        router.add_module("irc", "one").unwrap();
        router.add_module("irc", "two").unwrap();

        let proto = MockProtocol::shared("irc");
        let ctx = ctx_on(&proto, None, Some(user(7, "alice", 5)), "alice");
        router.execute("ping", &ctx, "", true).await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unconfigured_protocol_is_rejected() {
        let (router, registry) = router_with(30);
        registry.install("echo", fixed("echo", vec![]));
        let err = router.add_module("telnet", "echo").unwrap_err();
        assert!(matches!(err, FrameworkError::UnknownProtocol(p) if p == "telnet"));
    }

    #[tokio::test]
    async fn remerge_picks_up_reloaded_handlers() {
        let (router, registry) = router_with(30);
        let old_calls = Arc::new(AtomicUsize::new(0));
        let new_calls = Arc::new(AtomicUsize::new(0));
        let generation = Arc::new(AtomicUsize::new(0));

        let old_c = Arc::clone(&old_calls);
        let new_c = Arc::clone(&new_calls);
        let generation_in_factory = Arc::clone(&generation);
        registry.register_factory("echo", move || {
            let counter = if generation_in_factory.load(Ordering::SeqCst) == 0 {
                Arc::clone(&old_c)
            } else {
                Arc::clone(&new_c)
            };
            Ok(fixed("echo", vec![ping_command(&counter)]))
        });
        router.add_module("irc", "echo").unwrap();

        let proto = MockProtocol::shared("irc");
        let ctx = ctx_on(&proto, None, Some(user(7, "alice", 5)), "alice");
        router.execute("ping", &ctx, "", true).await;
        assert_eq!(old_calls.load(Ordering::SeqCst), 1);

        generation.store(1, Ordering::SeqCst);
        registry.reload("echo").unwrap();
        router.remerge("echo").unwrap();

        router.execute("ping", &ctx, "", true).await;
        assert_eq!(old_calls.load(Ordering::SeqCst), 1);
        assert_eq!(new_calls.load(Ordering::SeqCst), 1);
    }
}
