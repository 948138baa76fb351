//! The Wyrm orchestrator.
//!
//! [`Wyrm`] owns all process-wide dispatch state (protocol set, event bus,
//! plugin registry, command router, tunnel manager, user directory) and
//! drives the bot's lifecycle. Adapters register themselves once connected
//! and hand every inbound line to [`Wyrm::handle_line`]; a termination
//! signal (or the `!die` command) triggers one graceful, idempotent
//! shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::builtin::{self, BuiltinPlugin};
use crate::config::WyrmConfig;
use crate::directory::InMemoryDirectory;
use crate::error::RuntimeResult;
use crate::logging;
use wyrm_core::{
    BoxedDirectory, BoxedPlugin, BoxedProtocol, CommandContext, EventKind, ProtocolSet, User,
    handle, parse_command,
};
use wyrm_framework::tunnel::plugin as tunnels_plugin;
use wyrm_framework::{
    CommandRouter, EventBus, FrameworkError, FrameworkResult, PluginRegistry, TunnelManager,
    TunnelsPlugin,
};

/// Shared state behind a [`Wyrm`] handle.
pub(crate) struct BotCore {
    pub(crate) config: WyrmConfig,
    pub(crate) protocols: ProtocolSet,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) registry: Arc<PluginRegistry>,
    pub(crate) router: Arc<CommandRouter>,
    pub(crate) tunnels: Arc<TunnelManager>,
    pub(crate) directory: BoxedDirectory,
    pub(crate) tasks: TaskTracker,
    pub(crate) shutdown: CancellationToken,
    stopping: AtomicBool,
}

/// The bot. Cheap to clone; all clones share one core.
#[derive(Clone)]
pub struct Wyrm {
    core: Arc<BotCore>,
}

impl Wyrm {
    /// Builds a bot from configuration.
    ///
    /// Initializes logging, creates the dispatch state, declares every
    /// configured protocol to the router, installs the built-in plugin and
    /// registers the tunnels plugin factory.
    pub fn from_config(config: WyrmConfig) -> Self {
        logging::init_from_config(&config.logging);

        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(PluginRegistry::new(Arc::clone(&bus)));
        let router = Arc::new(CommandRouter::new(
            Arc::clone(&registry),
            config.auth_threshold,
        ));
        for protocol in &config.protocols {
            router.add_protocol(&protocol.id);
        }

        info!(name = %config.name, "Starting bot");

        let core = Arc::new(BotCore {
            directory: Arc::new(InMemoryDirectory::from_config(&config.users)),
            config,
            protocols: ProtocolSet::new(),
            bus,
            registry,
            router,
            tunnels: Arc::new(TunnelManager::new()),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            stopping: AtomicBool::new(false),
        });

        core.registry.install(
            builtin::MODULE,
            Arc::new(BuiltinPlugin::new(Arc::downgrade(&core))),
        );

        let manager = Arc::clone(&core.tunnels);
        let protocols = core.protocols.clone();
        let directory = Arc::clone(&core.directory);
        core.registry
            .register_factory(tunnels_plugin::MODULE, move || {
                Ok(Arc::new(TunnelsPlugin::new(
                    Arc::clone(&manager),
                    protocols.clone(),
                    Arc::clone(&directory),
                )) as BoxedPlugin)
            });

        Self { core }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &WyrmConfig {
        &self.core.config
    }

    /// The shared protocol set.
    pub fn protocols(&self) -> &ProtocolSet {
        &self.core.protocols
    }

    /// The plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.core.registry
    }

    /// The command router.
    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.core.router
    }

    /// The tunnel manager.
    pub fn tunnels(&self) -> &Arc<TunnelManager> {
        &self.core.tunnels
    }

    /// The user directory.
    pub fn directory(&self) -> &BoxedDirectory {
        &self.core.directory
    }

    /// A token cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.core.shutdown.clone()
    }

    /// Registers a plugin factory under a module name.
    pub fn register_plugin_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> FrameworkResult<BoxedPlugin> + Send + Sync + 'static,
    {
        self.core.registry.register_factory(name, factory);
    }

    /// Registers a connected protocol adapter.
    ///
    /// The adapter's protocol id must appear in the configuration. Binds
    /// the built-in module plus the protocol's configured module list into
    /// its command table.
    pub fn register_protocol(&self, protocol: BoxedProtocol) -> RuntimeResult<()> {
        let proto = protocol.proto().to_string();
        let Some(cfg) = self
            .core
            .config
            .protocols
            .iter()
            .find(|p| p.id == proto)
            .cloned()
        else {
            return Err(FrameworkError::UnknownProtocol(proto).into());
        };

        info!(proto = %proto, "Registering protocol");
        self.core.protocols.insert(protocol);

        self.core.router.add_module(&proto, builtin::MODULE)?;
        for module in &cfg.modules {
            self.core.router.add_module(&proto, module)?;
        }
        Ok(())
    }

    /// Resolves an alias and transport-reported host to a directory user
    /// and an authentication flag.
    pub async fn resolve_user(&self, alias: &str, userhost: &str) -> (Option<User>, bool) {
        match self.core.directory.by_handle(handle(alias)).await {
            Some(user) => {
                let authed = self.core.directory.auth_host(&user, userhost).await;
                (Some(user), authed)
            }
            None => (None, false),
        }
    }

    /// Handles one inbound line of user text.
    ///
    /// Command-shaped lines from authenticated users are executed through
    /// the router and any resulting messages are sent back to the context.
    /// Everything else, including command-shaped lines from users who did
    /// not authenticate, is broadcast as a `hear` event so listeners (and
    /// tunnels) still see it.
    pub async fn handle_line(&self, ctx: &CommandContext, line: &str, authed: bool) {
        if authed && let Some((name, args)) = parse_command(line) {
            let replies = self.core.router.execute(name, ctx, args, authed).await;
            if !replies.is_empty()
                && let Err(e) = ctx.reply(replies).await
            {
                warn!(error = %e, "Could not deliver command reply");
            }
            return;
        }
        self.core.bus.notify(EventKind::Hear, ctx, line).await;
    }

    /// Broadcasts a non-line event (joins, enters, exits) to listeners.
    pub async fn handle_event(&self, kind: EventKind, ctx: &CommandContext, message: &str) {
        self.core.bus.notify(kind, ctx, message).await;
    }

    /// Spawns a task tracked until shutdown.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.core.tasks.spawn(future);
    }

    /// Runs until a termination signal or `!die` triggers shutdown.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Wyrm is now running. Press Ctrl+C to stop.");
        self.wait_for_shutdown().await;
        self.shutdown().await;
        Ok(())
    }

    /// Waits for Ctrl+C, SIGTERM, or an internal shutdown request.
    async fn wait_for_shutdown(&self) {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to register SIGTERM handler");

            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                }
                _ = self.core.shutdown.cancelled() => {
                    info!("Shutdown requested");
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                }
                _ = self.core.shutdown.cancelled() => {
                    info!("Shutdown requested");
                }
            }
        }
    }

    /// Shuts the bot down gracefully.
    ///
    /// Disconnects every registered protocol, cancels outstanding work and
    /// waits for tracked tasks to finish. Safe against double invocation;
    /// only the first call does anything.
    pub async fn shutdown(&self) {
        if self.core.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down");

        for protocol in self.core.protocols.all() {
            if let Err(e) = protocol.disconnect().await {
                error!(proto = %protocol.proto(), error = %e, "Error disconnecting protocol");
            }
        }

        self.core.tasks.close();
        self.core.shutdown.cancel();
        self.core.tasks.wait().await;
        info!("Clean up operations complete. Exiting.");
    }
}

/// Builds a [`Wyrm`] by loading configuration from the default locations.
pub fn from_default_config() -> RuntimeResult<Wyrm> {
    let config = crate::config::ConfigLoader::new().with_current_dir().load()?;
    Ok(Wyrm::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProtocolConfig, UserConfig};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use wyrm_core::{Listener, Plugin, Protocol, ProtocolResult, Style};

    struct RecordingProtocol {
        proto: String,
        sent: Mutex<Vec<(String, String)>>,
        notices: Mutex<Vec<(String, String)>>,
        disconnects: Mutex<usize>,
    }

    impl RecordingProtocol {
        fn shared(proto: &str) -> Arc<Self> {
            Arc::new(Self {
                proto: proto.to_string(),
                sent: Mutex::new(Vec::new()),
                notices: Mutex::new(Vec::new()),
                disconnects: Mutex::new(0),
            })
        }

        fn sent_lines(&self) -> Vec<String> {
            self.sent.lock().iter().map(|(_, l)| l.clone()).collect()
        }

        fn notice_lines(&self) -> Vec<String> {
            self.notices.lock().iter().map(|(_, l)| l.clone()).collect()
        }
    }

    #[async_trait]
    impl Protocol for RecordingProtocol {
        fn proto(&self) -> &str {
            &self.proto
        }

        fn public_channels(&self) -> Vec<String> {
            Vec::new()
        }

        async fn send_message(
            &self,
            target: &str,
            line: &str,
            _style: &Style,
        ) -> ProtocolResult<()> {
            self.sent.lock().push((target.to_string(), line.to_string()));
            Ok(())
        }

        async fn send_notification(
            &self,
            target: &str,
            line: &str,
            _style: &Style,
        ) -> ProtocolResult<()> {
            self.notices
                .lock()
                .push((target.to_string(), line.to_string()));
            Ok(())
        }

        async fn disconnect(&self) -> ProtocolResult<()> {
            *self.disconnects.lock() += 1;
            Ok(())
        }
    }

    fn test_config() -> WyrmConfig {
        WyrmConfig {
            protocols: vec![ProtocolConfig {
                id: "irc".to_string(),
                modules: Vec::new(),
            }],
            users: vec![UserConfig {
                id: 1,
                name: "alice".to_string(),
                access: 60,
                color: None,
                hosts: vec!["alice@*".to_string()],
            }],
            ..WyrmConfig::default()
        }
    }

    fn alice() -> User {
        User {
            id: 1,
            name: "alice".to_string(),
            access: 60,
            color: None,
        }
    }

    fn ctx(proto: &Arc<RecordingProtocol>, user: Option<User>) -> CommandContext {
        CommandContext::new(Arc::clone(proto) as BoxedProtocol, None, user, "alice")
    }

    fn bot_with_protocol() -> (Wyrm, Arc<RecordingProtocol>) {
        let bot = Wyrm::from_config(test_config());
        let proto = RecordingProtocol::shared("irc");
        bot.register_protocol(Arc::clone(&proto) as BoxedProtocol)
            .unwrap();
        (bot, proto)
    }

    #[test]
    fn unconfigured_protocols_are_rejected() {
        let bot = Wyrm::from_config(test_config());
        let err = bot
            .register_protocol(RecordingProtocol::shared("telnet") as BoxedProtocol)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::RuntimeError::Framework(FrameworkError::UnknownProtocol(_))
        ));
    }

    #[tokio::test]
    async fn command_lines_are_routed_and_replied_to() {
        let (bot, proto) = bot_with_protocol();
        let ctx = ctx(&proto, Some(alice()));

        bot.handle_line(&ctx, "!modules", true).await;
        let lines = proto.sent_lines();
        assert!(lines.contains(&"Loaded modules:".to_string()));
        assert!(lines.contains(&"wyrm".to_string()));
    }

    struct EarsPlugin {
        listeners: Vec<Listener>,
    }

    impl Plugin for EarsPlugin {
        fn name(&self) -> &str {
            "ears"
        }
        fn commands(&self) -> Vec<wyrm_core::Command> {
            Vec::new()
        }
        fn listeners(&self) -> Vec<Listener> {
            self.listeners.clone()
        }
    }

    /// Binds a hear listener that records every message it receives.
    fn install_ears(bot: &Wyrm) -> Arc<Mutex<Vec<String>>> {
        let heard: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&heard);
        bot.register_plugin_factory("ears", move || {
            let sink = Arc::clone(&sink);
            Ok(Arc::new(EarsPlugin {
                listeners: vec![Listener::new(EventKind::Hear, move |_ctx, message| {
                    let sink = Arc::clone(&sink);
                    async move {
                        sink.lock().push(message);
                        Ok(())
                    }
                })],
            }) as BoxedPlugin)
        });
        bot.router().add_module("irc", "ears").unwrap();
        heard
    }

    #[tokio::test]
    async fn non_command_lines_become_hear_events() {
        let (bot, proto) = bot_with_protocol();
        let heard = install_ears(&bot);

        let ctx = ctx(&proto, Some(alice()));
        bot.handle_line(&ctx, "hello there", true).await;
        assert_eq!(heard.lock().clone(), vec!["hello there".to_string()]);
    }

    #[tokio::test]
    async fn unauthenticated_command_lines_are_heard_not_executed() {
        let (bot, proto) = bot_with_protocol();
        let heard = install_ears(&bot);

        // Known user, but the host did not match any recorded mask.
        let ctx = ctx(&proto, Some(alice()));
        bot.handle_line(&ctx, "!help", false).await;

        assert_eq!(heard.lock().clone(), vec!["!help".to_string()]);
        assert!(proto.sent_lines().is_empty());
        assert!(proto.notice_lines().is_empty());
    }

    #[tokio::test]
    async fn die_requests_shutdown() {
        let (bot, proto) = bot_with_protocol();
        let ctx = ctx(&proto, Some(alice()));

        bot.handle_line(&ctx, "!die", true).await;
        assert!(bot.shutdown_token().is_cancelled());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (bot, proto) = bot_with_protocol();
        bot.shutdown().await;
        bot.shutdown().await;
        assert_eq!(*proto.disconnects.lock(), 1);
    }

    #[tokio::test]
    async fn builtin_module_cannot_be_reloaded() {
        let (bot, proto) = bot_with_protocol();
        let ctx = ctx(&proto, Some(alice()));

        bot.handle_line(&ctx, "!reload wyrm", true).await;
        assert!(
            proto
                .sent_lines()
                .contains(&"Built-in module cannot be reloaded".to_string())
        );
    }

    #[tokio::test]
    async fn help_describes_commands_privately() {
        let (bot, proto) = bot_with_protocol();
        let ctx = ctx(&proto, Some(alice()));

        bot.handle_line(&ctx, "!help die", true).await;
        let notices = proto.notice_lines();
        assert!(notices.contains(&"Usage: !die".to_string()));

        bot.handle_line(&ctx, "!help bogus", true).await;
        assert!(proto.notice_lines().contains(&"Not a valid command".to_string()));
    }

    #[tokio::test]
    async fn tunnels_plugin_is_available_by_default() {
        let (bot, _proto) = bot_with_protocol();
        bot.router().add_module("irc", "tunnels").unwrap();
        assert!(bot.router().command("irc", "tunnel").is_some());
        assert!(bot.router().command("irc", "_tunnels").is_some());
    }

    #[tokio::test]
    async fn resolve_user_authenticates_against_host_masks() {
        let (bot, _proto) = bot_with_protocol();

        let (user, authed) = bot.resolve_user("alice|work", "alice@somewhere.net").await;
        assert_eq!(user.unwrap().id, 1);
        assert!(authed);

        let (user, authed) = bot.resolve_user("nobody", "x@y").await;
        assert!(user.is_none());
        assert!(!authed);
    }
}
