//! The built-in administration module.
//!
//! Installed under the module name `wyrm` on every protocol. Carries the
//! commands that manage the bot itself: shutdown, help, module listing,
//! loading and reloading, and a view of tracked background tasks.
//!
//! Handlers hold a weak reference to the bot core so a plugin instance
//! never keeps the bot alive; a handler firing after teardown is a no-op.

use std::sync::Weak;

use wyrm_core::{Command, CommandError, Plugin, Style};

use crate::bot::BotCore;

/// Module name the built-in plugin is registered under.
pub(crate) const MODULE: &str = "wyrm";

/// The always-present administration plugin.
pub(crate) struct BuiltinPlugin {
    core: Weak<BotCore>,
}

impl BuiltinPlugin {
    pub(crate) fn new(core: Weak<BotCore>) -> Self {
        Self { core }
    }

    fn die_command(&self) -> Command {
        let core = self.core.clone();
        Command::named("die")
            .level(50)
            .usage("!die")
            .desc("Die!")
            .handler(move |_ctx, _args| {
                let core = core.clone();
                async move {
                    if let Some(core) = core.upgrade() {
                        core.shutdown.cancel();
                    }
                    Ok(())
                }
            })
    }

    fn help_command(&self) -> Command {
        let core = self.core.clone();
        Command::named("help")
            .level(1)
            .usage("!help [command]")
            .desc("Without arguments this gives an index of commands. Name a command to learn more about it.")
            .handler(move |ctx, args| {
                let core = core.clone();
                async move {
                    let Some(core) = core.upgrade() else {
                        return Ok(());
                    };
                    let proto = ctx.protocol.proto().to_string();
                    let access = ctx.user.as_ref().map_or(0, |u| u.access);
                    let topic = args.trim();

                    if !topic.is_empty() {
                        let Some(command) = core.router.command(&proto, topic) else {
                            ctx.notify("Not a valid command").await?;
                            return Ok(());
                        };
                        // Commands above the caller's level stay invisible.
                        if command.level() > access {
                            return Ok(());
                        }
                        ctx.notify(vec![
                            format!("Usage: {}", command.usage()),
                            command.desc().to_string(),
                        ])
                        .await?;
                        return Ok(());
                    }

                    let mut content = vec!["Available commands:".to_string()];
                    for module in core.router.modules(&proto) {
                        let Some(plugin) = core.registry.get(&module) else {
                            continue;
                        };
                        let mut names: Vec<String> = plugin
                            .commands()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect();
                        names.sort();
                        let list = names
                            .iter()
                            .map(|n| format!("!{n}"))
                            .collect::<Vec<_>>()
                            .join(", ");
                        let label = ctx
                            .protocol
                            .format(&module, &Style::plain().with_bold());
                        content.push(format!("{label}: {list}"));
                    }
                    ctx.notify(content).await?;
                    Ok(())
                }
            })
    }

    fn modules_command(&self) -> Command {
        let core = self.core.clone();
        Command::named("modules")
            .level(20)
            .usage("!modules")
            .desc("Lists the currently loaded modules.")
            .handler(move |ctx, _args| {
                let core = core.clone();
                async move {
                    let Some(core) = core.upgrade() else {
                        return Ok(());
                    };
                    let mut content = vec!["Loaded modules:".to_string()];
                    content.extend(core.registry.names());
                    ctx.reply(content).await?;
                    Ok(())
                }
            })
    }

    fn load_command(&self) -> Command {
        let core = self.core.clone();
        Command::named("load")
            .level(50)
            .usage("!load <module> <protocol>")
            .desc("Binds a module's commands into a protocol's command table.")
            .handler(move |ctx, args| {
                let core = core.clone();
                async move {
                    let Some(core) = core.upgrade() else {
                        return Ok(());
                    };
                    let mut parts = args.split_whitespace();
                    let (Some(module), Some(proto)) = (parts.next(), parts.next()) else {
                        return Err(CommandError::BadParams);
                    };
                    core.router
                        .add_module(proto, module)
                        .map_err(|e| CommandError::failed(e.to_string()))?;
                    ctx.reply(format!("Added module {module} to {proto}")).await?;
                    Ok(())
                }
            })
    }

    fn reload_command(&self) -> Command {
        let core = self.core.clone();
        Command::named("reload")
            .level(50)
            .usage("!reload <module>")
            .desc("Replaces a module's live instance with a freshly built one.")
            .handler(move |ctx, args| {
                let core = core.clone();
                async move {
                    let Some(core) = core.upgrade() else {
                        return Ok(());
                    };
                    let module = args.trim();
                    if module.is_empty() {
                        return Err(CommandError::BadParams);
                    }
                    if module == MODULE {
                        return Err(CommandError::failed("Built-in module cannot be reloaded"));
                    }
                    match core.registry.reload(module) {
                        Ok(_) => {
                            core.router
                                .remerge(module)
                                .map_err(|e| CommandError::failed(e.to_string()))?;
                            ctx.reply(format!("{module} has been reloaded.")).await?;
                        }
                        // A broken reload keeps the old instance; report and move on.
                        Err(e) => {
                            ctx.reply(e.to_string()).await?;
                        }
                    }
                    Ok(())
                }
            })
    }

    fn tasks_command(&self) -> Command {
        let core = self.core.clone();
        Command::named("tasks")
            .level(50)
            .usage("!tasks")
            .desc("Shows how many background tasks are currently tracked.")
            .handler(move |ctx, _args| {
                let core = core.clone();
                async move {
                    let Some(core) = core.upgrade() else {
                        return Ok(());
                    };
                    ctx.reply(format!("{} tracked tasks", core.tasks.len())).await?;
                    Ok(())
                }
            })
    }
}

impl Plugin for BuiltinPlugin {
    fn name(&self) -> &str {
        MODULE
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            self.die_command(),
            self.help_command(),
            self.modules_command(),
            self.load_command(),
            self.reload_command(),
            self.tasks_command(),
        ]
    }
}
