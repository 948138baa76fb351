//! The built-in tunnels plugin.
//!
//! Exposes the user-facing tunnel commands (`!tunnel`, `!close`,
//! `!tunnels`, `!_tunnels`) and the two listeners that make tunnels live:
//! `hear` relays spoken lines along the speaker's open tunnels, `hearExit`
//! collapses a user's tunnels when they sign off.

use std::sync::Arc;

use super::{Party, TunnelManager};
use crate::error::FrameworkError;
use wyrm_core::{
    BoxedDirectory, CHANNEL_MARKER, Command, CommandContext, CommandError, CommandResult,
    EventKind, Listener, Plugin, ProtocolSet, User, handle,
};

/// Module name the plugin registers under.
pub const MODULE: &str = "tunnels";

/// Plugin wiring tunnel state to commands and listeners.
pub struct TunnelsPlugin {
    manager: Arc<TunnelManager>,
    protocols: ProtocolSet,
    directory: BoxedDirectory,
}

impl TunnelsPlugin {
    /// Creates the plugin over shared tunnel state.
    pub fn new(
        manager: Arc<TunnelManager>,
        protocols: ProtocolSet,
        directory: BoxedDirectory,
    ) -> Self {
        Self {
            manager,
            protocols,
            directory,
        }
    }

    fn list_command(&self) -> Command {
        let manager = Arc::clone(&self.manager);
        Command::named("tunnels")
            .level(0)
            .usage("!tunnels")
            .desc("Lists all your open tunnels.")
            .handler(move |ctx, _args| {
                let manager = Arc::clone(&manager);
                async move {
                    let from = Party::from_context(&ctx);
                    let tunnels = manager.for_party(&from);
                    let mut content = Vec::new();
                    if tunnels.is_empty() {
                        content.push("No active tunnels".to_string());
                    } else {
                        content.push("Active tunnels:".to_string());
                        for tunnel in &tunnels {
                            content.push(format!("  {}", tunnel.to()));
                        }
                    }
                    ctx.reply(content).await?;
                    Ok(())
                }
            })
    }

    fn list_all_command(&self) -> Command {
        let manager = Arc::clone(&self.manager);
        Command::named("_tunnels")
            .level(10)
            .usage("!_tunnels")
            .desc("Lists all open tunnels.")
            .handler(move |ctx, _args| {
                let manager = Arc::clone(&manager);
                async move {
                    let tunnels = manager.all();
                    let mut content = Vec::new();
                    if tunnels.is_empty() {
                        content.push("No active tunnels".to_string());
                    } else {
                        content.push(format!("{} active tunnels:", tunnels.len()));
                        for tunnel in &tunnels {
                            content.push(format!("  {tunnel}"));
                        }
                    }
                    ctx.reply(content).await?;
                    Ok(())
                }
            })
    }

    fn open_command(&self) -> Command {
        let manager = Arc::clone(&self.manager);
        let protocols = self.protocols.clone();
        let directory = Arc::clone(&self.directory);
        Command::named("tunnel")
            .level(2)
            .usage("!tunnel <proto:target>")
            .desc("Opens an inter-protocol tunnel. Target may be a nickname or channel.")
            .handler(move |ctx, args| {
                let manager = Arc::clone(&manager);
                let protocols = protocols.clone();
                let directory = Arc::clone(&directory);
                async move {
                    let Some((tproto, target)) = args.trim().split_once(':') else {
                        return Err(CommandError::BadParams);
                    };
                    let destination = match protocols.get(tproto) {
                        Some(p) if !target.is_empty() => p,
                        _ => {
                            ctx.reply("Cannot resolve user/protocol").await?;
                            return Ok(());
                        }
                    };

                    let to = if target.starts_with(CHANNEL_MARKER) {
                        if !destination.has_channel(target) {
                            let err = FrameworkError::UnknownChannel {
                                channel: target.to_string(),
                                proto: tproto.to_string(),
                            };
                            ctx.reply(err.to_string()).await?;
                            return Ok(());
                        }
                        Party::channel(destination, target)
                    } else {
                        // Unmatched handles get a relay-only anonymous
                        // endpoint; it can never pass authorization gates.
                        let user = directory
                            .by_handle(handle(target))
                            .await
                            .unwrap_or_else(|| User::anonymous(handle(target)));
                        Party::user(destination, target, Some(user))
                    };

                    let from = Party::from_context(&ctx);
                    let (forward, _reverse) = manager.open(from, to);
                    let opened =
                        |party: &Party| format!("Tunnel open to {party}. Type !close to end this session.");
                    forward.message_source(&opened(forward.to())).await?;
                    forward.message_destination(&opened(forward.from())).await?;
                    Ok(())
                }
            })
    }

    fn close_command(&self) -> Command {
        let manager = Arc::clone(&self.manager);
        Command::named("close")
            .level(0)
            .usage("!close [proto:target]")
            .desc(
                "Closes an inter-protocol tunnel. Proto and target are optional. \
                 If omitted, all tunnels are closed.",
            )
            .handler(move |ctx, args| {
                let manager = Arc::clone(&manager);
                async move {
                    let selector = args
                        .trim()
                        .split_once(':')
                        .map(|(p, t)| (p.to_string(), t.to_string()));
                    let from = Party::from_context(&ctx);
                    for tunnel in manager.for_party(&from) {
                        let matched = selector.as_ref().is_none_or(|(p, t)| {
                            tunnel.to().proto() == p.as_str() && tunnel.to().name() == t.as_str()
                        });
                        if !matched {
                            continue;
                        }
                        if manager.close(tunnel.id()).is_some() {
                            tunnel
                                .message_source(&format!("Closed tunnel to {}", tunnel.to()))
                                .await?;
                            tunnel
                                .message_destination(&format!("Closed tunnel to {}", tunnel.from()))
                                .await?;
                        }
                    }
                    Ok(())
                }
            })
    }

    fn hear_listener(&self) -> Listener {
        let manager = Arc::clone(&self.manager);
        Listener::new(EventKind::Hear, move |ctx, line| {
            let manager = Arc::clone(&manager);
            async move { relay(&manager, &ctx, &line).await }
        })
    }

    fn sign_off_listener(&self) -> Listener {
        let manager = Arc::clone(&self.manager);
        Listener::new(EventKind::HearExit, move |ctx, _message| {
            let manager = Arc::clone(&manager);
            async move {
                for tunnel in
                    manager.for_speaker(ctx.user.as_ref(), &ctx.alias, ctx.protocol.proto())
                {
                    if manager.close(tunnel.id()).is_some() {
                        tunnel
                            .message_destination(&format!(
                                "{} has signed off. Tunnel closed.",
                                tunnel.from().name()
                            ))
                            .await?;
                    }
                }
                Ok(())
            }
        })
    }
}

impl Plugin for TunnelsPlugin {
    fn name(&self) -> &str {
        MODULE
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            self.list_command(),
            self.list_all_command(),
            self.open_command(),
            self.close_command(),
        ]
    }

    fn listeners(&self) -> Vec<Listener> {
        vec![self.hear_listener(), self.sign_off_listener()]
    }
}

/// Forwards a heard line along every tunnel it belongs to.
async fn relay(manager: &TunnelManager, ctx: &CommandContext, line: &str) -> CommandResult<()> {
    for tunnel in manager.for_speaker(ctx.user.as_ref(), &ctx.alias, ctx.protocol.proto()) {
        tunnel.relay_line(line).await?;

        // The destination may itself be a channel with outgoing tunnels of
        // its own; fan the line out along those too, but never back along
        // one pointing at this tunnel's source.
        let to = tunnel.to();
        if to.channel.is_some() {
            for chunnel in manager.channel_tunnels(to.proto()) {
                if chunnel.from().channel == to.channel && chunnel.to() != tunnel.from() {
                    chunnel.relay_channel_line(ctx, line).await?;
                }
            }
        }
    }

    // Channel-sourced tunnels relay every line spoken in their channel,
    // regardless of speaker.
    if let Some(channel) = &ctx.channel {
        for tunnel in manager.channel_tunnels(ctx.protocol.proto()) {
            if tunnel.from().channel.as_deref() == Some(channel.as_str()) {
                tunnel.relay_channel_line(ctx, line).await?;
            }
        }
    }
    Ok(())
}
