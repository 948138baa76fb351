//! Echo Bot Example
//!
//! A minimal Wyrm bot speaking a single "protocol": the local console.
//! Lines typed on stdin arrive as the operator's messages; replies and
//! notifications are printed back. Demonstrates the three moving parts of
//! a Wyrm application:
//!
//! - a [`Protocol`] adapter (here, stdin/stdout)
//! - a custom plugin registered by factory (`echo`)
//! - the runtime lifecycle (`Wyrm::from_config`, `register_protocol`, `run`)
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! ```
//!
//! Then try `!echo hello`, `!ping`, `!help`, `!modules` or `!die`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use wyrm::core::{
    BoxedPlugin, BoxedProtocol, Command, CommandContext, Plugin, Protocol, ProtocolResult, Style,
};
use wyrm::prelude::*;
use wyrm::runtime::{ConfigLoader, ProtocolConfig, UserConfig};

// ============================================================================
// Console Protocol
// ============================================================================

/// The console as a chat transport: one user, no channels.
struct ConsoleProtocol;

#[async_trait]
impl Protocol for ConsoleProtocol {
    fn proto(&self) -> &str {
        "console"
    }

    fn public_channels(&self) -> Vec<String> {
        Vec::new()
    }

    async fn send_message(&self, target: &str, line: &str, _style: &Style) -> ProtocolResult<()> {
        println!("[{target}] {line}");
        Ok(())
    }

    async fn send_notification(
        &self,
        target: &str,
        line: &str,
        _style: &Style,
    ) -> ProtocolResult<()> {
        println!("[{target}] (notice) {line}");
        Ok(())
    }

    async fn disconnect(&self) -> ProtocolResult<()> {
        println!("Console session closed.");
        Ok(())
    }
}

// ============================================================================
// Echo Plugin
// ============================================================================

struct EchoPlugin;

impl Plugin for EchoPlugin {
    fn name(&self) -> &str {
        "echo"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::named("echo")
                .usage("!echo <text>")
                .desc("Repeats whatever you said.")
                .handler(|ctx: CommandContext, args: String| async move {
                    ctx.reply(args).await?;
                    Ok(())
                }),
            Command::named("ping")
                .usage("!ping")
                .desc("Pong.")
                .handler(|ctx: CommandContext, _args: String| async move {
                    ctx.reply("Pong!").await?;
                    Ok(())
                }),
        ]
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> wyrm::runtime::RuntimeResult<()> {
    let config = ConfigLoader::new()
        .with_current_dir()
        .merge(WyrmConfig {
            name: "EchoBot".to_string(),
            protocols: vec![ProtocolConfig {
                id: "console".to_string(),
                modules: vec!["echo".to_string(), "tunnels".to_string()],
            }],
            users: vec![UserConfig {
                id: 1,
                name: "operator".to_string(),
                access: 60,
                color: None,
                hosts: vec!["*".to_string()],
            }],
            ..WyrmConfig::default()
        })
        .load()?;

    let bot = Wyrm::from_config(config);
    bot.register_plugin_factory("echo", || Ok(Arc::new(EchoPlugin) as BoxedPlugin));

    let console: BoxedProtocol = Arc::new(ConsoleProtocol);
    bot.register_protocol(Arc::clone(&console))?;

    // Feed stdin lines into the bot until shutdown.
    let reader = bot.clone();
    let token = bot.shutdown_token();
    bot.spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                line = lines.next_line() => {
                    let Ok(Some(line)) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let (user, authed) = reader.resolve_user("operator", "operator@console").await;
                    let ctx = CommandContext::new(Arc::clone(&console), None, user, "operator");
                    reader.handle_line(&ctx, &line, authed).await;
                }
            }
        }
    });

    info!("Type !help for a command index");
    bot.run().await
}
