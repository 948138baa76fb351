//! # Wyrm
//!
//! A multi-protocol chat bot: one logical bot, many chat transports,
//! pluggable command modules, and tunnels that relay conversation between
//! protocols.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────┐     ┌──────────────────────────────┐
//! │  Protocol   │────▶│ Router │────▶│ Plugin "wyrm"    (commands)  │
//! │  adapters   │     │  Bus   │────▶│ Plugin "tunnels" (commands + │
//! └─────────────┘     └────────┘     │                   listeners) │
//!                                    └──────────────────────────────┘
//! ```
//!
//! - **Adapters**: transport implementations of [`core::Protocol`]
//! - **Router**: per-protocol command tables with access-level gating
//! - **Bus**: broadcast of non-command events (hear, join, enter, exit)
//! - **Plugins**: named modules exposing commands and listeners
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wyrm::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> wyrm::runtime::RuntimeResult<()> {
//!     let config = ConfigLoader::new().with_current_dir().load()?;
//!     let bot = Wyrm::from_config(config);
//!     bot.register_protocol(my_adapter)?;
//!     bot.run().await
//! }
//! ```

pub use wyrm_core as core;
pub use wyrm_framework as framework;
pub use wyrm_runtime as runtime;

/// Prelude module for convenient imports.
///
/// This module provides all commonly used types for building bot
/// applications:
///
/// ```rust,ignore
/// use wyrm::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use wyrm_runtime::{ConfigLoader, Wyrm, WyrmConfig};

    // Protocol adapter contract
    pub use wyrm_core::{BoxedProtocol, Protocol, ProtocolResult, ProtocolSet, Style};

    // Plugin system - commands, listeners, context
    pub use wyrm_core::{
        BoxedPlugin, Command, CommandContext, CommandError, CommandResult, EventKind, Listener,
        Plugin,
    };

    // Users and directories
    pub use wyrm_core::{BoxedDirectory, User, UserDirectory};

    // Tunnels
    pub use wyrm_framework::{Party, Tunnel, TunnelManager};

    // Logging macros
    pub use wyrm_runtime::prelude::*;
}
