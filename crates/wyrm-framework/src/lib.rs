//! # Wyrm Framework
//!
//! Dispatch machinery for the Wyrm multi-protocol chat bot: the plugin
//! registry, the event bus, the per-protocol command router, and the
//! inter-protocol tunnel subsystem.
//!
//! Everything here is transport-agnostic. Adapters hand inbound events to
//! the orchestrator (`wyrm-runtime`), which parses command lines and calls
//! into [`CommandRouter::execute`] or [`EventBus::notify`]; both convert
//! every handler failure into user-facing lines or log records; a broken
//! plugin never takes down the bot or its neighbours.

pub mod bus;
pub mod error;
pub mod registry;
pub mod router;
pub mod tunnel;

#[cfg(test)]
mod testing;

pub use bus::EventBus;
pub use error::{FrameworkError, FrameworkResult};
pub use registry::{PluginFactory, PluginRegistry};
pub use router::CommandRouter;
pub use tunnel::{Party, Tunnel, TunnelId, TunnelManager, plugin::TunnelsPlugin};
