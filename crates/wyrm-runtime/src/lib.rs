//! Wyrm Runtime - lifecycle and configuration layer for the Wyrm bot.
//!
//! This crate provides:
//! - The bot orchestrator ([`Wyrm`]): protocol registration, inbound line
//!   handling, built-in administration commands, graceful shutdown
//! - Configuration loading ([`ConfigLoader`], [`WyrmConfig`])
//! - The configuration-backed user directory ([`InMemoryDirectory`])
//! - Logging setup ([`LoggingBuilder`])
//!
//! ```ignore
//! use wyrm_runtime::{ConfigLoader, Wyrm};
//!
//! #[tokio::main]
//! async fn main() -> wyrm_runtime::RuntimeResult<()> {
//!     let config = ConfigLoader::new().with_current_dir().load()?;
//!     let bot = Wyrm::from_config(config);
//!
//!     // Register connected protocol adapters, then run until Ctrl+C
//!     // or a `!die` from an operator.
//!     bot.register_protocol(my_adapter)?;
//!     bot.run().await
//! }
//! ```

pub mod bot;
mod builtin;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;

// Re-exports
pub use bot::{Wyrm, from_default_config};
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LogLevel, LogOutput, LoggingConfig, ProtocolConfig,
    UserConfig, WyrmConfig,
};
pub use directory::InMemoryDirectory;
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
