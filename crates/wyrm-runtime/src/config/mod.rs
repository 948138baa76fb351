//! Configuration for the Wyrm runtime.
//!
//! TOML-based configuration loading with environment variable overlays,
//! covering the bot identity, configured protocols and their module lists,
//! known users, and logging.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{LogLevel, LogOutput, LoggingConfig, ProtocolConfig, UserConfig, WyrmConfig};
