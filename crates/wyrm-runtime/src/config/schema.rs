//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WyrmConfig {
    /// Display name of the bot; also its handle in the user directory.
    #[serde(default = "default_name")]
    pub name: String,

    /// Command level at or above which a user must actually authenticate,
    /// on top of the access-level check.
    #[serde(default = "default_auth_threshold")]
    pub auth_threshold: i32,

    /// Protocols the bot accepts adapters for, with the plugin modules to
    /// bind into each protocol's command table.
    #[serde(default)]
    pub protocols: Vec<ProtocolConfig>,

    /// Known users.
    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for WyrmConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            auth_threshold: default_auth_threshold(),
            protocols: Vec::new(),
            users: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_name() -> String {
    "Wyrm".to_string()
}

fn default_auth_threshold() -> i32 {
    3
}

/// One configured protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol identifier (e.g. `"irc"`); must match the adapter's
    /// reported id.
    pub id: String,

    /// Plugin modules to bind into this protocol, in order.
    #[serde(default)]
    pub modules: Vec<String>,
}

/// One known user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Numeric id; must be non-zero (zero marks anonymous placeholders).
    pub id: u64,

    /// Canonical handle, matched case-insensitively against aliases.
    pub name: String,

    /// Access level.
    #[serde(default)]
    pub access: i32,

    /// Preferred display color for relayed lines.
    #[serde(default)]
    pub color: Option<String>,

    /// Host masks this user may authenticate from. Wildcards (`*`) are
    /// allowed. An empty list means the first host seen is learned.
    #[serde(default)]
    pub hosts: Vec<String>,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name, as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// The corresponding `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module level overrides (e.g. `wyrm_framework = "debug"`).
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = WyrmConfig::default();
        assert_eq!(config.name, "Wyrm");
        assert_eq!(config.auth_threshold, 3);
        assert!(config.protocols.is_empty());
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stdout);
    }
}
