//! Framework error types.

use thiserror::Error;

/// Errors that can occur in the dispatch framework.
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// A protocol id that was never configured.
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// A channel that does not exist on the destination protocol.
    #[error("Channel {channel} does not exist on protocol {proto}")]
    UnknownChannel {
        /// The requested channel name.
        channel: String,
        /// The destination protocol id.
        proto: String,
    },

    /// A module that does not define a usable plugin.
    ///
    /// Unrecoverable configuration error: the module's factory produced
    /// something other than exactly one well-formed plugin.
    #[error("module '{module}' does not define a plugin: {reason}")]
    Definition {
        /// The module name.
        module: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A module could not be resolved or (re)loaded.
    #[error("failed to load module '{module}': {reason}")]
    ModuleLoad {
        /// The module name.
        module: String,
        /// What went wrong.
        reason: String,
    },
}

impl FrameworkError {
    /// Creates a definition error.
    pub fn definition(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Definition {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Creates a module load error.
    pub fn module_load(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModuleLoad {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for framework operations.
pub type FrameworkResult<T> = Result<T, FrameworkError>;
