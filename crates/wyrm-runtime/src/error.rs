//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use wyrm_core::ProtocolError;
use wyrm_framework::FrameworkError;

/// Errors that can occur during runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be loaded or was invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A framework operation failed.
    #[error(transparent)]
    Framework(#[from] FrameworkError),

    /// A protocol adapter failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
