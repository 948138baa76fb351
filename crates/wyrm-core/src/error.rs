//! Unified error types for the Wyrm core.
//!
//! Handlers signal failure through [`CommandError`]; the router and the
//! event bus are the only places these are converted into user-facing
//! text. Transport-level failures are [`ProtocolError`].

use thiserror::Error;

// =============================================================================
// Command Errors
// =============================================================================

/// Failures a command or listener handler may signal.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// Malformed command arguments.
    ///
    /// The router answers with the command's usage line.
    #[error("bad command arguments")]
    BadParams,

    /// Command-specific failure whose message is surfaced to the user verbatim.
    #[error("{0}")]
    Failed(String),

    /// Anything else. Logged with full detail, surfaced to the user only as
    /// a terse `kind: message` line.
    #[error("{kind}: {message}")]
    Unexpected {
        /// Short classification of the failure.
        kind: String,
        /// Human-readable detail.
        message: String,
    },
}

impl CommandError {
    /// Creates an execution failure with a user-facing message.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Creates a catch-all failure.
    pub fn unexpected(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unexpected {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<ProtocolError> for CommandError {
    fn from(err: ProtocolError) -> Self {
        Self::unexpected("ProtocolError", err.to_string())
    }
}

// =============================================================================
// Protocol Errors
// =============================================================================

/// Errors reported by protocol adapters.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// A message or notification could not be delivered.
    #[error("failed to send to {target}: {reason}")]
    SendFailed {
        /// The channel or alias the send was addressed to.
        target: String,
        /// Reason for failure.
        reason: String,
    },

    /// The transport connection is gone.
    #[error("protocol disconnected: {0}")]
    Disconnected(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl ProtocolError {
    /// Creates a send failure.
    pub fn send_failed(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for command and listener handlers.
pub type CommandResult<T> = Result<T, CommandError>;

/// Result type for protocol adapter operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
