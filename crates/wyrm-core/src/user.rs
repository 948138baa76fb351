//! Users and the external user directory.
//!
//! The core treats a [`User`] as a lookup key plus an access-level source.
//! Where users actually live (database, config file, ...) is delegated to a
//! [`UserDirectory`] collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An external identity known to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Numeric id. `0` marks an anonymous placeholder.
    pub id: u64,
    /// Canonical display name.
    pub name: String,
    /// Integer privilege ranking gating command execution.
    pub access: i32,
    /// Preferred display color for relayed lines, if any.
    #[serde(default)]
    pub color: Option<String>,
}

impl User {
    /// Creates an anonymous placeholder for an alias with no directory match.
    ///
    /// Anonymous users have no access and cannot pass authorization gates.
    pub fn anonymous(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            access: 0,
            color: None,
        }
    }

    /// True when this user is an anonymous placeholder.
    pub fn is_anonymous(&self) -> bool {
        self.id == 0
    }
}

/// Extracts a user's canonical lookup key from a display alias.
///
/// The handle is the portion of the alias before any `|` suffix, so
/// `krad|work` and `krad` resolve to the same user.
pub fn handle(alias: &str) -> &str {
    alias.split('|').next().unwrap_or(alias)
}

// =============================================================================
// User Directory
// =============================================================================

/// Lookup and authorization-check capability, provided by an external
/// collaborator (the core never owns user records).
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves a handle (case-insensitive) to a user.
    async fn by_handle(&self, handle: &str) -> Option<User>;

    /// Resolves a numeric id to a user.
    async fn by_id(&self, id: u64) -> Option<User>;

    /// Attempts to authenticate a user against a transport-reported host.
    ///
    /// Host-mask matching only; password re-authentication is intentionally
    /// unimplemented.
    async fn auth_host(&self, user: &User, userhost: &str) -> bool;
}

/// A shared user directory handle.
pub type BoxedDirectory = Arc<dyn UserDirectory>;
