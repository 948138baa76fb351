//! In-memory user directory.
//!
//! Users come from configuration; authentication is host-mask matching
//! only. A user configured with no host masks gets their first seen host
//! learned and recorded, mirroring how hosts are bootstrapped for new
//! users. Password re-authentication is intentionally unimplemented.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use crate::config::UserConfig;
use wyrm_core::{User, UserDirectory};

struct Record {
    user: User,
    hosts: Vec<String>,
}

/// Directory backed by the `users` section of the configuration.
#[derive(Default)]
pub struct InMemoryDirectory {
    records: RwLock<Vec<Record>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from configured users.
    pub fn from_config(users: &[UserConfig]) -> Self {
        let records = users
            .iter()
            .map(|u| Record {
                user: User {
                    id: u.id,
                    name: u.name.clone(),
                    access: u.access,
                    color: u.color.clone(),
                },
                hosts: u.hosts.clone(),
            })
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Host masks currently recorded for a user.
    pub fn hosts_of(&self, id: u64) -> Vec<String> {
        self.records
            .read()
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.hosts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn by_handle(&self, handle: &str) -> Option<User> {
        self.records
            .read()
            .iter()
            .find(|r| r.user.name.eq_ignore_ascii_case(handle))
            .map(|r| r.user.clone())
    }

    async fn by_id(&self, id: u64) -> Option<User> {
        self.records
            .read()
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone())
    }

    async fn auth_host(&self, user: &User, userhost: &str) -> bool {
        let mut records = self.records.write();
        let Some(record) = records.iter_mut().find(|r| r.user.id == user.id) else {
            return false;
        };
        if record.hosts.is_empty() {
            info!(host = %userhost, user = %user.name, "Adding host for first time user");
            record.hosts.push(userhost.to_string());
            return true;
        }
        record.hosts.iter().any(|mask| host_matches(mask, userhost))
    }
}

/// Matches a host against a mask where `*` stands for any run of
/// characters (including none).
fn host_matches(mask: &str, host: &str) -> bool {
    fn matches(mask: &[u8], host: &[u8]) -> bool {
        match mask.split_first() {
            None => host.is_empty(),
            Some((b'*', rest)) => {
                (0..=host.len()).any(|skip| matches(rest, &host[skip..]))
            }
            Some((c, rest)) => host.split_first().is_some_and(|(h, htail)| h == c && matches(rest, htail)),
        }
    }
    matches(mask.as_bytes(), host.as_bytes())
}
