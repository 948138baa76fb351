//! Test doubles shared by the framework test modules.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use wyrm_core::{CommandContext, Protocol, ProtocolResult, Style, User};

/// A message an adapter was asked to deliver.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub target: String,
    pub line: String,
    pub style: Style,
}

/// Recording protocol adapter.
///
/// Styles render visibly so relay formatting can be asserted on:
/// bold wraps in `*`, a color prefixes `[color]`.
pub struct MockProtocol {
    proto: String,
    channels: Vec<String>,
    sent: Mutex<Vec<Delivery>>,
    notices: Mutex<Vec<Delivery>>,
    disconnects: Mutex<usize>,
}

impl MockProtocol {
    pub fn shared(proto: &str) -> Arc<Self> {
        Arc::new(Self::with_channels(proto, &[]))
    }

    pub fn shared_with_channels(proto: &str, channels: &[&str]) -> Arc<Self> {
        Arc::new(Self::with_channels(proto, channels))
    }

    fn with_channels(proto: &str, channels: &[&str]) -> Self {
        Self {
            proto: proto.to_string(),
            channels: channels.iter().map(|c| (*c).to_string()).collect(),
            sent: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            disconnects: Mutex::new(0),
        }
    }

    pub fn sent(&self) -> Vec<Delivery> {
        self.sent.lock().clone()
    }

    pub fn notices(&self) -> Vec<Delivery> {
        self.notices.lock().clone()
    }

    pub fn disconnect_count(&self) -> usize {
        *self.disconnects.lock()
    }
}

#[async_trait]
impl Protocol for MockProtocol {
    fn proto(&self) -> &str {
        &self.proto
    }

    fn public_channels(&self) -> Vec<String> {
        self.channels.clone()
    }

    async fn send_message(&self, target: &str, line: &str, style: &Style) -> ProtocolResult<()> {
        self.sent.lock().push(Delivery {
            target: target.to_string(),
            line: line.to_string(),
            style: style.clone(),
        });
        Ok(())
    }

    async fn send_notification(
        &self,
        target: &str,
        line: &str,
        style: &Style,
    ) -> ProtocolResult<()> {
        self.notices.lock().push(Delivery {
            target: target.to_string(),
            line: line.to_string(),
            style: style.clone(),
        });
        Ok(())
    }

    fn format(&self, text: &str, style: &Style) -> String {
        let mut out = text.to_string();
        if style.bold {
            out = format!("*{out}*");
        }
        if let Some(color) = &style.color {
            out = format!("[{color}]{out}");
        }
        out
    }

    async fn disconnect(&self) -> ProtocolResult<()> {
        *self.disconnects.lock() += 1;
        Ok(())
    }
}

/// Fixed-content user directory.
pub struct StaticDirectory {
    users: Vec<User>,
}

impl StaticDirectory {
    pub fn shared(users: Vec<User>) -> Arc<Self> {
        Arc::new(Self { users })
    }
}

#[async_trait]
impl wyrm_core::UserDirectory for StaticDirectory {
    async fn by_handle(&self, handle: &str) -> Option<User> {
        self.users
            .iter()
            .find(|u| u.name.eq_ignore_ascii_case(handle))
            .cloned()
    }

    async fn by_id(&self, id: u64) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }

    async fn auth_host(&self, _user: &User, _userhost: &str) -> bool {
        false
    }
}

/// Builds a user with the given access level.
pub fn user(id: u64, name: &str, access: i32) -> User {
    User {
        id,
        name: name.to_string(),
        access,
        color: None,
    }
}

/// Builds a context on the given mock adapter.
pub fn ctx_on(
    proto: &Arc<MockProtocol>,
    channel: Option<&str>,
    user: Option<User>,
    alias: &str,
) -> CommandContext {
    CommandContext::new(
        Arc::clone(proto) as Arc<dyn Protocol>,
        channel.map(str::to_string),
        user,
        alias,
    )
}
