//! The closed set of bus event kinds.

use std::fmt;

/// Kinds of events fanned out by the event bus.
///
/// The set is closed: adapters report exactly these and plugins listen to
/// exactly these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An adapter joined a channel.
    Joined,
    /// The bot's own identity was seen arriving.
    Enter,
    /// The bot's own identity was seen leaving.
    Exit,
    /// A line of text that was not consumed as a command.
    Hear,
    /// Another user became visible.
    HearEnter,
    /// Another user became invisible (signed off, parted, ...).
    HearExit,
}

impl EventKind {
    /// All event kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Joined,
        Self::Enter,
        Self::Exit,
        Self::Hear,
        Self::HearEnter,
        Self::HearExit,
    ];

    /// The wire-ish name of the kind, as used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::Enter => "enter",
            Self::Exit => "exit",
            Self::Hear => "hear",
            Self::HearEnter => "hearEnter",
            Self::HearExit => "hearExit",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
