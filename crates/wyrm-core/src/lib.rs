//! # Wyrm Core
//!
//! Foundation types for the Wyrm multi-protocol chat bot framework.
//!
//! One logical bot receives text events from independent chat transports,
//! interprets a subset of lines as commands, and dispatches them to
//! pluggable handlers while broadcasting raw events to interested
//! listeners. This crate holds the contracts the rest of the stack is
//! built on:
//!
//! - **Protocol adapters** ([`Protocol`]): the fixed capability set every
//!   transport implements (send, notify, format, channel membership,
//!   disconnect).
//! - **Command context** ([`CommandContext`]): the per-event value binding
//!   protocol, channel, user, alias and timestamp, plus the
//!   `reply`/`notify` surfaces.
//! - **Plugins** ([`Plugin`]): named units exposing explicit [`Command`]
//!   and [`Listener`] registration records; no runtime reflection.
//! - **Users** ([`User`], [`UserDirectory`]): opaque external identities
//!   with an access level; storage is someone else's problem.
//! - **Errors** ([`CommandError`], [`ProtocolError`]): the taxonomy
//!   handlers signal failure through.
//!
//! Dispatch machinery (registry, bus, router, tunnels) lives in
//! `wyrm-framework`; lifecycle and configuration in `wyrm-runtime`.

pub mod command;
pub mod context;
pub mod error;
pub mod event;
pub mod plugin;
pub mod protocol;
pub mod user;

pub use command::{COMMAND_MARKER, Command, CommandBuilder, CommandHandler, parse_command};
pub use context::{CommandContext, Content};
pub use error::{CommandError, CommandResult, ProtocolError, ProtocolResult};
pub use event::EventKind;
pub use plugin::{BoxedPlugin, Listener, ListenerHandler, Plugin};
pub use protocol::{BoxedProtocol, CHANNEL_MARKER, Protocol, ProtocolSet, Style};
pub use user::{BoxedDirectory, User, UserDirectory, handle};
