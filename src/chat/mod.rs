//! Chat-session interaction model.
//!
//! - **message**: turns and the append-only [`MessageStore`].
//! - **persona**: the guide's system instruction.
//! - **session**: lazily created remote conversation ([`SessionClient`]).
//! - **controller**: the `Idle` / `AwaitingReply` state machine shells drive.

pub mod controller;
pub mod message;
pub mod persona;
pub mod session;

use thiserror::Error;

pub use controller::{ChatController, ChatSnapshot, ChatState, PendingReply};
pub use message::{ChatMessage, MessageStore, Role};
pub use persona::Persona;
pub use session::{RemoteError, SessionClient, SessionHandle};

/// First turn of every conversation.
pub const DEFAULT_WELCOME: &str = "Welcome to Angika. How is your inner rhythm today?";
/// Shown when the remote reply carries no text.
pub const DEFAULT_PLACEHOLDER: &str = "Movement unclear.";
/// Shown when the remote call fails.
pub const DEFAULT_FALLBACK: &str = "Silence in the signal. Please try again.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("invalid role: '{0}'")]
    InvalidRole(String),
}
