//! Session Management
//!
//! One session is one tap-to-completion interaction with the radio. At most
//! one is live at a time; it sits in a [`SessionSlot`] owned by the facade and
//! is driven through its phases by the [`SessionMachine`].

mod machine;
mod slot;

pub use machine::{SessionMachine, TagOutcome};
pub use slot::SessionSlot;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generation number of a session. Strictly increasing per facade, so an id
/// that is not the live one always belongs to an ended session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn from_raw(generation: u64) -> Self {
        Self(generation)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Whether the session reads tags or writes to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Read,
    Write,
}

impl SessionMode {
    /// Writes end after the first tag; reads keep scanning.
    pub fn invalidate_after_first_read(&self) -> bool {
        matches!(self, SessionMode::Write)
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Read => write!(f, "read"),
            SessionMode::Write => write!(f, "write"),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "reason")]
pub enum Termination {
    Completed,
    Failed(String),
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Activating,
    AwaitingTag,
    Connecting,
    QueryingCapability,
    Reading,
    Writing,
    Terminated(Termination),
}

/// A live tag session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,

    pub mode: SessionMode,

    pub phase: Phase,

    /// Latest progress text for this session.
    pub status: String,

    /// Text to write, set only for write sessions until the write lands.
    pub pending_outgoing_text: Option<String>,
}

impl Session {
    /// Create a read session in the `Activating` phase.
    pub fn read(id: SessionId, status: impl Into<String>) -> Self {
        Self::new(id, SessionMode::Read, None, status.into())
    }

    /// Create a write session carrying the text to write.
    pub fn write(id: SessionId, text: impl Into<String>, status: impl Into<String>) -> Self {
        Self::new(id, SessionMode::Write, Some(text.into()), status.into())
    }

    fn new(id: SessionId, mode: SessionMode, pending_outgoing_text: Option<String>, status: String) -> Self {
        Self {
            id,
            mode,
            phase: Phase::Activating,
            status,
            pending_outgoing_text,
        }
    }

    /// Move to `phase`.
    pub fn advance(&mut self, phase: Phase) {
        tracing::debug!(
            session_id = %self.id,
            from = ?self.phase,
            to = ?phase,
            "Session phase advanced"
        );
        self.phase = phase;
    }
}
