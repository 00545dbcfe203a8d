//! Transport Collaborator
//!
//! The radio driver that finds tags and moves bytes. The session core only
//! talks to it through [`Transport`] and hears back through
//! [`TransportEvent`]s delivered on a channel.
//!
//! Every call and event names the [`SessionId`] it belongs to, so the core can
//! drop anything addressed to a session that is already gone.

mod sim;

pub use sim::{SimCall, SimTag, SimTransport};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capability::Capability;
use crate::error::TransportError;
use crate::record::RecordSet;
use crate::session::{SessionId, SessionMode};

/// Opaque reference to a discovered tag. Only meaningful inside the session
/// that detected it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagHandle(pub String);

impl TagHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for TagHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TagHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TagHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters for starting a platform session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginSession {
    pub mode: SessionMode,
    /// End the platform session after the first tag. True for writes, which
    /// are one-shot; reads stay open for repeated taps.
    pub invalidate_after_first_read: bool,
    /// Text shown on the platform's scanning sheet.
    pub alert_message: String,
}

/// Asynchronous notifications from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The platform session is up and scanning.
    SessionActive { session: SessionId },
    /// One or more tags came into range.
    TagsDetected {
        session: SessionId,
        tags: Vec<TagHandle>,
    },
    /// The platform ended the session (timeout, user cancel, radio error).
    Invalidated { session: SessionId, reason: String },
}

impl TransportEvent {
    /// The session this event is addressed to.
    pub fn session(&self) -> SessionId {
        match self {
            TransportEvent::SessionActive { session }
            | TransportEvent::TagsDetected { session, .. }
            | TransportEvent::Invalidated { session, .. } => *session,
        }
    }
}

/// Transport trait for the radio driver.
///
/// Timeouts belong to the implementation; the session core imposes none.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Whether the device can read tags at all.
    fn is_available(&self) -> bool;

    /// Start a platform session. `SessionActive` follows asynchronously.
    async fn begin_session(&self, session: SessionId, request: BeginSession) -> Result<(), TransportError>;

    async fn connect(&self, session: SessionId, tag: &TagHandle) -> Result<(), TransportError>;

    async fn query_capability(&self, session: SessionId, tag: &TagHandle) -> Result<Capability, TransportError>;

    /// Read the tag's records. `Ok(None)` means the tag holds no message.
    async fn read_records(&self, session: SessionId, tag: &TagHandle) -> Result<Option<RecordSet>, TransportError>;

    async fn write_records(&self, session: SessionId, tag: &TagHandle, records: RecordSet) -> Result<(), TransportError>;

    /// Update the text on the platform's scanning sheet.
    async fn set_alert(&self, _session: SessionId, _message: &str) {}

    /// End the platform session, with an error reason or cleanly.
    async fn invalidate(&self, session: SessionId, reason: Option<String>);
}
