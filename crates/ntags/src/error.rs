//! Session error taxonomy.
//!
//! The `Display` text of each variant is the reason string shown to the user
//! and passed to the transport when the session is invalidated.

use thiserror::Error;

/// Failure reported by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Everything that can go wrong during a tag session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("NFC is not supported on this device.")]
    TransportUnavailable,

    #[error("Session could not begin: {0}")]
    BeginFailed(TransportError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(TransportError),

    #[error("Failed to query tag status: {0}")]
    CapabilityQueryFailed(TransportError),

    #[error("Tag is read-only.")]
    TagReadOnly,

    #[error("Tag is not NDEF compatible.")]
    TagUnsupported,

    #[error("Unknown tag status.")]
    TagCapabilityUnknown,

    #[error("Failed to read tag: {0}")]
    ReadFailed(TransportError),

    #[error("Failed to read existing records: {0}")]
    ReadExistingFailed(TransportError),

    #[error("Failed to write: {0}")]
    WriteFailed(TransportError),

    #[error("No message to write.")]
    NothingToWrite,

    /// A record that is not valid UTF-8 was left out of a scan result.
    #[error("Record {index} is not valid UTF-8 text")]
    DecodeSkipped { index: usize },
}

impl SessionError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::DecodeSkipped { .. })
    }
}
