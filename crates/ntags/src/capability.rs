//! Tag capability resolution.
//!
//! Writes only proceed against read/write tags. Every other answer, including
//! a failed query, rejects with its own reason so no tag state can leave a
//! session waiting.

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, TransportError};

/// What a tag reports it can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Unsupported,
    ReadOnly,
    ReadWrite,
    Unknown,
}

impl Capability {
    /// Parse a config-style name (`read_write`, `read_only`, `unsupported`).
    /// Unrecognised names are `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "read_write" => Capability::ReadWrite,
            "read_only" => Capability::ReadOnly,
            "unsupported" | "not_supported" => Capability::Unsupported,
            _ => Capability::Unknown,
        }
    }
}

/// Decision for a write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The tag is read/write.
    Proceed,
    /// The session must end with this reason.
    Reject(SessionError),
}

/// Resolve a capability query into a write decision.
pub fn resolve(query: Result<Capability, TransportError>) -> Outcome {
    match query {
        Ok(Capability::ReadWrite) => Outcome::Proceed,
        Ok(Capability::ReadOnly) => Outcome::Reject(SessionError::TagReadOnly),
        Ok(Capability::Unsupported) => Outcome::Reject(SessionError::TagUnsupported),
        Ok(Capability::Unknown) => Outcome::Reject(SessionError::TagCapabilityUnknown),
        Err(e) => Outcome::Reject(SessionError::CapabilityQueryFailed(e)),
    }
}
