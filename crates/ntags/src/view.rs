//! Observable session state.

use serde::{Deserialize, Serialize};

use crate::record::ScanResult;
use crate::session::{Phase, SessionId};
use crate::status;

/// Everything a presentation layer renders. Published as one value so status
/// and results always change together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    /// Latest human-readable progress or failure text.
    pub status: String,

    /// Texts decoded by the most recent successful read.
    pub results: ScanResult,

    /// Phase of the live session, or how the last one ended.
    pub phase: Phase,

    /// The live session, if any.
    pub session: Option<SessionId>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            status: status::INITIAL.to_string(),
            results: Vec::new(),
            phase: Phase::Idle,
            session: None,
        }
    }
}
