//! Status text shown to the user.

/// Before any session has been started.
pub const INITIAL: &str = "Tap 'Start Scan' to read an NFC tag.";

pub const READY_TO_SCAN: &str = "NFC reader is active. Ready to scan!";

pub const READY_TO_WRITE: &str = "NFC reader is active. Ready to write!";

pub const SCAN_COMPLETE: &str = "Scan complete. Hold near another tag to continue scanning.";

pub const WRITE_SUCCESSFUL: &str = "Write successful.";

/// Sheet alert set just before a successful write session closes.
pub const WRITE_ALERT: &str = "Successfully wrote to the tag!";

/// Start request refused because a session is still live.
pub const SESSION_BUSY: &str = "A session is already in progress.";

/// Reason handed to the transport when a newer start request replaces a session.
pub const SUPERSEDED: &str = "Superseded by a new session.";

/// The caller closed the session.
pub const SESSION_CLOSED: &str = "Session closed.";

/// Status after a session ends with `reason`.
pub fn session_ended(reason: &str) -> String {
    format!("Session ended: {}", reason)
}
