//! ntags - NFC tag sessions
//!
//! Discover a tag, read its text records, or append a new text record while
//! keeping the ones already there.
//!
//! The radio itself is a [`Transport`] collaborator. [`TagReader`] runs one
//! session at a time against it and publishes progress as a [`SessionView`].
//!
//! ```text
//! caller --start_scanning/start_writing--> TagReader --begin/connect/read/write--> Transport
//!   ^                                          |                                     |
//!   +---------- watch<SessionView> ------------+<--------- TransportEvent -----------+
//! ```

pub mod capability;
pub mod codec;
pub mod error;
pub mod facade;
pub mod record;
pub mod session;
pub mod status;
pub mod transport;
pub mod view;

pub use capability::{Capability, Outcome};
pub use error::{SessionError, TransportError};
pub use facade::TagReader;
pub use record::{RawRecord, RecordSet, ScanResult, TypeNameFormat};
pub use session::{Phase, Session, SessionId, SessionMode, Termination};
pub use transport::{
    BeginSession, SimCall, SimTag, SimTransport, TagHandle, Transport, TransportEvent,
};
pub use view::SessionView;
