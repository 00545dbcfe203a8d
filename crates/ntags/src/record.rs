//! Raw NDEF record model.
//!
//! These are the shapes the transport hands us. Only well-known text records
//! are produced here; anything else a tag carries passes through untouched.

use serde::{Deserialize, Serialize};

/// Record type for well-known text records.
pub const TEXT_RECORD_TYPE: &[u8] = b"T";

/// NDEF type name format (the TNF field of a record header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNameFormat {
    Empty,
    WellKnown,
    Media,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
}

/// One record as stored on a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub format: TypeNameFormat,
    pub record_type: Vec<u8>,
    pub identifier: Vec<u8>,
    pub payload: Vec<u8>,
}

impl RawRecord {
    /// Create a record with an empty identifier.
    pub fn new(format: TypeNameFormat, record_type: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            record_type: record_type.into(),
            identifier: Vec::new(),
            payload: payload.into(),
        }
    }
}

/// Ordered records read from, or destined for, a tag.
pub type RecordSet = Vec<RawRecord>;

/// Decoded text surfaced to callers after a read, one entry per readable record.
pub type ScanResult = Vec<String>;

/// Append `record` after every existing record, leaving the existing ones as
/// they were.
pub fn append_record(mut existing: RecordSet, record: RawRecord) -> RecordSet {
    existing.push(record);
    existing
}
