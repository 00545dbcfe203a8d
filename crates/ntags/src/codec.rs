//! Text record codec.
//!
//! Converts between strings and well-known text records. The payload is the
//! raw UTF-8 of the text; no status byte or language code is prepended.

use crate::error::SessionError;
use crate::record::{RawRecord, RecordSet, ScanResult, TypeNameFormat, TEXT_RECORD_TYPE};

/// Entry surfaced in place of an empty scan result.
pub const NO_READABLE_DATA: &str = "No readable data found on the tag.";

/// Build a well-known text record carrying `text` as its payload.
pub fn encode(text: &str) -> RawRecord {
    RawRecord::new(TypeNameFormat::WellKnown, TEXT_RECORD_TYPE, text.as_bytes())
}

/// Decode a record payload as UTF-8, or `None` when it is not valid UTF-8.
pub fn decode(raw: &RawRecord) -> Option<String> {
    String::from_utf8(raw.payload.clone()).ok()
}

/// Decode every record in order, skipping undecodable ones.
///
/// An empty outcome yields a single [`NO_READABLE_DATA`] entry rather than an
/// empty list.
pub fn decode_all(records: &RecordSet) -> ScanResult {
    let mut texts = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        match decode(record) {
            Some(text) => texts.push(text),
            None => {
                let skipped = SessionError::DecodeSkipped { index };
                tracing::debug!(error = %skipped, "Skipping record");
            }
        }
    }

    if texts.is_empty() {
        texts.push(NO_READABLE_DATA.to_string());
    }

    texts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_encode_shape() {
        let record = encode("hello");
        assert_eq!(record.format, TypeNameFormat::WellKnown);
        assert_eq!(record.record_type, b"T".to_vec());
        assert!(record.identifier.is_empty());
        assert_eq!(record.payload, b"hello".to_vec());
    }

    #[test]
    fn test_encode_empty_string() {
        let record = encode("");
        assert!(record.payload.is_empty());
        assert_eq!(decode(&record), Some(String::new()));
    }

    #[test]
    fn test_roundtrip_multibyte() {
        for text in ["plain", "ünïcödé", "日本語のタグ", "emoji 🏷️", "line\nbreak"] {
            assert_eq!(decode(&encode(text)), Some(text.to_string()));
        }
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let cases: [&[u8]; 3] = [&[0xFF], &[0xC3, 0x28], &[0x61, 0xE2, 0x82]];
        for bytes in cases {
            let record = RawRecord::new(TypeNameFormat::WellKnown, TEXT_RECORD_TYPE, bytes);
            assert_eq!(decode(&record), None);
        }
    }

    #[test]
    fn test_decode_all_empty_yields_sentinel() {
        assert_eq!(decode_all(&Vec::new()), vec![NO_READABLE_DATA.to_string()]);
    }

    #[test]
    fn test_decode_all_preserves_order() {
        let records = vec![encode("a"), encode("b"), encode("c")];
        assert_eq!(decode_all(&records), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_decode_all_skips_invalid() {
        let bad = RawRecord::new(TypeNameFormat::Media, "application/octet-stream", vec![0xFFu8, 0xFE]);
        let records = vec![encode("first"), bad, encode("last")];
        assert_eq!(decode_all(&records), vec!["first", "last"]);
    }

    #[test]
    fn test_decode_all_only_invalid_yields_sentinel() {
        let bad = RawRecord::new(TypeNameFormat::Unknown, Vec::<u8>::new(), vec![0x80u8]);
        assert_eq!(decode_all(&vec![bad]), vec![NO_READABLE_DATA.to_string()]);
    }

    proptest! {
        #[test]
        fn test_roundtrip_any_string(text in any::<String>()) {
            prop_assert_eq!(decode(&encode(&text)), Some(text));
        }

        #[test]
        fn test_decode_rejects_non_utf8(
            prefix in any::<String>(),
            suffix in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            // 0xFF never appears in well-formed UTF-8.
            let mut payload = prefix.into_bytes();
            payload.push(0xFF);
            payload.extend(suffix);
            let record = RawRecord::new(TypeNameFormat::WellKnown, TEXT_RECORD_TYPE, payload);
            prop_assert_eq!(decode(&record), None);
        }

        #[test]
        fn test_decode_all_keeps_every_text_in_order(
            texts in proptest::collection::vec(any::<String>(), 1..16),
        ) {
            let records: RecordSet = texts.iter().map(|t| encode(t)).collect();
            prop_assert_eq!(decode_all(&records), texts);
        }
    }
}
