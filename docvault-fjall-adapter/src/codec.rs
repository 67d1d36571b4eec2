use docvault::document::StoreRecord;
use docvault::errors::{DocvaultError, ErrorKind};
use thiserror::Error;

/// Error type for record serialization/deserialization operations.
///
/// Provides granular error information for record codec failures in the Fjall
/// adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FjallCodecError {
    /// Deserialization of binary data failed
    #[error("Deserialization failed: {0}")]
    DeserializationError(String),
    /// Serialization of a record failed
    #[error("Serialization failed: {0}")]
    SerializationError(String),
    /// Invalid UTF-8 encountered in a stored key
    #[error("Invalid UTF-8 in stored key: {0}")]
    InvalidUtf8(String),
}

impl From<FjallCodecError> for DocvaultError {
    /// Converts a `FjallCodecError` to a `DocvaultError` with EncodingError
    /// kind.
    fn from(err: FjallCodecError) -> Self {
        DocvaultError::new(&err.to_string(), ErrorKind::EncodingError)
    }
}

/// Result type for record codec operations.
pub type FjallCodecResult<T> = Result<T, FjallCodecError>;

/// Serializes a store record for persistence in a Fjall partition.
///
/// Records carry schema-free JSON payloads, so the value encoding is JSON as
/// well; a positional binary format cannot round-trip arbitrary payload
/// shapes.
#[inline]
pub fn encode_record(record: &StoreRecord) -> FjallCodecResult<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| FjallCodecError::SerializationError(e.to_string()))
}

/// Restores a store record from its persisted bytes.
#[inline]
pub fn decode_record(bytes: &[u8]) -> FjallCodecResult<StoreRecord> {
    serde_json::from_slice(bytes)
        .map_err(|e| FjallCodecError::DeserializationError(e.to_string()))
}

/// Recovers a UTF-8 record id from a partition key.
#[inline]
pub fn decode_key(bytes: &[u8]) -> FjallCodecResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| FjallCodecError::InvalidUtf8(e.to_string()))
}

/// Converts a Fjall engine error into a store error.
pub fn to_docvault_error(err: fjall::Error) -> DocvaultError {
    DocvaultError::new(&err.to_string(), ErrorKind::StorageError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault::document::{Document, Payload, Revision, StoreValue};

    fn record(id: &str) -> StoreRecord {
        let mut payload = Payload::new();
        payload.insert("k".to_string(), serde_json::json!("v"));
        StoreRecord::new(
            id,
            Revision::initial(),
            StoreValue::Document(Document::new(id, "users", payload)),
        )
    }

    #[test]
    fn encode_decode_round_trip() {
        let original = record("d1");
        let bytes = encode_record(&original).unwrap();
        let decoded = decode_record(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_rejects_corrupted_bytes() {
        let mut bytes = encode_record(&record("d1")).unwrap();
        bytes.truncate(bytes.len() / 2);
        let result = decode_record(&bytes);
        assert!(matches!(
            result,
            Err(FjallCodecError::DeserializationError(_))
        ));
    }

    #[test]
    fn decode_key_rejects_invalid_utf8() {
        let result = decode_key(&[0xff, 0xfe]);
        assert!(matches!(result, Err(FjallCodecError::InvalidUtf8(_))));
    }

    #[test]
    fn codec_error_converts_to_encoding_error() {
        let err: DocvaultError =
            FjallCodecError::SerializationError("boom".to_string()).into();
        assert_eq!(err.kind(), &ErrorKind::EncodingError);
        assert!(err.message().contains("boom"));
    }
}
