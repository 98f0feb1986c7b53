//! Opaque wire codec for record payloads
//!
//! The pipeline treats serialization as an external concern behind the
//! `RecordCodec` trait; bincode is the default, JSON is available for
//! channels read by humans or non-Rust consumers.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ProcessorError, Result};

/// Codec for encoding and decoding record payloads
pub trait RecordCodec: Send + Sync {
    /// Encode a value to bytes
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a value from bytes
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Codec name for logging
    fn name(&self) -> &str;
}

/// Bincode codec (compact binary, default)
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl RecordCodec for BincodeCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(ProcessorError::from)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(ProcessorError::from)
    }

    fn name(&self) -> &str {
        "bincode"
    }
}

/// JSON codec (human-readable)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(ProcessorError::from)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(ProcessorError::from)
    }

    fn name(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bincode_round_trip() {
        let codec = BincodeCodec;
        let encoded = codec.encode(&("key".to_string(), 42i64)).unwrap();
        let decoded: (String, i64) = codec.decode(&encoded).unwrap();
        assert_eq!(decoded, ("key".to_string(), 42));
    }

    #[test]
    fn test_json_round_trip() {
        let codec = JsonCodec;
        let encoded = codec.encode(&vec![1u32, 2, 3]).unwrap();
        let decoded: Vec<u32> = codec.decode(&encoded).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = JsonCodec;
        let result: Result<Vec<u32>> = codec.decode(b"not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(BincodeCodec.name(), "bincode");
        assert_eq!(JsonCodec.name(), "json");
    }
}
