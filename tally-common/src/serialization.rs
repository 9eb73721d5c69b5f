// Standard serialization patterns for Tally
// This module provides standardized encoding/decoding for persisted data

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Bincode error: {0}")]
    Bincode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SerializationError> for crate::error::TokenError {
    fn from(err: SerializationError) -> Self {
        crate::error::TokenError::serialization(err.to_string())
    }
}

/// Standard encoding types used throughout Tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingType {
    /// High-performance binary encoding for state persistence
    Bincode,
    /// Human-readable format for configuration and RPC
    Json,
}

/// Trait for standardized serialization across persisted Tally types
pub trait TokenSerialize: Serialize + DeserializeOwned {
    /// Get the preferred encoding type for this data structure
    fn preferred_encoding() -> EncodingType;

    /// Serialize using the preferred encoding
    fn encode(&self) -> Result<Vec<u8>, SerializationError> {
        self.encode_as(Self::preferred_encoding())
    }

    /// Serialize using a specific encoding
    fn encode_as(&self, encoding: EncodingType) -> Result<Vec<u8>, SerializationError> {
        match encoding {
            EncodingType::Bincode => {
                bincode::serialize(self).map_err(|e| SerializationError::Bincode(e.to_string()))
            }
            EncodingType::Json => serde_json::to_vec(self).map_err(SerializationError::Json),
        }
    }

    /// Deserialize from bytes using the preferred encoding
    fn decode(bytes: &[u8]) -> Result<Self, SerializationError> {
        Self::decode_as(bytes, Self::preferred_encoding())
    }

    /// Deserialize using a specific encoding
    fn decode_as(bytes: &[u8], encoding: EncodingType) -> Result<Self, SerializationError> {
        match encoding {
            EncodingType::Bincode => {
                bincode::deserialize(bytes).map_err(|e| SerializationError::Bincode(e.to_string()))
            }
            EncodingType::Json => serde_json::from_slice(bytes).map_err(SerializationError::Json),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u64,
        tag: String,
    }

    impl TokenSerialize for Sample {
        fn preferred_encoding() -> EncodingType {
            EncodingType::Bincode
        }
    }

    #[test]
    fn bincode_roundtrip() {
        let sample = Sample { id: 7, tag: "seven".to_string() };
        let encoded = sample.encode().unwrap();
        let decoded = Sample::decode(&encoded).unwrap();
        assert_eq!(sample, decoded);
    }

    #[test]
    fn json_roundtrip() {
        let sample = Sample { id: 9, tag: "nine".to_string() };
        let encoded = sample.encode_as(EncodingType::Json).unwrap();
        let decoded = Sample::decode_as(&encoded, EncodingType::Json).unwrap();
        assert_eq!(sample, decoded);
    }
}
