/*!
 * Binary Serialization with bincode
 * Compact encoding for persisted queue records
 */

use serde::{de::DeserializeOwned, Serialize};

/// Result type for bincode operations
pub type BincodeResult<T> = Result<T, BincodeError>;

/// Binary serialization errors
#[derive(Debug, thiserror::Error)]
pub enum BincodeError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Serialize to binary bytes using bincode
#[inline]
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> BincodeResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| BincodeError::Serialization(e.to_string()))
}

/// Deserialize from binary bytes produced by [`to_vec`]
#[inline]
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> BincodeResult<T> {
    bincode::deserialize(bytes).map_err(|e| BincodeError::Deserialization(e.to_string()))
}
