use crux_kv::error::KeyValueError;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use thiserror::Error;

pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Durable slot holding the signed-in resident's profile.
pub const SESSION_KEY: &str = "userData";

/// A key known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageKey(&'static str);

impl StorageKey {
    #[must_use]
    pub const fn fixed(key: &'static str) -> Self {
        Self(key)
    }

    #[must_use]
    pub fn to_key(self) -> String {
        self.0.to_string()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvError {
    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

/// Result type carried back to the core by storage events.
pub type StorageResult<T> = Result<T, String>;

#[must_use]
pub fn read_result(result: Result<Option<Vec<u8>>, KeyValueError>) -> StorageResult<Option<Vec<u8>>> {
    result.map_err(|e| e.to_string())
}

#[must_use]
pub fn write_result(result: Result<Option<Vec<u8>>, KeyValueError>) -> StorageResult<()> {
    result.map(|_previous| ()).map_err(|e| e.to_string())
}

/// A single JSON-encoded value under a fixed key.
pub struct TypedSlot<T> {
    key: StorageKey,
    _phantom: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> TypedSlot<T> {
    #[must_use]
    pub const fn new(key: StorageKey) -> Self {
        Self {
            key,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn key(&self) -> String {
        self.key.to_key()
    }

    pub fn encode(&self, value: &T) -> Result<Vec<u8>, KvError> {
        let data = serde_json::to_vec(value).map_err(|e| KvError::Serialization {
            message: e.to_string(),
        })?;
        if data.len() > MAX_VALUE_SIZE {
            return Err(KvError::ValueTooLarge {
                size: data.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        Ok(data)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<T, KvError> {
        serde_json::from_slice(bytes).map_err(|e| KvError::Serialization {
            message: e.to_string(),
        })
    }
}
