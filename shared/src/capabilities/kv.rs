use serde::{Deserialize, Serialize};
use thiserror::Error;

use crux_kv::KeyValue;

use crate::event::Event;

pub type KvCapability = KeyValue<Event>;

pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    namespace: KeyNamespace,
    key: String,
}

impl KvKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    pub fn namespace(&self) -> KeyNamespace {
        self.namespace
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn validate_key(key: &str) -> Result<(), KvError> {
        if key.trim().is_empty() {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot be empty".to_string(),
            });
        }

        if key.len() > MAX_KEY_LENGTH {
            return Err(KvError::InvalidKey {
                key: key.chars().take(50).collect::<String>() + "...",
                reason: format!("key exceeds maximum length of {} bytes", MAX_KEY_LENGTH),
            });
        }

        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot contain path separators or traversal sequences".to_string(),
            });
        }

        if key.chars().any(|c| c.is_control()) {
            return Err(KvError::InvalidKey {
                key: key.escape_default().to_string(),
                reason: "key contains control characters".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    Session,
    Settings,
}

impl KeyNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            KeyNamespace::Session => "session",
            KeyNamespace::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvOperation {
    Get { key: KvKey },
    Set { key: KvKey, value: Vec<u8> },
    Delete { key: KvKey },
}

impl KvOperation {
    pub fn get(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, KvError> {
        Ok(Self::Get {
            key: KvKey::new(namespace, key)?,
        })
    }

    pub fn set(
        namespace: KeyNamespace,
        key: impl Into<String>,
        value: Vec<u8>,
    ) -> Result<Self, KvError> {
        if value.len() > MAX_VALUE_SIZE {
            return Err(KvError::ValueTooLarge {
                size: value.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        Ok(Self::Set {
            key: KvKey::new(namespace, key)?,
            value,
        })
    }

    pub fn delete(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, KvError> {
        Ok(Self::Delete {
            key: KvKey::new(namespace, key)?,
        })
    }

    pub fn key(&self) -> &KvKey {
        match self {
            KvOperation::Get { key } | KvOperation::Set { key, .. } | KvOperation::Delete { key } => {
                key
            }
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("stored value is not valid UTF-8")]
    NotUtf8,

    #[error("unexpected storage output for {operation}")]
    UnexpectedOutput { operation: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvOutput {
    Value(Option<Vec<u8>>),
    Written,
    Deleted,
}

impl KvOutput {
    /// Reads a `Get` answer as text; `Ok(None)` when the key was absent.
    pub fn into_text(self) -> Result<Option<String>, KvError> {
        match self {
            KvOutput::Value(Some(bytes)) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| KvError::NotUtf8),
            KvOutput::Value(None) => Ok(None),
            _ => Err(KvError::UnexpectedOutput {
                operation: "get".to_string(),
            }),
        }
    }
}

pub type KvResult = Result<KvOutput, KvError>;

impl KvOperation {
    /// Runs the operation against the shell's store under the namespaced
    /// key. Storage failures arrive as [`KvError::Storage`].
    pub fn run<F>(self, kv: &KvCapability, make_event: F)
    where
        F: FnOnce(KvResult) -> Event + Send + Sync + 'static,
    {
        match self {
            KvOperation::Get { key } => kv.get(key.raw(), move |result| {
                make_event(result.map(KvOutput::Value).map_err(KvError::storage))
            }),
            KvOperation::Set { key, value } => kv.set(key.raw(), value, move |result| {
                make_event(result.map(|_| KvOutput::Written).map_err(KvError::storage))
            }),
            KvOperation::Delete { key } => kv.delete(key.raw(), move |result| {
                make_event(result.map(|_| KvOutput::Deleted).map_err(KvError::storage))
            }),
        }
    }
}

impl KvError {
    fn storage(error: impl std::fmt::Display) -> Self {
        KvError::Storage {
            message: error.to_string(),
        }
    }
}
