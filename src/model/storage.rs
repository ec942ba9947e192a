use std::io::Read;
use std::time::SystemTime;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation failure: {0}")]
    Validation(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bucket {
    pub name: String,
    pub created: Option<SystemTime>,
}

/// Listing record: key, size, last-modified. Distinct from a fetched object.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub modified_time: SystemTime,
}

/// A fully fetched object: summary plus a readable handle over its content.
pub struct StoredObject {
    pub summary: ObjectSummary,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("summary", &self.summary)
            .field("body", &"<dyn Read>")
            .finish()
    }
}
