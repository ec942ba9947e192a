use crate::model::storage::StorageError;

// S3 object key limit.
const MAX_KEY_BYTES: usize = 1024;

/// Validate an object key before any request is built from it.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::Validation("empty object key".to_string()));
    }

    if key.starts_with('/') {
        return Err(StorageError::Validation(format!(
            "object key must not start with '/': {}",
            key
        )));
    }

    if key.len() > MAX_KEY_BYTES {
        return Err(StorageError::Validation(format!(
            "object key exceeds {} bytes: {} bytes",
            MAX_KEY_BYTES,
            key.len()
        )));
    }

    Ok(())
}

/// Prefixes may be empty (bucket-wide listing) but obey the same limits.
pub fn validate_prefix(prefix: &str) -> Result<(), StorageError> {
    if prefix.is_empty() {
        return Ok(());
    }

    if prefix.len() > MAX_KEY_BYTES {
        return Err(StorageError::Validation(format!(
            "prefix exceeds {} bytes: {} bytes",
            MAX_KEY_BYTES,
            prefix.len()
        )));
    }

    Ok(())
}

/// Accepts a bare bucket name or an `s3://name` URI.
pub fn parse_bucket_from_uri(bucket_uri: &str) -> &str {
    bucket_uri
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(bucket_uri)
}
