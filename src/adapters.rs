use std::time::Duration;

use crate::model;

pub mod mock;
pub mod s3;

/// Provider seam: one synchronous method per storage primitive. Every call
/// is stateless request/response against the remote provider; the manager
/// holds an implementation behind `Box<dyn ObjectStore>`.
pub trait ObjectStore {
    fn create_bucket(
        &self,
        bucket: &str,
    ) -> Result<model::storage::Bucket, model::storage::StorageError>;

    /// Returns whether the bucket was deleted; `Ok(false)` when it does not
    /// exist. A non-empty bucket is a conflict error.
    fn delete_bucket(&self, bucket: &str) -> Result<bool, model::storage::StorageError>;

    fn list_buckets(&self) -> Result<Vec<model::storage::Bucket>, model::storage::StorageError>;

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), model::storage::StorageError>;

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::storage::StorageError>;

    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::storage::ObjectSummary>, model::storage::StorageError>;

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<model::storage::ObjectSummary>, model::storage::StorageError>;

    fn delete_object(&self, bucket: &str, key: &str)
        -> Result<(), model::storage::StorageError>;

    fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<(), model::storage::StorageError>;

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), model::storage::StorageError>;

    fn make_object_public(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(), model::storage::StorageError>;

    fn is_object_public(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<bool, model::storage::StorageError>;

    fn object_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, model::storage::StorageError>;
}
