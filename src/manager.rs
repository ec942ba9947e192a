use std::{
    fs::File,
    io::{Cursor, Read},
    path::Path,
    time::Duration,
};

use tracing::{debug, info};

use crate::{adapters, model, util};

const DEFAULT_URL_TTL: Duration = Duration::from_secs(900);

/// Capability set for bucket and object operations against one configured
/// bucket. Holds no state beyond immutable configuration; every call is a
/// blocking request against the provider client.
pub struct StorageManager {
    client: Box<dyn adapters::ObjectStore>,
    bucket: String,
    root: bool,
    url_ttl: Duration,
}

impl StorageManager {
    pub fn new(client: Box<dyn adapters::ObjectStore>, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            root: false,
            url_ttl: DEFAULT_URL_TTL,
        }
    }

    /// Scope the manager to the designated root bucket.
    pub fn new_root(client: Box<dyn adapters::ObjectStore>, bucket: &str) -> Self {
        Self {
            root: true,
            ..Self::new(client, bucket)
        }
    }

    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn is_root_bucket(&self) -> bool {
        self.root
    }

    pub fn create_bucket(&self) -> Result<model::storage::Bucket, model::storage::StorageError> {
        info!(bucket = %self.bucket, "create bucket");

        self.client.create_bucket(&self.bucket)
    }

    /// Returns whether the bucket was deleted; `Ok(false)` when it does not
    /// exist.
    pub fn delete_bucket(&self) -> Result<bool, model::storage::StorageError> {
        info!(bucket = %self.bucket, "delete bucket");

        self.client.delete_bucket(&self.bucket)
    }

    pub fn find_buckets(
        &self,
    ) -> Result<Vec<model::storage::Bucket>, model::storage::StorageError> {
        self.client.list_buckets()
    }

    /// Store the reader's content under `key`, overwriting any existing
    /// object at that key.
    pub fn upload_entity(
        &self,
        key: &str,
        reader: &mut dyn Read,
    ) -> Result<(), model::storage::StorageError> {
        util::key::validate_key(key)?;

        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;

        info!(bucket = %self.bucket, key = key, size = body.len(), "upload entity");

        self.client.put_object(&self.bucket, key, body)
    }

    pub fn upload_entity_from_file(
        &self,
        key: &str,
        path: &Path,
    ) -> Result<(), model::storage::StorageError> {
        let mut file = File::open(path)?;

        self.upload_entity(key, &mut file)
    }

    /// Fails with not-found when the key is absent; the provider's raw
    /// delete is idempotent, so existence is checked first.
    pub fn delete_entity(&self, key: &str) -> Result<(), model::storage::StorageError> {
        util::key::validate_key(key)?;

        if self.client.head_object(&self.bucket, key)?.is_none() {
            return Err(model::storage::StorageError::NotFound(format!(
                "key: {}",
                key
            )));
        }

        info!(bucket = %self.bucket, key = key, "delete entity");

        self.client.delete_object(&self.bucket, key)
    }

    /// Bulk delete of every object in the bucket.
    pub fn delete_entities(&self) -> Result<(), model::storage::StorageError> {
        let keys: Vec<String> = self
            .client
            .list_objects(&self.bucket, "")?
            .into_iter()
            .map(|o| o.key)
            .collect();

        if keys.is_empty() {
            return Ok(());
        }

        info!(bucket = %self.bucket, count = keys.len(), "delete entities");

        self.client.delete_objects(&self.bucket, &keys)
    }

    /// Set the object's access-control policy to public-read.
    pub fn public_entity(&self, key: &str) -> Result<(), model::storage::StorageError> {
        util::key::validate_key(key)?;

        info!(bucket = %self.bucket, key = key, "make entity public");

        self.client.make_object_public(&self.bucket, key)
    }

    pub fn is_public_entity(&self, key: &str) -> Result<bool, model::storage::StorageError> {
        util::key::validate_key(key)?;

        self.client.is_object_public(&self.bucket, key)
    }

    /// Server-side copy to `target_bucket`/`target_key`.
    pub fn copy_entity(
        &self,
        key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<(), model::storage::StorageError> {
        util::key::validate_key(key)?;
        util::key::validate_key(target_key)?;

        info!(
            bucket = %self.bucket,
            key = key,
            target_bucket = target_bucket,
            target_key = target_key,
            "copy entity"
        );

        self.client
            .copy_object(&self.bucket, key, target_bucket, target_key)
    }

    /// Fetch object content into `destination`; returns `Ok(false)` when the
    /// key is absent.
    pub fn download_entity_to_file(
        &self,
        key: &str,
        destination: &Path,
    ) -> Result<bool, model::storage::StorageError> {
        util::key::validate_key(key)?;

        let body = match self.client.get_object(&self.bucket, key)? {
            None => return Ok(false),
            Some(body) => body,
        };

        debug!(bucket = %self.bucket, key = key, size = body.len(), "download entity to file");
        std::fs::write(destination, body)?;

        Ok(true)
    }

    /// Fetch object content as a readable stream; fails with not-found when
    /// the key is absent.
    pub fn download_entity(
        &self,
        key: &str,
    ) -> Result<Box<dyn Read + Send>, model::storage::StorageError> {
        util::key::validate_key(key)?;

        let body = self
            .client
            .get_object(&self.bucket, key)?
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("key: {}", key)))?;

        debug!(bucket = %self.bucket, key = key, size = body.len(), "download entity");

        Ok(Box::new(Cursor::new(body)))
    }

    /// Resolvable URL for the object: a presigned GET with the configured
    /// lifetime, so it works for public and private objects alike.
    pub fn get_resource_url(&self, key: &str) -> Result<String, model::storage::StorageError> {
        util::key::validate_key(key)?;

        self.client.object_url(&self.bucket, key, self.url_ttl)
    }

    /// Full metadata plus a content handle for a single key.
    pub fn find_entity_by_unique_key(
        &self,
        key: &str,
    ) -> Result<model::storage::StoredObject, model::storage::StorageError> {
        util::key::validate_key(key)?;

        let summary = self
            .client
            .head_object(&self.bucket, key)?
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("key: {}", key)))?;

        let body = self
            .client
            .get_object(&self.bucket, key)?
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("key: {}", key)))?;

        Ok(model::storage::StoredObject {
            summary,
            body: Box::new(Cursor::new(body)),
        })
    }

    pub fn find_entity_by_bucket(
        &self,
    ) -> Result<Vec<model::storage::ObjectSummary>, model::storage::StorageError> {
        self.client.list_objects(&self.bucket, "")
    }

    pub fn find_entity_by_prefix_key(
        &self,
        prefix: &str,
    ) -> Result<Vec<model::storage::ObjectSummary>, model::storage::StorageError> {
        util::key::validate_prefix(prefix)?;

        self.client.list_objects(&self.bucket, prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockClient;
    use crate::model::storage::StorageError;

    fn manager() -> StorageManager {
        StorageManager::new(Box::new(MockClient::with_bucket("assets")), "assets")
    }

    fn read_all(mut reader: Box<dyn Read + Send>) -> Vec<u8> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_is_root_bucket() {
        let scoped = manager();
        assert!(!scoped.is_root_bucket());

        let root = StorageManager::new_root(Box::new(MockClient::new()), "root");
        assert!(root.is_root_bucket());
        assert_eq!(root.bucket(), "root");
    }

    #[test]
    fn test_upload_download_roundtrip() {
        let mgr = manager();

        let cases = vec![
            ("plain.txt", b"hello world".to_vec()),
            ("img/logo.png", vec![0u8, 1, 2, 3]),
            ("empty", Vec::new()),
        ];

        for (key, content) in cases {
            mgr.upload_entity(key, &mut &content[..]).unwrap();

            let result = read_all(mgr.download_entity(key).unwrap());
            assert_eq!(result, content, "failed roundtrip for case: {}", key);
        }
    }

    #[test]
    fn test_upload_overwrites() {
        let mgr = manager();

        mgr.upload_entity("k", &mut &b"first"[..]).unwrap();
        mgr.upload_entity("k", &mut &b"second"[..]).unwrap();

        assert_eq!(read_all(mgr.download_entity("k").unwrap()), b"second");
    }

    #[test]
    fn test_upload_rejects_invalid_keys() {
        let mgr = manager();

        let cases = vec!["", "/leading"];

        for key in cases {
            let result = mgr.upload_entity(key, &mut &b"x"[..]);
            assert!(
                matches!(result, Err(StorageError::Validation(_))),
                "expected validation failure for case: {:?}",
                key
            );
        }
    }

    #[test]
    fn test_delete_entity_then_find_fails() {
        let mgr = manager();

        mgr.upload_entity("doomed", &mut &b"bytes"[..]).unwrap();
        mgr.delete_entity("doomed").unwrap();

        let err = mgr.find_entity_by_unique_key("doomed").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_entity_missing_key_fails() {
        let mgr = manager();

        let err = mgr.delete_entity("ghost").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_public_entity() {
        let mgr = manager();

        mgr.upload_entity("a", &mut &b"x"[..]).unwrap();
        mgr.upload_entity("b", &mut &b"y"[..]).unwrap();

        assert!(!mgr.is_public_entity("a").unwrap());

        mgr.public_entity("a").unwrap();

        assert!(mgr.is_public_entity("a").unwrap());
        assert!(!mgr.is_public_entity("b").unwrap());
    }

    #[test]
    fn test_prefix_listing_is_subset_of_bucket_listing() {
        let mgr = manager();

        for key in ["img/logo.png", "img/icon.png", "docs/readme.md", "top"] {
            mgr.upload_entity(key, &mut &b"x"[..]).unwrap();
        }

        let all = mgr.find_entity_by_bucket().unwrap();
        assert_eq!(all.len(), 4);

        let by_prefix = mgr.find_entity_by_prefix_key("img/").unwrap();
        let expected: Vec<_> = all
            .into_iter()
            .filter(|o| o.key.starts_with("img/"))
            .collect();

        assert_eq!(by_prefix, expected);
    }

    #[test]
    fn test_copy_entity_across_buckets() {
        let client = MockClient::with_bucket("assets");
        let mgr = StorageManager::new(Box::new(client.clone()), "assets");

        let backup = StorageManager::new(Box::new(client), "backup");
        backup.create_bucket().unwrap();

        mgr.upload_entity("img/logo.png", &mut &b"logo-bytes"[..])
            .unwrap();
        mgr.copy_entity("img/logo.png", "backup", "mirror/logo.png")
            .unwrap();

        let copied = backup.find_entity_by_unique_key("mirror/logo.png").unwrap();
        assert_eq!(copied.summary.size, 10);
        assert_eq!(read_all(copied.body), b"logo-bytes");
    }

    #[test]
    fn test_copy_entity_missing_source_fails() {
        let mgr = manager();

        let err = mgr.copy_entity("ghost", "assets", "copy").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_assets_scenario() {
        let mgr = StorageManager::new(Box::new(MockClient::new()), "assets");
        mgr.create_bucket().unwrap();

        let stream: Vec<u8> = (0..10).collect();
        mgr.upload_entity("img/logo.png", &mut &stream[..]).unwrap();

        let summaries = mgr.find_entity_by_bucket().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].key, "img/logo.png");
        assert_eq!(summaries[0].size, 10);

        mgr.delete_entities().unwrap();
        assert!(mgr.find_entity_by_bucket().unwrap().is_empty());
    }

    #[test]
    fn test_delete_entities_on_empty_bucket() {
        let mgr = manager();

        mgr.delete_entities().unwrap();
        assert!(mgr.find_entity_by_bucket().unwrap().is_empty());
    }

    #[test]
    fn test_download_entity_to_file() {
        let mgr = manager();
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.bin");

        assert!(!mgr.download_entity_to_file("missing", &destination).unwrap());
        assert!(!destination.exists());

        mgr.upload_entity("present", &mut &b"file-bytes"[..]).unwrap();

        assert!(mgr.download_entity_to_file("present", &destination).unwrap());
        assert_eq!(std::fs::read(&destination).unwrap(), b"file-bytes");
    }

    #[test]
    fn test_upload_entity_from_file() {
        let mgr = manager();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.bin");
        std::fs::write(&source, b"from-disk").unwrap();

        mgr.upload_entity_from_file("disk/key", &source).unwrap();

        assert_eq!(read_all(mgr.download_entity("disk/key").unwrap()), b"from-disk");
    }

    #[test]
    fn test_upload_entity_from_missing_file_is_io_error() {
        let mgr = manager();
        let dir = tempfile::tempdir().unwrap();

        let result = mgr.upload_entity_from_file("k", &dir.path().join("absent"));
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn test_get_resource_url() {
        let mgr = manager().with_url_ttl(Duration::from_secs(60));

        let url = mgr.get_resource_url("img/logo.png").unwrap();
        assert!(url.contains("assets"), "bucket missing from url: {}", url);
        assert!(url.contains("img/logo.png"), "key missing from url: {}", url);
        assert!(url.contains("expires=60"), "ttl missing from url: {}", url);
    }

    #[test]
    fn test_find_entity_by_unique_key() {
        let mgr = manager();

        mgr.upload_entity("k", &mut &b"content"[..]).unwrap();

        let object = mgr.find_entity_by_unique_key("k").unwrap();
        assert_eq!(object.summary.key, "k");
        assert_eq!(object.summary.size, 7);
        assert_eq!(read_all(object.body), b"content");
    }

    #[test]
    fn test_find_buckets() {
        let client = MockClient::with_bucket("assets");
        let mgr = StorageManager::new(Box::new(client.clone()), "assets");

        StorageManager::new(Box::new(client), "backup")
            .create_bucket()
            .unwrap();

        let names: Vec<String> = mgr
            .find_buckets()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();

        assert_eq!(names, vec!["assets", "backup"]);
    }

    #[test]
    fn test_delete_bucket() {
        let mgr = StorageManager::new(Box::new(MockClient::new()), "assets");

        assert!(!mgr.delete_bucket().unwrap());

        mgr.create_bucket().unwrap();
        assert!(mgr.delete_bucket().unwrap());
    }
}
