use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};

use crate::{adapters, model};

struct MockObject {
    body: Vec<u8>,
    modified_time: SystemTime,
    public: bool,
}

struct MockBucket {
    created: SystemTime,
    // BTreeMap so listings come back in key order, as the provider returns them.
    objects: BTreeMap<String, MockObject>,
}

/// In-memory provider used as the injected client in tests. Clones share
/// the same underlying store, so several managers can observe one another.
#[derive(Clone, Default)]
pub struct MockClient {
    buckets: Arc<Mutex<HashMap<String, MockBucket>>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(name: &str) -> Self {
        let client = Self::new();
        client
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard")
            .insert(
                name.to_string(),
                MockBucket {
                    created: SystemTime::now(),
                    objects: BTreeMap::new(),
                },
            );

        client
    }
}

impl adapters::ObjectStore for MockClient {
    fn create_bucket(
        &self,
        bucket: &str,
    ) -> Result<model::storage::Bucket, model::storage::StorageError> {
        let mut buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let entry = buckets.entry(bucket.to_string()).or_insert(MockBucket {
            created: SystemTime::now(),
            objects: BTreeMap::new(),
        });

        Ok(model::storage::Bucket {
            name: bucket.to_string(),
            created: Some(entry.created),
        })
    }

    fn delete_bucket(&self, bucket: &str) -> Result<bool, model::storage::StorageError> {
        let mut buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        match buckets.get(bucket) {
            None => Ok(false),
            Some(b) if !b.objects.is_empty() => Err(model::storage::StorageError::Conflict(
                format!("bucket not empty: {}", bucket),
            )),
            Some(_) => {
                buckets.remove(bucket);
                Ok(true)
            }
        }
    }

    fn list_buckets(&self) -> Result<Vec<model::storage::Bucket>, model::storage::StorageError> {
        let buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let mut out: Vec<model::storage::Bucket> = buckets
            .iter()
            .map(|(name, b)| model::storage::Bucket {
                name: name.clone(),
                created: Some(b.created),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(out)
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), model::storage::StorageError> {
        let mut buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("bucket: {}", bucket)))?;

        // Overwrite replaces content and resets the access policy to private.
        b.objects.insert(
            key.to_string(),
            MockObject {
                body,
                modified_time: SystemTime::now(),
                public: false,
            },
        );

        Ok(())
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::storage::StorageError> {
        let buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let b = buckets
            .get(bucket)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("bucket: {}", bucket)))?;

        Ok(b.objects.get(key).map(|o| o.body.clone()))
    }

    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::storage::ObjectSummary>, model::storage::StorageError> {
        let buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let b = buckets
            .get(bucket)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("bucket: {}", bucket)))?;

        Ok(b.objects.get(key).map(|o| model::storage::ObjectSummary {
            key: key.to_string(),
            size: o.body.len() as i64,
            modified_time: o.modified_time,
        }))
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<model::storage::ObjectSummary>, model::storage::StorageError> {
        let buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let b = buckets
            .get(bucket)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("bucket: {}", bucket)))?;

        Ok(b.objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| model::storage::ObjectSummary {
                key: key.clone(),
                size: o.body.len() as i64,
                modified_time: o.modified_time,
            })
            .collect())
    }

    fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(), model::storage::StorageError> {
        let mut buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("bucket: {}", bucket)))?;

        // Deleting an absent key succeeds, as the provider's delete does.
        b.objects.remove(key);

        Ok(())
    }

    fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<(), model::storage::StorageError> {
        let mut buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("bucket: {}", bucket)))?;

        for key in keys {
            b.objects.remove(key);
        }

        Ok(())
    }

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), model::storage::StorageError> {
        let mut buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let body = buckets
            .get(src_bucket)
            .ok_or_else(|| {
                model::storage::StorageError::NotFound(format!("bucket: {}", src_bucket))
            })?
            .objects
            .get(src_key)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("key: {}", src_key)))?
            .body
            .clone();

        let dst = buckets.get_mut(dst_bucket).ok_or_else(|| {
            model::storage::StorageError::NotFound(format!("bucket: {}", dst_bucket))
        })?;

        // The copy starts private regardless of the source policy.
        dst.objects.insert(
            dst_key.to_string(),
            MockObject {
                body,
                modified_time: SystemTime::now(),
                public: false,
            },
        );

        Ok(())
    }

    fn make_object_public(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(), model::storage::StorageError> {
        let mut buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("bucket: {}", bucket)))?;

        let o = b
            .objects
            .get_mut(key)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("key: {}", key)))?;
        o.public = true;

        Ok(())
    }

    fn is_object_public(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<bool, model::storage::StorageError> {
        let buckets = self
            .buckets
            .lock()
            .expect("failed to acquire `buckets` guard");

        let b = buckets
            .get(bucket)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("bucket: {}", bucket)))?;

        let o = b
            .objects
            .get(key)
            .ok_or_else(|| model::storage::StorageError::NotFound(format!("key: {}", key)))?;

        Ok(o.public)
    }

    fn object_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, model::storage::StorageError> {
        Ok(format!(
            "https://{}.mock.local/{}?expires={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ObjectStore;

    #[test]
    fn test_bucket_lifecycle() {
        let client = MockClient::new();

        assert!(client.list_buckets().unwrap().is_empty());

        client.create_bucket("assets").unwrap();
        let buckets = client.list_buckets().unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].name, "assets");

        assert!(client.delete_bucket("assets").unwrap());
        assert!(!client.delete_bucket("assets").unwrap());
    }

    #[test]
    fn test_delete_bucket_not_empty() {
        let client = MockClient::with_bucket("assets");
        client.put_object("assets", "a", vec![1]).unwrap();

        assert!(matches!(
            client.delete_bucket("assets"),
            Err(model::storage::StorageError::Conflict(_))
        ));
    }

    #[test]
    fn test_list_objects_key_order() {
        let client = MockClient::with_bucket("assets");
        for key in ["c", "a", "b"] {
            client.put_object("assets", key, vec![0]).unwrap();
        }

        let keys: Vec<String> = client
            .list_objects("assets", "")
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();

        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_bucket_is_not_found() {
        let client = MockClient::new();

        let err = client.get_object("ghost", "k").unwrap_err();
        assert!(err.is_not_found());
    }
}
