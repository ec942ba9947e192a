use std::time::{Duration, SystemTime};

use aws_sdk_s3::{
    error::{ProvideErrorMetadata, SdkError},
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{Delete, ObjectCannedAcl, ObjectIdentifier, Permission},
};

use crate::{adapters, model, util};

const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

// DeleteObjects caps a single request at 1000 keys.
const DELETE_BATCH: usize = 1000;

/// Map a provider error onto the taxonomy by service error code.
fn classify<E>(what: &str, err: SdkError<E>) -> model::storage::StorageError
where
    E: ProvideErrorMetadata,
{
    let code = err.code().unwrap_or("").to_string();
    let detail = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());

    match code.as_str() {
        "NoSuchKey" | "NoSuchBucket" | "NotFound" => {
            model::storage::StorageError::NotFound(format!("{}: {}", what, detail))
        }
        "AccessDenied" | "AllAccessDisabled" => {
            model::storage::StorageError::AccessDenied(format!("{}: {}", what, detail))
        }
        "BucketAlreadyExists" | "BucketNotEmpty" => {
            model::storage::StorageError::Conflict(format!("{}: {}", what, detail))
        }
        "InvalidBucketName" | "KeyTooLongError" | "EntityTooLarge" => {
            model::storage::StorageError::Validation(format!("{}: {}", what, detail))
        }
        _ => model::storage::StorageError::Provider(format!("{}: {}", what, detail)),
    }
}

fn to_modified_time(dt: Option<&aws_sdk_s3::primitives::DateTime>) -> SystemTime {
    match dt {
        Some(dt) => SystemTime::UNIX_EPOCH + Duration::new(dt.secs() as u64, dt.subsec_nanos()),
        None => SystemTime::UNIX_EPOCH,
    }
}

impl adapters::ObjectStore for aws_sdk_s3::Client {
    fn create_bucket(
        &self,
        bucket: &str,
    ) -> Result<model::storage::Bucket, model::storage::StorageError> {
        let req = self.create_bucket().bucket(bucket);

        match util::poll::block_on(req.send()) {
            Ok(_) => Ok(model::storage::Bucket {
                name: bucket.to_string(),
                created: None,
            }),
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    // Re-creating a bucket the caller already owns succeeds.
                    if svc_err.is_bucket_already_owned_by_you() {
                        return Ok(model::storage::Bucket {
                            name: bucket.to_string(),
                            created: None,
                        });
                    }
                }

                Err(classify(&format!("create_bucket {}", bucket), err))
            }
        }
    }

    fn delete_bucket(&self, bucket: &str) -> Result<bool, model::storage::StorageError> {
        let req = self.delete_bucket().bucket(bucket);

        match util::poll::block_on(req.send()) {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.code() == Some("NoSuchBucket") {
                    return Ok(false);
                }

                Err(classify(&format!("delete_bucket {}", bucket), err))
            }
        }
    }

    fn list_buckets(&self) -> Result<Vec<model::storage::Bucket>, model::storage::StorageError> {
        let lb = util::poll::block_on(self.list_buckets().send())
            .map_err(|err| classify("list_buckets", err))?;

        let mut buckets = Vec::new();
        for b in lb.buckets() {
            buckets.push(model::storage::Bucket {
                name: b.name().unwrap_or("").to_string(),
                created: b.creation_date().map(|dt| {
                    SystemTime::UNIX_EPOCH + Duration::new(dt.secs() as u64, dt.subsec_nanos())
                }),
            });
        }

        Ok(buckets)
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), model::storage::StorageError> {
        let req = self
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body));

        util::poll::block_on(req.send())
            .map_err(|err| classify(&format!("put_object {}", key), err))?;

        Ok(())
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::storage::StorageError> {
        let req = self.get_object().bucket(bucket).key(key);

        let o = match util::poll::block_on(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_no_such_key() {
                        return Ok(None);
                    }
                }

                return Err(classify(&format!("get_object {}", key), err));
            }
            Ok(o) => o,
        };

        let bytes = util::poll::block_on(o.body.collect()).map_err(|err| {
            model::storage::StorageError::Provider(format!(
                "collect body of {}: {}",
                key, err
            ))
        })?;

        Ok(Some(bytes.into_bytes().to_vec()))
    }

    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::storage::ObjectSummary>, model::storage::StorageError> {
        let req = self.head_object().bucket(bucket).key(key);

        let ho = match util::poll::block_on(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_not_found() {
                        return Ok(None);
                    }
                }

                return Err(classify(&format!("head_object {}", key), err));
            }
            Ok(ho) => ho,
        };

        Ok(Some(model::storage::ObjectSummary {
            key: key.to_string(),
            size: ho.content_length().unwrap_or(0),
            modified_time: to_modified_time(ho.last_modified()),
        }))
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<model::storage::ObjectSummary>, model::storage::StorageError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self.list_objects_v2().bucket(bucket).prefix(prefix);

            if let Some(tok) = continuation_token {
                req = req.continuation_token(tok);
            }

            let lo = util::poll::block_on(req.send())
                .map_err(|err| classify(&format!("list_objects {}", prefix), err))?;

            for o in lo.contents() {
                objects.push(model::storage::ObjectSummary {
                    key: o.key().unwrap_or("").to_string(),
                    size: o.size().unwrap_or(0),
                    modified_time: to_modified_time(o.last_modified()),
                });
            }

            continuation_token = lo.next_continuation_token().map(|tok| tok.to_string());
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(), model::storage::StorageError> {
        let req = self.delete_object().bucket(bucket).key(key);

        util::poll::block_on(req.send())
            .map_err(|err| classify(&format!("delete_object {}", key), err))?;

        Ok(())
    }

    fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<(), model::storage::StorageError> {
        for batch in keys.chunks(DELETE_BATCH) {
            let mut identifiers = Vec::with_capacity(batch.len());
            for key in batch {
                let id = ObjectIdentifier::builder().key(key).build().map_err(|err| {
                    model::storage::StorageError::Validation(format!(
                        "delete_objects {}: {}",
                        key, err
                    ))
                })?;
                identifiers.push(id);
            }

            let delete = Delete::builder()
                .set_objects(Some(identifiers))
                .build()
                .map_err(|err| {
                    model::storage::StorageError::Validation(format!("delete_objects: {}", err))
                })?;

            let req = self.delete_objects().bucket(bucket).delete(delete);

            util::poll::block_on(req.send())
                .map_err(|err| classify(&format!("delete_objects in {}", bucket), err))?;
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
        let req = self
            .copy_object()
            .copy_source(format!("{}/{}", src_bucket, src_key))
            .bucket(dst_bucket)
            .key(dst_key);

        util::poll::block_on(req.send())
            .map_err(|err| classify(&format!("copy_object {}", src_key), err))?;

        Ok(())
    }

    fn make_object_public(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(), model::storage::StorageError> {
        let req = self
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead);

        util::poll::block_on(req.send())
            .map_err(|err| classify(&format!("put_object_acl {}", key), err))?;

        Ok(())
    }

    fn is_object_public(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<bool, model::storage::StorageError> {
        let req = self.get_object_acl().bucket(bucket).key(key);

        let acl = util::poll::block_on(req.send())
            .map_err(|err| classify(&format!("get_object_acl {}", key), err))?;

        for grant in acl.grants() {
            let read = matches!(grant.permission(), Some(Permission::Read));
            let all_users = grant
                .grantee()
                .and_then(|g| g.uri())
                .map(|uri| uri == ALL_USERS_URI)
                .unwrap_or(false);

            if read && all_users {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn object_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, model::storage::StorageError> {
        let cfg = PresigningConfig::expires_in(expires_in).map_err(|err| {
            model::storage::StorageError::Validation(format!("url expiry: {}", err))
        })?;

        let presigned =
            util::poll::block_on(self.get_object().bucket(bucket).key(key).presigned(cfg))
                .map_err(|err| classify(&format!("presign {}", key), err))?;

        Ok(presigned.uri().to_string())
    }
}
