//! [`ObjectStorage`] over an S3-compatible bucket.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::{ObjectStat, ObjectStorage, StorageError, StorageResult};

/// S3 caps `DeleteObjects` at this many keys per request.
const DELETE_BATCH_SIZE: usize = 1000;

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the ambient AWS configuration. `endpoint` points
    /// at an S3-compatible server (MinIO) and switches to path-style URLs.
    pub async fn from_env(bucket: impl Into<String>, endpoint: Option<&str>) -> Self {
        let shared = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(url) = endpoint {
            builder = builder.endpoint_url(url).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()), bucket)
    }
}

fn backend<E: std::fmt::Display>(op: &str, key: &str, err: E) -> StorageError {
    StorageError::Backend(format!("{op} {key}: {err}"))
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(key.to_string())
                } else {
                    backend("get_object", key, e)
                }
            })?;
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| backend("get_object", key, e))?;
        Ok(data.into_bytes())
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| backend("put_object", key, e))?;
        Ok(())
    }

    async fn duplicate_file(&self, source: &str, target: &str) -> StorageResult<()> {
        if self.stat_object(source).await?.is_none() {
            return Err(StorageError::NotFound(source.to_string()));
        }
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, source))
            .key(target)
            .send()
            .await
            .map_err(|e| backend("copy_object", target, e))?;
        tracing::debug!(source, target, "Copied object");
        Ok(())
    }

    async fn stat_object(&self, key: &str) -> StorageResult<Option<ObjectStat>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => Ok(Some(ObjectStat {
                size: head.content_length().unwrap_or_default(),
                content_type: head.content_type().map(str::to_string),
            })),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(backend("head_object", key, e)),
        }
    }

    async fn remove_objects(&self, keys: &[String]) -> StorageResult<()> {
        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = chunk
                .iter()
                .map(|k| ObjectIdentifier::builder().key(k).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| backend("delete_objects", "batch", e))?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| backend("delete_objects", "batch", e))?;
            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| backend("delete_objects", "batch", e))?;
        }
        tracing::debug!(count = keys.len(), "Removed objects");
        Ok(())
    }
}
