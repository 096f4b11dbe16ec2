//! [`ObjectStore`] backed by an S3 bucket.

use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;

use crate::{ObjectEntry, ObjectStore, StorageError};

/// S3 client bound to one bucket.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    /// Creates a store for `bucket` from the ambient AWS configuration.
    ///
    /// Nothing is validated here; invalid credentials or an unreachable
    /// bucket surface on the first request.
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(&self) -> Result<Vec<ObjectEntry>, StorageError> {
        let bucket = &self.bucket;
        log::info!("Listing s3://{bucket}/*");

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| StorageError::List {
                bucket: bucket.clone(),
                prefix: String::new(),
                source: Box::new(e),
            })?;

            for obj in output.contents() {
                if let Some(key) = obj.key() {
                    #[allow(clippy::cast_sign_loss)] // S3 sizes are non-negative
                    let size = obj.size().unwrap_or(0) as u64;
                    objects.push(ObjectEntry {
                        key: key.to_string(),
                        size,
                    });
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
                if continuation_token.is_none() {
                    log::warn!("  listing truncated without a continuation token, stopping");
                    break;
                }
            } else {
                break;
            }
        }

        log::info!("  found {} objects", objects.len());
        Ok(objects)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(HeadObjectError::is_not_found)
                {
                    return Ok(false);
                }
                Err(StorageError::Head {
                    bucket: self.bucket.clone(),
                    key: key.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let download_err = |source: Box<dyn std::error::Error + Send + Sync>| {
            StorageError::Download {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                source,
            }
        };

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| download_err(Box::new(e)))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| download_err(Box::new(e)))?;

        let data = bytes.into_bytes().to_vec();
        log::debug!("  downloaded s3://{}/{key} ({} bytes)", self.bucket, data.len());
        Ok(data)
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let size = data.len();
        log::info!(
            "Pushing {size} bytes -> s3://{}/{key} ({content_type})",
            self.bucket
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                source: Box::new(e),
            })?;

        log::info!("  uploaded {key}");
        Ok(())
    }
}
