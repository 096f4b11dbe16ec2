#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Object storage access for the media restorer.
//!
//! The restorer only needs four operations against a single bucket: list
//! every key, check whether a key exists, download an object and upload an
//! object. They are expressed by the [`ObjectStore`] trait with two
//! implementations:
//!
//! * [`S3Store`]: the real bucket, via `aws-sdk-s3`.
//! * [`MemoryStore`]: an in-process bucket with call counters and
//!   injectable failures.
//!
//! # Credentials
//!
//! [`S3Store::from_env`] uses the standard AWS credential chain
//! (`AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`, `AWS_PROFILE`,
//! `~/.aws/credentials`, instance roles). `AWS_REGION` and
//! `AWS_ENDPOINT_URL` are read by the SDK as usual.

mod memory;
mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

/// Errors that can occur talking to the bucket.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// `ListObjectsV2` failed.
    #[error("Failed to list s3://{bucket}/{prefix}: {source}")]
    List {
        /// Bucket name.
        bucket: String,
        /// Key prefix.
        prefix: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `HeadObject` failed for a reason other than the object being absent.
    #[error("Failed to head s3://{bucket}/{key}: {source}")]
    Head {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `GetObject` failed.
    #[error("Failed to download s3://{bucket}/{key}: {source}")]
    Download {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `PutObject` failed.
    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Object key.
    pub key: String,
    /// Content length in bytes.
    pub size: u64,
}

/// Minimal object storage interface over a single bucket.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store operates on.
    fn bucket(&self) -> &str;

    /// Lists every object in the bucket, in the order the backend returns
    /// them. Pagination is handled internally.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] if the bucket cannot be listed.
    async fn list_objects(&self) -> Result<Vec<ObjectEntry>, StorageError>;

    /// Returns whether `key` currently exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Head`] on failures other than not-found.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Downloads the full body of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Download`] on failure.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Uploads `data` as `key`, replacing anything already there.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Upload`] on failure.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
}
