#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Restores missing `WordPress` originals in an offloaded media bucket.
//!
//! When the unsuffixed originals of a `WordPress` media library have been
//! deleted from its bucket but the resized variants survive, the
//! [`Restorer`] writes each missing original back using the largest
//! surviving variant as its source.
//!
//! A run is strictly sequential:
//!
//! 1. List every object in the bucket once. A listing failure is fatal
//!    ([`RestoreError::StorageUnavailable`]).
//! 2. Parse and group keys (see [`media_restore_models`]).
//! 3. For each group without an original, pick the largest-area variant,
//!    download it, re-encode it in its own format and upload it under the
//!    original's key. Failures only affect their own group
//!    ([`GroupError`]); the run moves on.
//!
//! Groups that already have an original are never touched, so running
//! twice is harmless.

pub mod progress;
pub mod reconstruct;
pub mod report;

use chrono::Utc;
use media_restore_models::{ImageGroup, Variant, group_objects};
use media_restore_storage::{ObjectStore, S3Store, StorageError};

pub use progress::{NullProgress, ProgressCallback};
pub use reconstruct::{Reconstructed, reconstruct};
pub use report::{GroupOutcome, GroupReport, RestoreStats, RunReport};

/// Settings for a restore run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreConfig {
    /// Bucket holding the offloaded media library.
    pub bucket: String,
}

impl RestoreConfig {
    /// Creates a config for `bucket`.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }
}

/// Fatal errors that abort the whole run.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// The bucket could not be listed (unreachable, missing, or bad
    /// credentials). No group has been touched.
    #[error("Storage unavailable for bucket {bucket}: {source}")]
    StorageUnavailable {
        /// Bucket name.
        bucket: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },
}

/// Errors that abort a single group's restoration.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// Checking for the original or downloading the source failed.
    #[error("Failed to fetch {key}: {source}")]
    ObjectFetchFailed {
        /// Object key.
        key: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// Uploading the restored original failed.
    #[error("Failed to put {key}: {source}")]
    ObjectPutFailed {
        /// Object key.
        key: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// The source bytes are not an image format we can identify.
    #[error("Unrecognized image data in {key}: {source}")]
    UnsupportedFormat {
        /// Object key.
        key: String,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// The source image could not be decoded.
    #[error("Failed to decode {key}: {source}")]
    DecodeFailed {
        /// Object key.
        key: String,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// The decoded image could not be re-encoded.
    #[error("Failed to encode image from {key}: {source}")]
    EncodeFailed {
        /// Object key.
        key: String,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },
}

/// Scans a bucket and writes back missing originals.
pub struct Restorer<S> {
    store: S,
    config: RestoreConfig,
}

impl Restorer<S3Store> {
    /// Creates a restorer for `config.bucket` using the ambient AWS
    /// configuration.
    pub async fn connect(config: RestoreConfig) -> Self {
        let store = S3Store::from_env(config.bucket.clone()).await;
        Self::new(store, config)
    }
}

impl<S: ObjectStore> Restorer<S> {
    /// Creates a restorer over an existing store.
    #[must_use]
    pub const fn new(store: S, config: RestoreConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Runs a full list, group, select and restore pass over the bucket.
    ///
    /// Per-group failures are logged and recorded in the returned report;
    /// they do not fail the run.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError::StorageUnavailable`] if the bucket listing
    /// fails. Nothing is uploaded in that case.
    pub async fn run(&self, progress: &dyn ProgressCallback) -> Result<RunReport, RestoreError> {
        let started_at = Utc::now();
        let bucket = &self.config.bucket;

        let listing =
            self.store
                .list_objects()
                .await
                .map_err(|source| RestoreError::StorageUnavailable {
                    bucket: bucket.clone(),
                    source,
                })?;

        let listed_bytes: u64 = listing.iter().map(|o| o.size).sum();
        log::info!(
            "{} objects ({listed_bytes} bytes) in s3://{bucket}",
            listing.len()
        );

        let grouped = group_objects(listing.iter().map(|o| o.key.as_str()));
        let orphaned: Vec<&ImageGroup> = grouped.orphaned().collect();

        let mut stats = RestoreStats {
            objects: grouped.objects,
            ignored: grouped.ignored,
            groups: grouped.groups.len() as u64,
            complete: grouped.complete(),
            orphaned: orphaned.len() as u64,
            ..RestoreStats::default()
        };

        log::info!(
            "{} image groups in s3://{bucket}: {} complete, {} missing an original",
            stats.groups,
            stats.complete,
            stats.orphaned
        );

        progress.set_total(stats.orphaned);
        let mut groups = Vec::with_capacity(orphaned.len());

        for group in orphaned {
            progress.set_message(group.base().to_string());

            if let Some(report) = self.restore_group(group).await {
                match report.outcome {
                    GroupOutcome::Restored { .. } => stats.restored += 1,
                    GroupOutcome::AlreadyPresent => stats.already_present += 1,
                    GroupOutcome::Failed { .. } => stats.failed += 1,
                }
                groups.push(report);
            }

            progress.inc(1);
        }

        progress.finish(format!("{} restored, {} failed", stats.restored, stats.failed));
        log::info!("Restore complete: {stats}");

        Ok(RunReport {
            bucket: bucket.clone(),
            started_at,
            stats,
            groups,
        })
    }

    /// Restores one group's original from its largest variant.
    ///
    /// Returns `None` without touching storage when the group already has
    /// an original or has no variants.
    pub async fn restore_group(&self, group: &ImageGroup) -> Option<GroupReport> {
        if !group.is_orphaned() {
            return None;
        }
        let source = group.select_candidate()?;
        let original_key = group.original_key_for(source);

        log::info!(
            "Restoring {original_key} from {} ({}x{})",
            source.key,
            source.width,
            source.height
        );

        let outcome = match self.restore_from(&original_key, source).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("  {e}");
                GroupOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        Some(GroupReport {
            base: group.base().to_string(),
            original_key,
            source_key: source.key.clone(),
            outcome,
        })
    }

    async fn restore_from(
        &self,
        original_key: &str,
        source: &Variant,
    ) -> Result<GroupOutcome, GroupError> {
        let fetch_err = |key: &str| {
            let key = key.to_string();
            move |source: StorageError| GroupError::ObjectFetchFailed { key, source }
        };

        if self
            .store
            .exists(original_key)
            .await
            .map_err(fetch_err(original_key))?
        {
            log::warn!("  {original_key} already exists, skipping");
            return Ok(GroupOutcome::AlreadyPresent);
        }

        let data = self
            .store
            .get(&source.key)
            .await
            .map_err(fetch_err(&source.key))?;

        let image = reconstruct(&source.key, &data)?;
        if (image.width, image.height) != (source.width, source.height) {
            log::debug!(
                "  {} decodes to {}x{}, not the {}x{} in its name",
                source.key,
                image.width,
                image.height,
                source.width,
                source.height
            );
        }

        let content_type = image.content_type();
        let bytes = image.data.len() as u64;

        self.store
            .put(original_key, image.data, content_type)
            .await
            .map_err(|source| GroupError::ObjectPutFailed {
                key: original_key.to_string(),
                source,
            })?;

        Ok(GroupOutcome::Restored {
            bytes,
            content_type: content_type.to_string(),
        })
    }
}
