//! In-process [`ObjectStore`].
//!
//! Keeps objects in insertion order so listings are deterministic, records
//! every head/get/put call, and can be told to fail specific operations.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{ObjectEntry, ObjectStore, StorageError};

struct StoredObject {
    key: String,
    data: Vec<u8>,
    content_type: Option<String>,
}

#[derive(Default)]
struct State {
    objects: Vec<StoredObject>,
    fail_list: bool,
    fail_head: BTreeSet<String>,
    fail_get: BTreeSet<String>,
    fail_put: BTreeSet<String>,
    heads: Vec<String>,
    gets: Vec<String>,
    puts: Vec<String>,
}

/// Bucket held entirely in memory.
pub struct MemoryStore {
    bucket: String,
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty bucket called `bucket`.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds (or replaces) an object. New keys are appended to the listing.
    pub fn insert(&self, key: impl Into<String>, data: Vec<u8>) {
        store(&mut self.state(), key.into(), data, None);
    }

    /// Builder form of [`Self::insert`].
    #[must_use]
    pub fn with_object(self, key: impl Into<String>, data: Vec<u8>) -> Self {
        self.insert(key, data);
        self
    }

    /// Body of `key`, if present.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state()
            .objects
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.data.clone())
    }

    /// Content type recorded by the last [`ObjectStore::put`] of `key`.
    #[must_use]
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.state()
            .objects
            .iter()
            .find(|o| o.key == key)
            .and_then(|o| o.content_type.clone())
    }

    /// All keys in listing order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let state = self.state();
        let keys = state.objects.iter().map(|o| o.key.clone()).collect();
        drop(state);
        keys
    }

    /// Makes every subsequent listing fail.
    pub fn fail_list(&self) {
        self.state().fail_list = true;
    }

    /// Makes `exists` fail for `key`.
    pub fn fail_head(&self, key: impl Into<String>) {
        self.state().fail_head.insert(key.into());
    }

    /// Makes `get` fail for `key`.
    pub fn fail_get(&self, key: impl Into<String>) {
        self.state().fail_get.insert(key.into());
    }

    /// Makes `put` fail for `key`.
    pub fn fail_put(&self, key: impl Into<String>) {
        self.state().fail_put.insert(key.into());
    }

    /// Keys passed to `exists`, in call order.
    #[must_use]
    pub fn head_calls(&self) -> Vec<String> {
        self.state().heads.clone()
    }

    /// Keys passed to `get`, in call order.
    #[must_use]
    pub fn get_calls(&self) -> Vec<String> {
        self.state().gets.clone()
    }

    /// Keys passed to `put` (including failed attempts), in call order.
    #[must_use]
    pub fn put_calls(&self) -> Vec<String> {
        self.state().puts.clone()
    }
}

fn store(state: &mut State, key: String, data: Vec<u8>, content_type: Option<String>) {
    if let Some(existing) = state.objects.iter_mut().find(|o| o.key == key) {
        existing.data = data;
        existing.content_type = content_type;
    } else {
        state.objects.push(StoredObject {
            key,
            data,
            content_type,
        });
    }
}

fn injected(op: &str) -> Box<dyn std::error::Error + Send + Sync> {
    format!("injected {op} failure").into()
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(&self) -> Result<Vec<ObjectEntry>, StorageError> {
        let state = self.state();
        if state.fail_list {
            return Err(StorageError::List {
                bucket: self.bucket.clone(),
                prefix: String::new(),
                source: injected("list"),
            });
        }

        let listing = state
            .objects
            .iter()
            .map(|o| ObjectEntry {
                key: o.key.clone(),
                size: o.data.len() as u64,
            })
            .collect();
        drop(state);

        Ok(listing)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let mut state = self.state();
        state.heads.push(key.to_string());
        if state.fail_head.contains(key) {
            return Err(StorageError::Head {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                source: injected("head"),
            });
        }
        Ok(state.objects.iter().any(|o| o.key == key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut state = self.state();
        state.gets.push(key.to_string());
        if state.fail_get.contains(key) {
            return Err(StorageError::Download {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                source: injected("get"),
            });
        }
        let data = state
            .objects
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.data.clone());
        drop(state);

        data.ok_or_else(|| StorageError::Download {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            source: "NoSuchKey".into(),
        })
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let mut state = self.state();
        state.puts.push(key.to_string());
        if state.fail_put.contains(key) {
            return Err(StorageError::Upload {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                source: injected("put"),
            });
        }
        store(
            &mut state,
            key.to_string(),
            data,
            Some(content_type.to_string()),
        );
        Ok(())
    }
}
