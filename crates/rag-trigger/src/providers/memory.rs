//! In-process object store
//!
//! Buckets live in a map behind a mutex. A test double for the handler and
//! server tests, with switches to make copies or deletes fail.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{Error, Result};

use super::object_store::ObjectStoreProvider;

/// Object store holding every bucket in memory
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: Mutex<HashMap<String, BTreeMap<String, Bytes>>>,
    copies: AtomicUsize,
    deletes: AtomicUsize,
    fail_copies: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an object, replacing any existing one
    pub fn put(&self, bucket: &str, name: &str, data: impl Into<Bytes>) {
        self.buckets
            .lock()
            .entry(bucket.to_string())
            .or_default()
            .insert(name.to_string(), data.into());
    }

    pub fn get(&self, bucket: &str, name: &str) -> Option<Bytes> {
        self.buckets
            .lock()
            .get(bucket)
            .and_then(|objects| objects.get(name))
            .cloned()
    }

    /// Object names in a bucket, sorted
    pub fn list(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of successful copies since creation
    pub fn copy_count(&self) -> usize {
        self.copies.load(Ordering::Relaxed)
    }

    /// Number of successful deletes since creation
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Make subsequent copies fail, to exercise error paths
    pub fn set_fail_copies(&self, fail: bool) {
        self.fail_copies.store(fail, Ordering::Relaxed);
    }

    /// Make subsequent deletes fail
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl ObjectStoreProvider for MemoryObjectStore {
    async fn exists(&self, bucket: &str, name: &str) -> Result<bool> {
        Ok(self
            .buckets
            .lock()
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(name)))
    }

    async fn copy(
        &self,
        source_bucket: &str,
        name: &str,
        destination_bucket: &str,
    ) -> Result<()> {
        if self.fail_copies.load(Ordering::Relaxed) {
            return Err(Error::storage(format!(
                "Copy of {} to {} rejected",
                name, destination_bucket
            )));
        }

        let mut buckets = self.buckets.lock();
        let data = buckets
            .get(source_bucket)
            .and_then(|objects| objects.get(name))
            .cloned()
            .ok_or_else(|| Error::object_not_found(source_bucket, name))?;

        buckets
            .entry(destination_bucket.to_string())
            .or_default()
            .insert(name.to_string(), data);
        self.copies.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete(&self, bucket: &str, name: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::Relaxed) {
            return Err(Error::storage(format!(
                "Delete of gs://{}/{} rejected",
                bucket, name
            )));
        }

        let removed = self
            .buckets
            .lock()
            .get_mut(bucket)
            .and_then(|objects| objects.remove(name));

        match removed {
            Some(_) => {
                self.deletes.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(Error::object_not_found(bucket, name)),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
