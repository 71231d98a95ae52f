//! In-memory store for tests.
//!
//! Backs the engine's tests without network or filesystem setup. The
//! population keeps insertion order, since listing order is significant
//! for the engine's cyclic replay. Objects can be given an artificial
//! delay before their first body chunk (to force out-of-order download
//! completion) or poisoned so retrieval fails.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;

use crate::error::StorageError;
use crate::store::{ObjectDownload, ObjectStore};

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Clone)]
struct StoredObject {
    key: String,
    body: Bytes,
    delay: Option<Duration>,
    poisoned: bool,
}

/// An [`ObjectStore`] backed by an in-memory object list.
///
/// Clonable, so tests can hold a handle for direct manipulation while
/// the engine owns a shared copy.
#[derive(Clone)]
pub struct InMemoryStore {
    bucket_name: String,
    objects: Arc<Mutex<Vec<StoredObject>>>,
    listing_broken: Arc<Mutex<bool>>,
}

impl InMemoryStore {
    /// Creates an empty store posing as the given bucket.
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            objects: Arc::new(Mutex::new(Vec::new())),
            listing_broken: Arc::new(Mutex::new(false)),
        }
    }

    /// Adds an object at the end of the listing order.
    pub fn insert(&self, key: impl Into<String>, body: &[u8]) {
        self.objects.lock().unwrap().push(StoredObject {
            key: key.into(),
            body: Bytes::copy_from_slice(body),
            delay: None,
            poisoned: false,
        });
    }

    /// Adds an object whose first body chunk arrives after `delay`.
    pub fn insert_with_delay(&self, key: impl Into<String>, body: &[u8], delay: Duration) {
        self.objects.lock().unwrap().push(StoredObject {
            key: key.into(),
            body: Bytes::copy_from_slice(body),
            delay: Some(delay),
            poisoned: false,
        });
    }

    /// Makes retrieval of the given key fail. Listing is unaffected.
    pub fn poison(&self, key: &str) {
        let mut objects = self.objects.lock().unwrap();
        if let Some(object) = objects.iter_mut().find(|object| object.key == key) {
            object.poisoned = true;
        }
    }

    /// Makes all subsequent listing calls fail.
    pub fn break_listing(&self) {
        *self.listing_broken.lock().unwrap() = true;
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("bucket_name", &self.bucket_name)
            .field("objects", &self.objects.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryStore {
    fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    async fn list_objects(&self) -> Result<Vec<String>, StorageError> {
        if *self.listing_broken.lock().unwrap() {
            return Err(StorageError::Io(std::io::Error::other("listing failed")));
        }

        let objects = self.objects.lock().unwrap();
        Ok(objects.iter().map(|object| object.key.clone()).collect())
    }

    async fn get_object(&self, key: &str) -> Result<ObjectDownload, StorageError> {
        let object = {
            let objects = self.objects.lock().unwrap();
            objects.iter().find(|object| object.key == key).cloned()
        };

        let Some(object) = object else {
            return Err(StorageError::Unavailable {
                key: key.to_owned(),
            });
        };
        if object.poisoned {
            return Err(StorageError::Unavailable {
                key: key.to_owned(),
            });
        }

        let size = object.body.len() as u64;
        let chunks: Vec<Bytes> = (0..object.body.len())
            .step_by(CHUNK_SIZE)
            .map(|start| {
                object
                    .body
                    .slice(start..object.body.len().min(start + CHUNK_SIZE))
            })
            .collect();

        let delay = object.delay;
        let stream = futures_util::stream::iter(chunks.into_iter().enumerate())
            .then(move |(index, chunk)| async move {
                if index == 0
                    && let Some(delay) = delay
                {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            })
            .boxed();

        Ok(ObjectDownload { size, stream })
    }
}
