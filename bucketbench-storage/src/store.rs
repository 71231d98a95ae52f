use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::error::StorageError;

/// Type alias for object body streams.
pub type PayloadStream = BoxStream<'static, io::Result<Bytes>>;

/// A type-erased, shareable [`ObjectStore`].
pub type SharedStore = Arc<dyn ObjectStore>;

/// One object opened for download.
pub struct ObjectDownload {
    /// The size in bytes declared by the storage backend.
    pub size: u64,
    /// The object body. The stream may yield errors mid-body.
    pub stream: PayloadStream,
}

impl fmt::Debug for ObjectDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDownload")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// The object-storage collaborator contract.
///
/// A store is bound to one bucket at construction; every call is scoped
/// to that bucket.
#[async_trait::async_trait]
pub trait ObjectStore: fmt::Debug + Send + Sync + 'static {
    /// The bucket this store is bound to, for diagnostics.
    fn bucket_name(&self) -> &str;

    /// Lists the full key population of the bucket, in listing order.
    ///
    /// A failure here is terminal for the caller: without a key
    /// population there is nothing to download.
    async fn list_objects(&self) -> Result<Vec<String>, StorageError>;

    /// Opens an object for download, resolving its declared size.
    async fn get_object(&self, key: &str) -> Result<ObjectDownload, StorageError>;
}
