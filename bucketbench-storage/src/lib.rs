//! Object-storage collaborators for the benchmark engine.
//!
//! This crate provides the [`ObjectStore`] contract the engine downloads
//! through: listing the full key population of a bucket and opening
//! individual objects as sized byte streams. The production
//! implementation targets S3-compatible endpoints; an in-memory
//! implementation backs the engine's tests.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod error;
mod in_memory;
mod s3_compatible;
mod store;

pub use error::StorageError;
pub use in_memory::InMemoryStore;
pub use s3_compatible::{S3CompatibleStore, S3StoreConfig};
pub use store::{ObjectDownload, ObjectStore, PayloadStream, SharedStore};
