//! A continuous download benchmark for object-storage buckets.
//!
//! The engine lists a bucket once and replays its keys forever through a
//! fixed ring of reusable slots. A pool of downloader workers fills the
//! slots in parallel, measuring the first-byte latency of every
//! download, while a single external consumer drains the slots in the
//! exact order the feeder assigned them. Latency and byte/file counters
//! stay worker-local until shutdown, when they are merged into one
//! [`Report`].
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod benchmark;
mod feeder;
mod report;
mod slot;
mod toggle;
mod worker;

pub use benchmark::{Benchmark, EngineError, NextObject};
pub use report::Report;
