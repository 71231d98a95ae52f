//! The final benchmark report.

use std::time::Duration;

/// Aggregated counters for one benchmark run.
///
/// Built once, at shutdown, by
/// [`Benchmark::collect_report`](crate::Benchmark::collect_report).
/// All counters only cover the time during which metric collection was
/// enabled.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Report {
    /// Files fully downloaded by the worker pool.
    pub files_downloaded: u64,
    /// Bytes downloaded by the worker pool, by declared object size.
    pub bytes_downloaded: u64,
    /// Files drained by the consumer.
    pub files_consumed: u64,
    /// Bytes drained by the consumer.
    pub bytes_consumed: u64,
    /// First-byte latency of every non-empty download, across all
    /// workers. Order across workers is unspecified.
    pub first_byte_latencies: Vec<Duration>,
}
