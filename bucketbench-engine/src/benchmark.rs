//! The engine façade: construction, the single-consumer handoff,
//! runtime controls, and shutdown aggregation.

use std::sync::Arc;
use std::time::Duration;

use bucketbench_storage::{SharedStore, StorageError};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::feeder;
use crate::report::Report;
use crate::slot::SlotRing;
use crate::toggle::MetricsToggle;
use crate::worker::{self, TallySenders};

/// Errors from engine construction.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The worker count must be at least one.
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    /// The initial bucket listing failed; there is no key population to
    /// replay.
    #[error("failed to list bucket `{bucket}`")]
    List {
        /// The bucket that could not be listed.
        bucket: String,
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },

    /// The bucket holds no objects; an empty population cannot be
    /// replayed.
    #[error("bucket `{bucket}` is empty")]
    EmptyBucket {
        /// The empty bucket.
        bucket: String,
    },
}

/// One object handed to the consumer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NextObject {
    /// The object key.
    pub name: String,
    /// Bytes read for the object's last completed download.
    pub size: u64,
}

/// The benchmark engine.
///
/// Owns the feeder and downloader tasks. The holder of this value is
/// the single external consumer, draining slots through
/// [`next_object`](Self::next_object).
#[derive(Debug)]
pub struct Benchmark {
    bucket: String,
    ring: Arc<SlotRing>,
    position: usize,
    toggle: Arc<MetricsToggle>,
    shutdown: CancellationToken,
    concurrency: usize,

    latencies_rx: mpsc::Receiver<Vec<Duration>>,
    files_rx: mpsc::Receiver<u64>,
    bytes_rx: mpsc::Receiver<u64>,

    files_consumed: u64,
    bytes_consumed: u64,

    tasks: Vec<JoinHandle<()>>,
}

impl Benchmark {
    /// Lists the bucket and starts the feeder plus `concurrency`
    /// downloader workers.
    ///
    /// The worker count also sizes the slot ring, bounding both the
    /// number of in-flight downloads and how far the pool can run ahead
    /// of the consumer. Metric collection starts disabled.
    pub async fn start(store: SharedStore, concurrency: usize) -> Result<Self, EngineError> {
        if concurrency == 0 {
            return Err(EngineError::InvalidConcurrency);
        }

        let bucket = store.bucket_name().to_owned();
        let keys = match store.list_objects().await {
            Ok(keys) => keys,
            Err(source) => {
                error!(bucket = %bucket, %source, "failed to list bucket");
                return Err(EngineError::List { bucket, source });
            }
        };
        if keys.is_empty() {
            return Err(EngineError::EmptyBucket { bucket });
        }
        info!(bucket = %bucket, objects = keys.len(), "learned bucket population");

        let ring = Arc::new(SlotRing::new(concurrency));
        let toggle = Arc::new(MetricsToggle::default());
        let shutdown = CancellationToken::new();

        let (assignments_tx, assignments_rx) = mpsc::channel(1);
        let assignments_rx = Arc::new(Mutex::new(assignments_rx));

        let (latencies_tx, latencies_rx) = mpsc::channel(1);
        let (files_tx, files_rx) = mpsc::channel(1);
        let (bytes_tx, bytes_rx) = mpsc::channel(1);
        let tallies = TallySenders {
            latencies: latencies_tx,
            files: files_tx,
            bytes: bytes_tx,
        };

        let mut tasks = Vec::with_capacity(concurrency + 1);
        tasks.push(tokio::spawn(feeder::run(
            bucket.clone(),
            keys,
            Arc::clone(&ring),
            assignments_tx,
            shutdown.clone(),
        )));
        for worker in 0..concurrency {
            tasks.push(tokio::spawn(worker::run(
                worker,
                Arc::clone(&store),
                Arc::clone(&ring),
                Arc::clone(&assignments_rx),
                Arc::clone(&toggle),
                shutdown.clone(),
                tallies.clone(),
            )));
        }

        Ok(Self {
            bucket,
            ring,
            position: 0,
            toggle,
            shutdown,
            concurrency,
            latencies_rx,
            files_rx,
            bytes_rx,
            files_consumed: 0,
            bytes_consumed: 0,
            tasks,
        })
    }

    /// Blocks until the next slot in feeder order holds a completed
    /// download, returns its metadata, and releases the slot for reuse.
    ///
    /// The `&mut` receiver makes this single-consumer by construction;
    /// callers that must share the handoff serialize it externally,
    /// e.g. behind a mutex.
    pub async fn next_object(&mut self) -> NextObject {
        debug!(slot = self.position, "waiting for next object");
        let (name, size) = self.ring.slot(self.position).take().await;
        debug!(name = %name, size, "consumed object");

        if self.toggle.enabled() {
            self.files_consumed += 1;
            self.bytes_consumed += size;
        }
        self.position = (self.position + 1) % self.ring.len();

        NextObject { name, size }
    }

    /// Whether metric collection is currently enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.toggle.enabled()
    }

    /// Enables or disables metric collection without stopping
    /// downloads. Idempotent.
    pub fn set_metrics_enabled(&self, enabled: bool) {
        self.toggle.set(enabled);
    }

    /// Requests shutdown of the feeder and all workers. Idempotent.
    ///
    /// Cancellation is cooperative: a worker mid-download completes
    /// that download before observing the signal.
    pub fn stop(&self) {
        if !self.shutdown.is_cancelled() {
            info!(bucket = %self.bucket, "stopping benchmark");
        }
        self.shutdown.cancel();
    }

    /// Whether [`stop`](Self::stop) has been requested.
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Drains every worker's tallies and merges them with the
    /// consumer-side counters into the final [`Report`].
    ///
    /// Must follow [`stop`](Self::stop): workers only emit tallies on
    /// their exit path, so collecting a running benchmark blocks until
    /// it is stopped. Consuming `self` makes this single-shot.
    pub async fn collect_report(mut self) -> Report {
        let mut report = Report {
            files_consumed: self.files_consumed,
            bytes_consumed: self.bytes_consumed,
            ..Report::default()
        };

        // A rendezvous with every worker: each sends exactly once per
        // channel on exit, including workers that died on their fatal
        // path before shutdown.
        for _ in 0..self.concurrency {
            let latencies = self
                .latencies_rx
                .recv()
                .await
                .expect("every worker sends its latencies once");
            report.first_byte_latencies.extend(latencies);
        }
        for _ in 0..self.concurrency {
            report.files_downloaded += self
                .files_rx
                .recv()
                .await
                .expect("every worker sends its file count once");
        }
        for _ in 0..self.concurrency {
            report.bytes_downloaded += self
                .bytes_rx
                .recv()
                .await
                .expect("every worker sends its byte count once");
        }

        for task in self.tasks.drain(..) {
            let _ = task.await;
        }

        info!(
            files = report.files_downloaded,
            bytes = report.bytes_downloaded,
            samples = report.first_byte_latencies.len(),
            "collected benchmark report"
        );
        report
    }
}

impl Drop for Benchmark {
    fn drop(&mut self) {
        // Detached feeder and worker tasks must not outlive the handle.
        self.shutdown.cancel();
    }
}
