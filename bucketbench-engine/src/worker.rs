//! Downloader workers: turn assignments into filled slots, measuring
//! first-byte latency.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use bucketbench_storage::{ObjectDownload, ObjectStore, SharedStore, StorageError};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::{Mutex, mpsc};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::feeder::Assignment;
use crate::slot::SlotRing;
use crate::toggle::MetricsToggle;

/// Worker-local counters, sent over the aggregation channels on exit.
#[derive(Debug, Default)]
struct Tally {
    latencies: Vec<Duration>,
    files: u64,
    bytes: u64,
}

/// Sender halves of the three aggregation channels.
///
/// Every worker sends exactly once on each channel when it exits,
/// whether it exits via shutdown or via its fatal path.
#[derive(Clone, Debug)]
pub(crate) struct TallySenders {
    pub(crate) latencies: mpsc::Sender<Vec<Duration>>,
    pub(crate) files: mpsc::Sender<u64>,
    pub(crate) bytes: mpsc::Sender<u64>,
}

/// One downloader worker: pulls assignments until shutdown, then
/// reports its tallies.
pub(crate) async fn run(
    worker: usize,
    store: SharedStore,
    ring: Arc<SlotRing>,
    assignments: Arc<Mutex<mpsc::Receiver<Assignment>>>,
    toggle: Arc<MetricsToggle>,
    shutdown: CancellationToken,
    tallies: TallySenders,
) {
    let mut tally = Tally::default();

    loop {
        let assignment = tokio::select! {
            _ = shutdown.cancelled() => break,
            assignment = recv_next(&assignments) => match assignment {
                Some(assignment) => assignment,
                // The feeder is gone; no more assignments will arrive.
                None => break,
            },
        };

        if let Err(error) = download(&*store, &ring, assignment, &toggle, &mut tally).await {
            // Fatal to this worker: its share of throughput is gone for
            // the rest of the run. Not retried, not restarted.
            error!(worker, %error, "worker exiting after failed download");
            break;
        }
    }

    debug!(
        worker,
        files = tally.files,
        bytes = tally.bytes,
        samples = tally.latencies.len(),
        "worker reporting tallies"
    );
    let _ = tallies.latencies.send(tally.latencies).await;
    let _ = tallies.files.send(tally.files).await;
    let _ = tallies.bytes.send(tally.bytes).await;
}

async fn recv_next(assignments: &Mutex<mpsc::Receiver<Assignment>>) -> Option<Assignment> {
    assignments.lock().await.recv().await
}

/// Downloads one assignment into its slot.
///
/// Only the initial open/stat can fail; a mid-stream error is logged
/// and the slot is still filled with whatever was read.
async fn download(
    store: &dyn ObjectStore,
    ring: &SlotRing,
    assignment: Assignment,
    toggle: &MetricsToggle,
    tally: &mut Tally,
) -> Result<(), StorageError> {
    let Assignment { key, slot } = assignment;
    debug!(key = %key, slot, "starting download");

    let request_start = Instant::now();
    let ObjectDownload { size, stream } = store.get_object(&key).await?;

    if size == 0 {
        debug!(key = %key, "downloaded zero-size object");
        if toggle.enabled() {
            tally.files += 1;
        }
        ring.slot(slot).fill(key, 0);
        return Ok(());
    }

    let mut reader = FirstByteRecorder::new(StreamReader::new(stream));
    let mut sink = tokio::io::sink();
    if let Err(error) = tokio::io::copy(&mut reader, &mut sink).await {
        error!(key = %key, %error, "failed to copy object body");
    }

    let copied = reader.bytes_read();
    if copied != size {
        warn!(key = %key, expected = size, read = copied, "byte count differs from declared size");
    }

    if toggle.enabled() {
        if let Some(first_byte) = reader.first_byte() {
            tally.latencies.push(first_byte - request_start);
        }
        tally.files += 1;
        tally.bytes += size;
    }

    ring.slot(slot).fill(key, copied);
    Ok(())
}

/// Wraps a reader so the first successful read is forced to a 1-byte
/// read, capturing the moment the first body byte arrives.
#[derive(Debug)]
struct FirstByteRecorder<R> {
    inner: R,
    first_byte: Option<Instant>,
    bytes_read: u64,
}

impl<R> FirstByteRecorder<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            first_byte: None,
            bytes_read: 0,
        }
    }

    /// When the first body byte arrived, if any byte arrived at all.
    fn first_byte(&self) -> Option<Instant> {
        self.first_byte
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for FirstByteRecorder<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.first_byte.is_some() || buf.remaining() == 0 {
            let before = buf.filled().len();
            let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
            if let Poll::Ready(Ok(())) = poll {
                this.bytes_read += (buf.filled().len() - before) as u64;
            }
            return poll;
        }

        // Limit the first read to a single byte; its arrival is the
        // first-byte latency event.
        let mut byte = [0u8; 1];
        let mut one = ReadBuf::new(&mut byte);
        match Pin::new(&mut this.inner).poll_read(cx, &mut one) {
            Poll::Ready(Ok(())) => {
                let filled = one.filled();
                if !filled.is_empty() {
                    this.first_byte = Some(Instant::now());
                    this.bytes_read += filled.len() as u64;
                    buf.put_slice(filled);
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
