//! The feeder: replays the listed key population through the slot ring.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::slot::SlotRing;

/// A (key, slot index) pair handed from the feeder to one downloader.
#[derive(Debug)]
pub(crate) struct Assignment {
    pub(crate) key: String,
    pub(crate) slot: usize,
}

/// Cycles through `keys` forever, claiming ring slots in round-robin
/// order and handing assignments to the worker pool.
///
/// Returns once `shutdown` is cancelled or the worker pool is gone.
/// Claiming a slot blocks while the consumer has not drained its
/// previous contents; both suspension points race the shutdown signal,
/// so a cancelled feeder exits even while parked.
pub(crate) async fn run(
    bucket: String,
    keys: Vec<String>,
    ring: Arc<SlotRing>,
    assignments: mpsc::Sender<Assignment>,
    shutdown: CancellationToken,
) {
    debug_assert!(!keys.is_empty());

    let mut slot = 0;
    let mut index = 0;
    let mut cycle: u64 = 0;
    loop {
        if index == 0 {
            if cycle > 0 {
                info!(bucket = %bucket, cycle, "starting new replay cycle");
            }
            cycle += 1;
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ring.slot(slot).claim() => {}
        }

        let assignment = Assignment {
            key: keys[index].clone(),
            slot,
        };
        tokio::select! {
            _ = shutdown.cancelled() => break,
            sent = assignments.send(assignment) => {
                if sent.is_err() {
                    // All workers are gone; nothing left to feed.
                    break;
                }
            }
        }

        slot = (slot + 1) % ring.len();
        index = (index + 1) % keys.len();
    }

    info!(bucket = %bucket, "feeder stopped");
}
