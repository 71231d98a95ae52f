//! The slot ring at the heart of the engine.
//!
//! Each slot is a reusable buffer entry cycling through three phases:
//! the feeder claims a `Free` slot, a downloader fills the `Filling`
//! slot, and the consumer drains the `Ready` slot back to `Free`. The
//! feeder and the consumer traverse the ring in the same round-robin
//! order, so objects are handed over in assignment order even when
//! downloads complete out of order.
//!
//! Every transition has exactly one producer and one awaiter: only the
//! feeder waits for `Free`, only the consumer waits for `Ready`, and
//! each is signaled by exactly one other role. With a single waiter per
//! [`Notify`], a `notify_one` that arrives before the waiter registers
//! is stored as a permit, so wakeups cannot be lost.

use std::sync::Mutex;

use tokio::sync::Notify;

/// Lifecycle phase of a [`Slot`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    /// The previous contents have been consumed; the feeder may claim
    /// the slot for the next assignment.
    Free,
    /// Claimed by the feeder; a downloader is about to fill it.
    Filling,
    /// Holds a completed download the consumer has not drained yet.
    Ready,
}

#[derive(Debug)]
struct SlotState {
    phase: Phase,
    name: String,
    size: u64,
}

/// One reusable buffer entry of the ring.
#[derive(Debug)]
pub(crate) struct Slot {
    state: Mutex<SlotState>,
    /// Signaled on the transition to `Ready`; awaited by the consumer.
    ready: Notify,
    /// Signaled on the transition to `Free`; awaited by the feeder.
    free: Notify,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                phase: Phase::Free,
                name: String::new(),
                size: 0,
            }),
            ready: Notify::new(),
            free: Notify::new(),
        }
    }

    /// Claims the slot for the next assignment, waiting for the
    /// consumer to drain the previous contents first.
    ///
    /// Cancel-safe: the transition happens under the lock, never across
    /// an await point.
    pub(crate) async fn claim(&self) {
        loop {
            let notified = self.free.notified();
            {
                let mut state = self.state.lock().unwrap();
                if state.phase == Phase::Free {
                    state.phase = Phase::Filling;
                    return;
                }
            }
            notified.await;
        }
    }

    /// Publishes a completed download, releasing the slot to the
    /// consumer.
    ///
    /// Panics if the slot was not previously claimed. The engine routes
    /// exactly one downloader to each claimed slot, so this is
    /// unreachable through the public API.
    pub(crate) fn fill(&self, name: String, size: u64) {
        let mut state = self.state.lock().unwrap();
        assert_eq!(state.phase, Phase::Filling, "slot filled out of turn");
        state.name = name;
        state.size = size;
        state.phase = Phase::Ready;
        drop(state);

        self.ready.notify_one();
    }

    /// Drains the slot, waiting for a downloader to publish data, and
    /// releases it back to the feeder.
    pub(crate) async fn take(&self) -> (String, u64) {
        loop {
            let notified = self.ready.notified();
            {
                let mut state = self.state.lock().unwrap();
                if state.phase == Phase::Ready {
                    let name = std::mem::take(&mut state.name);
                    let size = state.size;
                    state.phase = Phase::Free;
                    drop(state);

                    self.free.notify_one();
                    return (name, size);
                }
            }
            notified.await;
        }
    }
}

/// Fixed ring of [`Slot`]s, allocated once for the process lifetime.
#[derive(Debug)]
pub(crate) struct SlotRing {
    slots: Box<[Slot]>,
}

impl SlotRing {
    pub(crate) fn new(len: usize) -> Self {
        assert!(len >= 1, "ring must hold at least one slot");
        let slots = (0..len).map(|_| Slot::new()).collect();
        Self { slots }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn handshake_cycles_through_phases() {
        let slot = Slot::new();

        slot.claim().await;
        slot.fill("first".into(), 42);
        assert_eq!(slot.take().await, ("first".into(), 42));

        // The slot is reusable after a full cycle.
        slot.claim().await;
        slot.fill("second".into(), 0);
        assert_eq!(slot.take().await, ("second".into(), 0));
    }

    #[tokio::test]
    async fn take_waits_for_fill() {
        let slot = Slot::new();
        slot.claim().await;

        let mut take = Box::pin(slot.take());
        assert!(futures::poll!(&mut take).is_pending());

        slot.fill("key".into(), 1);
        assert_eq!(futures::poll!(&mut take), std::task::Poll::Ready(("key".into(), 1)));
    }

    #[tokio::test]
    async fn claim_waits_for_consumer() {
        let slot = Slot::new();
        slot.claim().await;
        slot.fill("key".into(), 1);

        // The last download has not been consumed yet.
        let mut claim = Box::pin(slot.claim());
        assert!(futures::poll!(&mut claim).is_pending());

        let _ = slot.take().await;
        assert!(futures::poll!(&mut claim).is_ready());
    }

    #[tokio::test]
    #[should_panic(expected = "slot filled out of turn")]
    async fn filling_an_unclaimed_slot_panics() {
        let slot = Slot::new();
        slot.fill("key".into(), 1);
    }

    #[tokio::test]
    async fn out_of_order_fills_drain_in_ring_order() {
        let ring = SlotRing::new(2);
        ring.slot(0).claim().await;
        ring.slot(1).claim().await;

        // The second download finishes first.
        ring.slot(1).fill("second".into(), 2);
        ring.slot(0).fill("first".into(), 1);

        assert_eq!(ring.slot(0).take().await.0, "first");
        assert_eq!(ring.slot(1).take().await.0, "second");
    }

    /// Feeder, downloader and consumer race on one slot across many
    /// cycles; strict alternation means the consumer observes every
    /// value exactly once, in order.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn alternation_under_concurrent_roles() {
        const CYCLES: u64 = 1_000;

        let slot = Arc::new(Slot::new());
        let (tx, mut rx) = mpsc::channel::<u64>(1);

        let feeder = {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move {
                for i in 0..CYCLES {
                    slot.claim().await;
                    tx.send(i).await.unwrap();
                }
            })
        };
        let downloader = {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move {
                while let Some(i) = rx.recv().await {
                    slot.fill(format!("obj-{i}"), i);
                }
            })
        };
        let consumer = {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move {
                for i in 0..CYCLES {
                    let (name, size) = slot.take().await;
                    assert_eq!(size, i);
                    assert_eq!(name, format!("obj-{i}"));
                }
            })
        };

        feeder.await.unwrap();
        downloader.await.unwrap();
        consumer.await.unwrap();
    }

    #[test]
    fn ring_allocates_requested_slots() {
        assert_eq!(SlotRing::new(4).len(), 4);
    }

    #[test]
    #[should_panic(expected = "at least one slot")]
    fn empty_ring_is_rejected() {
        SlotRing::new(0);
    }
}
