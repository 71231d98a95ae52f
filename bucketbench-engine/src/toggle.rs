//! Process-wide metric collection toggle.

use std::sync::atomic::{AtomicBool, Ordering};

/// Enables or disables metric collection at runtime without stopping
/// downloads, supporting an untimed warm-up before a timed measurement
/// window.
///
/// A plain atomic: the flag needs eventual visibility only, never
/// atomicity with the counters it gates.
#[derive(Debug, Default)]
pub(crate) struct MetricsToggle(AtomicBool);

impl MetricsToggle {
    pub(crate) fn enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }
}
