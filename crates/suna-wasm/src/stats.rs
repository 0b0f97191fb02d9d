//! Render-side counters.
//!
//! The render thread cannot log, so anything worth reporting is counted here
//! and read from the control side.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct BridgeStats {
    blocks: AtomicU64,
    messages: AtomicU64,
    traps: AtomicU64,
    dropped_events: AtomicU64,
    dropped_recycles: AtomicU64,
    ignored: AtomicU64,
}

/// Point-in-time copy of [`BridgeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// `process_block` calls made.
    pub blocks: u64,
    /// Control messages applied.
    pub messages: u64,
    /// Module traps caught on the render thread.
    pub traps: u64,
    /// Acknowledgments lost to a full event queue.
    pub dropped_events: u64,
    /// Messages freed on the render thread because the recycle queue was full.
    pub dropped_recycles: u64,
    /// Messages that arrived before the module was up, or named a missing export.
    pub ignored: u64,
}

impl BridgeStats {
    #[inline]
    pub(crate) fn block(&self) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn trap(&self) {
        self.traps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn dropped_event(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn dropped_recycle(&self) {
        self.dropped_recycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            blocks: self.blocks.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            traps: self.traps.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
            dropped_recycles: self.dropped_recycles.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }
}
