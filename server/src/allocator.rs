use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out upload ids, one per file accepted into the pipeline.
///
/// The counter lives as long as the process and starts from zero, so the
/// first id ever dispensed is `1`. It is shared between request tasks behind
/// an `Arc`; `next_id` never blocks.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts dispensing right after `last`.
    #[must_use]
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Last id dispensed, zero if none yet.
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}
