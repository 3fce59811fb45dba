use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared "parameters changed" signal.
///
/// Every parameter write bumps a single atomic generation counter. Consumers
/// (the audio callback, the display timer) each hold a [`ChangeListener`]
/// that remembers the last generation it acted on, so a burst of writes
/// between two ticks collapses into one recompute and one consumer never
/// swallows a change meant for another.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    generation: Arc<AtomicU64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the parameters as changed. Safe to call from any thread.
    pub fn notify(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Registers a new consumer. The listener starts out pending so its
    /// first tick performs the initial recompute.
    pub fn subscribe(&self) -> ChangeListener {
        let current = self.generation.load(Ordering::Acquire);
        ChangeListener {
            generation: self.generation.clone(),
            seen: AtomicU64::new(current.wrapping_sub(1)),
        }
    }
}

/// One consumer's view of a [`ChangeNotifier`].
#[derive(Debug)]
pub struct ChangeListener {
    generation: Arc<AtomicU64>,
    seen: AtomicU64,
}

impl ChangeListener {
    /// Test-and-clear. Returns `true` to exactly one caller for every batch
    /// of notifications since the last successful call.
    pub fn consume(&self) -> bool {
        let current = self.generation.load(Ordering::Acquire);
        let seen = self.seen.load(Ordering::Acquire);
        if seen == current {
            return false;
        }
        self.seen
            .compare_exchange(seen, current, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_pending(&self) -> bool {
        self.seen.load(Ordering::Acquire) != self.generation.load(Ordering::Acquire)
    }

    /// Forces the next [`consume`](Self::consume) to report a change.
    pub fn mark_pending(&self) {
        let current = self.generation.load(Ordering::Acquire);
        self.seen.store(current.wrapping_sub(1), Ordering::Release);
    }
}
