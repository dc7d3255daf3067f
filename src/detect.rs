//! Debounced structural-change detection.
//!
//! The host list renders item-by-item, so every insertion burst must collapse
//! into one enrichment pass. Each watched document gets its own detector with
//! a single-slot timer: a new mutation cancels the pending pass and
//! reschedules it after the quiet window, so at most one pass is ever pending
//! per document.

use std::time::{Duration, Instant};

/// Cancellable single-slot timer. `schedule` replaces any pending deadline;
/// `fire` reports (and consumes) a deadline that has elapsed.
#[derive(Debug, Default)]
pub struct SlotTimer {
    deadline: Option<Instant>,
}

impl SlotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Watches one document for structural mutations and schedules a debounced
/// enrichment pass.
#[derive(Debug)]
pub struct ChangeDetector {
    timer: SlotTimer,
    quiet: Duration,
    last_revision: u64,
}

impl ChangeDetector {
    pub fn new(quiet: Duration, initial_revision: u64) -> Self {
        Self {
            timer: SlotTimer::new(),
            quiet,
            last_revision: initial_revision,
        }
    }

    /// Observe the document's current revision. Any change since the last
    /// observation cancels the pending pass and schedules a new one after the
    /// quiet window.
    pub fn observe(&mut self, revision: u64, now: Instant) {
        if revision == self.last_revision {
            return;
        }
        self.last_revision = revision;
        self.timer.cancel();
        self.timer.schedule(now + self.quiet);
    }

    /// Whether a scheduled pass has come due. Consumes the slot.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.timer.fire(now)
    }

    /// Record the revision the pass ran against so enrichment-side mutations
    /// (annotations, processed markers) do not retrigger the detector.
    pub fn settle(&mut self, revision: u64) {
        self.last_revision = revision;
    }
}
