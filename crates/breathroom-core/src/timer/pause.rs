//! Pause bookkeeping.
//!
//! Elapsed-time computations subtract [`PauseController::effective_ms`] from
//! raw clock deltas, so a paused interval never counts as practice time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseController {
    accumulated_ms: u64,
    started_at_ms: Option<u64>,
}

impl PauseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Begin a pause. Returns `false` when already paused.
    pub fn pause(&mut self, now_ms: u64) -> bool {
        if self.started_at_ms.is_some() {
            return false;
        }
        self.started_at_ms = Some(now_ms);
        true
    }

    /// End the current pause and fold it into the total. Returns the length
    /// of the pause that just ended, or `None` when not paused.
    pub fn resume(&mut self, now_ms: u64) -> Option<u64> {
        let started = self.started_at_ms.take()?;
        let span = now_ms.saturating_sub(started);
        self.accumulated_ms = self.accumulated_ms.saturating_add(span);
        Some(span)
    }

    /// Total paused time up to `now_ms`, including an ongoing pause.
    pub fn effective_ms(&self, now_ms: u64) -> u64 {
        let ongoing = self
            .started_at_ms
            .map(|started| now_ms.saturating_sub(started))
            .unwrap_or(0);
        self.accumulated_ms.saturating_add(ongoing)
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }
}
