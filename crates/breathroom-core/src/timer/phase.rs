//! Phase sequencing.
//!
//! A routine expands into at most four phases in the fixed order
//! inhale, hold-in, exhale, hold-out. Zero-length phases are dropped and
//! the remaining ones repeat circularly; only the session's time checks
//! ever end the cycle.

use serde::{Deserialize, Serialize};

use super::clock::secs_to_ms;
use crate::catalog::Routine;

/// Transition time for hold phases, which do not animate a size change.
pub const HOLD_TRANSITION_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PhaseKey {
    #[serde(rename = "in")]
    In,
    #[serde(rename = "holdIn")]
    HoldIn,
    #[serde(rename = "out")]
    Out,
    #[serde(rename = "holdOut")]
    HoldOut,
}

impl PhaseKey {
    pub const ORDER: [PhaseKey; 4] = [
        PhaseKey::In,
        PhaseKey::HoldIn,
        PhaseKey::Out,
        PhaseKey::HoldOut,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKey::In => "in",
            PhaseKey::HoldIn => "holdIn",
            PhaseKey::Out => "out",
            PhaseKey::HoldOut => "holdOut",
        }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            PhaseKey::In => "INHALE",
            PhaseKey::HoldIn | PhaseKey::HoldOut => "HOLD",
            PhaseKey::Out => "EXHALE",
        }
    }
}

/// Size the breathing visual moves towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualTarget {
    Expanded,
    Contracted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Display label.
    pub name: String,
    pub key: PhaseKey,
    /// Seconds.
    pub duration: f64,
}

impl Phase {
    pub fn duration_ms(&self) -> u64 {
        secs_to_ms(self.duration)
    }

    /// Where the visual goes and how long the transition takes.
    pub fn visual(&self) -> (VisualTarget, f64) {
        match self.key {
            PhaseKey::In => (VisualTarget::Expanded, self.duration),
            PhaseKey::HoldIn => (VisualTarget::Expanded, HOLD_TRANSITION_SECS),
            PhaseKey::Out => (VisualTarget::Contracted, self.duration),
            PhaseKey::HoldOut => (VisualTarget::Contracted, HOLD_TRANSITION_SECS),
        }
    }
}

/// Ordered phases of `routine`, without zero-length entries.
pub fn build_phases(routine: &Routine) -> Vec<Phase> {
    PhaseKey::ORDER
        .iter()
        .map(|key| Phase {
            name: routine
                .phase_labels
                .get(key)
                .cloned()
                .unwrap_or_else(|| key.default_label().to_string()),
            key: *key,
            duration: routine.phase_secs(*key),
        })
        .filter(|phase| phase.duration_ms() > 0)
        .collect()
}

/// Next index, wrapping to the first phase.
pub fn advance(phases: &[Phase], index: usize) -> usize {
    if phases.is_empty() {
        return 0;
    }
    (index + 1) % phases.len()
}

/// Tracks the active phase of one routine.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSequencer {
    phases: Vec<Phase>,
    index: usize,
    started_at_ms: u64,
}

impl PhaseSequencer {
    /// Start at the first phase. Returns `None` for a routine with no
    /// active phase.
    pub fn start(routine: &Routine, now_ms: u64) -> Option<Self> {
        let phases = build_phases(routine);
        if phases.is_empty() {
            return None;
        }
        Some(Self {
            phases,
            index: 0,
            started_at_ms: now_ms,
        })
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &Phase {
        &self.phases[self.index]
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub fn time_in_phase_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms)
    }

    /// Milliseconds left in the active phase; negative once overdue.
    pub fn remaining_ms(&self, now_ms: u64) -> i64 {
        self.current().duration_ms() as i64 - self.time_in_phase_ms(now_ms) as i64
    }

    pub fn is_phase_done(&self, now_ms: u64) -> bool {
        self.remaining_ms(now_ms) <= 0
    }

    /// Move to the next phase, restarting its clock at `now_ms`.
    pub fn advance(&mut self, now_ms: u64) -> &Phase {
        self.index = advance(&self.phases, self.index);
        self.started_at_ms = now_ms;
        self.current()
    }

    /// Push the phase start forward by a span spent paused.
    pub fn shift(&mut self, ms: u64) {
        self.started_at_ms = self.started_at_ms.saturating_add(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn routine(inhale: f64, hold_in: f64, exhale: f64, hold_out: f64) -> Routine {
        Routine {
            id: "t".into(),
            name: "Test".into(),
            duration_minutes: 1,
            inhale,
            hold_in,
            exhale,
            hold_out,
            phase_labels: BTreeMap::new(),
        }
    }

    #[test]
    fn zero_phases_are_dropped_in_order() {
        let phases = build_phases(&routine(4.0, 0.0, 6.0, 0.0));
        let keys: Vec<_> = phases.iter().map(|p| p.key).collect();
        assert_eq!(keys, vec![PhaseKey::In, PhaseKey::Out]);
        assert_eq!(phases[0].name, "INHALE");
        assert_eq!(phases[1].name, "EXHALE");
    }

    #[test]
    fn phases_too_short_to_time_are_dropped() {
        let phases = build_phases(&routine(0.0004, 0.0, 4.0, 0.0));
        let keys: Vec<_> = phases.iter().map(|p| p.key).collect();
        assert_eq!(keys, vec![PhaseKey::Out]);
        assert!(PhaseSequencer::start(&routine(0.0004, 0.0, 0.0004, 0.0), 0).is_none());
    }

    #[test]
    fn hold_in_label_override_is_verbatim() {
        let mut r = routine(4.0, 7.0, 8.0, 0.0);
        assert_eq!(build_phases(&r)[1].name, "HOLD");
        r.phase_labels.insert(PhaseKey::HoldIn, "Hold it, gently".into());
        assert_eq!(build_phases(&r)[1].name, "Hold it, gently");
    }

    #[test]
    fn advance_wraps_after_last_phase() {
        let phases = build_phases(&routine(4.0, 4.0, 4.0, 4.0));
        let mut index = 0;
        for _ in 0..4 {
            index = advance(&phases, index);
        }
        assert_eq!(index, 0);
        assert_eq!(advance(&phases, 3), 0);
    }

    #[test]
    fn hold_visuals_use_fixed_transition() {
        let phases = build_phases(&routine(4.0, 7.0, 8.0, 2.0));
        assert_eq!(phases[0].visual(), (VisualTarget::Expanded, 4.0));
        assert_eq!(phases[1].visual(), (VisualTarget::Expanded, HOLD_TRANSITION_SECS));
        assert_eq!(phases[2].visual(), (VisualTarget::Contracted, 8.0));
        assert_eq!(phases[3].visual(), (VisualTarget::Contracted, HOLD_TRANSITION_SECS));
    }

    #[test]
    fn sequencer_tracks_time_in_phase() {
        let mut seq = PhaseSequencer::start(&routine(4.0, 0.0, 6.0, 0.0), 1_000).unwrap();
        assert_eq!(seq.remaining_ms(3_000), 2_000);
        assert!(!seq.is_phase_done(4_999));
        assert!(seq.is_phase_done(5_000));

        let next = seq.advance(5_000).key;
        assert_eq!(next, PhaseKey::Out);
        assert_eq!(seq.time_in_phase_ms(6_000), 1_000);

        seq.shift(10_000);
        assert_eq!(seq.started_at_ms(), 15_000);
    }

    #[test]
    fn sequencer_rejects_empty_routine() {
        assert!(PhaseSequencer::start(&routine(0.0, 0.0, 0.0, 0.0), 0).is_none());
    }

    #[test]
    fn phase_key_serializes_with_short_names() {
        assert_eq!(serde_json::to_string(&PhaseKey::HoldIn).unwrap(), "\"holdIn\"");
        assert_eq!(serde_json::to_string(&PhaseKey::In).unwrap(), "\"in\"");
    }
}
