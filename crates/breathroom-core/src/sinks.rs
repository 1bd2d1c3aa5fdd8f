//! Contracts between the session engine and its collaborators.
//!
//! Rendering, audio and persistence live outside the core. The engine calls
//! these traits fire-and-forget: an `Err` is logged and otherwise ignored,
//! it never interrupts the phase loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Combo, Routine};
use crate::error::Result;
use crate::progress::{ProgressFrame, Segment};
use crate::timer::{PhaseKey, VisualTarget};

/// A sound the engine wants played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cue {
    /// Start of a phase.
    Phase(PhaseKey),
    /// One countdown second.
    Countdown,
    /// A combo moves to its next routine.
    Transition(String),
}

/// One finished session, as handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    pub actual_duration_secs: f64,
    pub total_target_secs: f64,
    pub completed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Source of routines and combos, built-ins first.
pub trait RoutineSource {
    fn all_routines(&self) -> Vec<Routine>;

    fn all_combos(&self) -> Vec<Combo> {
        Vec::new()
    }
}

pub trait CueSink {
    /// Play `cue`; `duration_hint_secs` is the length of the phase it opens.
    fn emit_cue(&mut self, _cue: &Cue, _duration_hint_secs: f64) -> Result<()> {
        Ok(()) // default no-op
    }
}

pub trait VisualSink {
    fn set_instruction(&mut self, _text: &str) -> Result<()> {
        Ok(()) // default no-op
    }

    fn set_visual_scale(&mut self, _target: VisualTarget, _transition_secs: f64) -> Result<()> {
        Ok(()) // default no-op
    }

    fn set_progress(&mut self, _frame: &ProgressFrame) -> Result<()> {
        Ok(()) // default no-op
    }

    /// Called once when a combo starts, with its fixed segment layout.
    fn set_track(&mut self, _segments: &[Segment]) -> Result<()> {
        Ok(()) // default no-op
    }
}

pub trait HistorySink {
    fn submit_history(&mut self, entry: &HistoryEntry) -> Result<()>;
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl CueSink for NullSink {}

impl VisualSink for NullSink {}

impl HistorySink for NullSink {
    fn submit_history(&mut self, _entry: &HistoryEntry) -> Result<()> {
        Ok(())
    }
}

impl RoutineSource for Catalog {
    fn all_routines(&self) -> Vec<Routine> {
        self.routines().to_vec()
    }

    fn all_combos(&self) -> Vec<Combo> {
        self.combos().to_vec()
    }
}

/// Everything a [`SessionEngine`](crate::timer::SessionEngine) talks to.
pub struct Collaborators {
    pub routines: Box<dyn RoutineSource>,
    pub cues: Box<dyn CueSink>,
    pub visual: Box<dyn VisualSink>,
    pub history: Box<dyn HistorySink>,
}

impl Collaborators {
    /// Built-in catalog with every sink discarding its input.
    pub fn headless() -> Self {
        Self::with_catalog(Catalog::builtin())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            routines: Box::new(catalog),
            cues: Box::new(NullSink),
            visual: Box::new(NullSink),
            history: Box::new(NullSink),
        }
    }
}
