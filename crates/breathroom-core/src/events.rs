use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{PhaseKey, SessionState};

/// Every state change of a session produces an Event.
/// Hosts print or forward them; the engine never reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CountdownStarted {
        name: String,
        ticks: u32,
        at: DateTime<Utc>,
    },
    CountdownTick {
        remaining: u32,
        at: DateTime<Utc>,
    },
    SessionStarted {
        name: String,
        routine_id: String,
        combo_id: Option<String>,
        total_target_secs: f64,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        routine_id: String,
        phase_index: usize,
        key: PhaseKey,
        label: String,
        duration_secs: f64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_total_secs: f64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        paused_secs: f64,
        at: DateTime<Utc>,
    },
    /// A routine inside a combo reached its target; the next one follows
    /// after the transition pause.
    RoutineFinished {
        routine_id: String,
        combo_index: usize,
        at: DateTime<Utc>,
    },
    ComboAdvanced {
        combo_index: usize,
        routine_id: String,
        at: DateTime<Utc>,
    },
    SessionStopped {
        name: String,
        actual_duration_secs: f64,
        total_target_secs: f64,
        completed: bool,
        history_saved: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        name: Option<String>,
        routine_id: Option<String>,
        combo_index: Option<usize>,
        phase_key: Option<PhaseKey>,
        phase_label: Option<String>,
        phase_remaining_secs: f64,
        elapsed_total_secs: f64,
        total_target_secs: f64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}
