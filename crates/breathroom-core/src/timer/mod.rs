//! Session timing: clock, phase sequencing, pause bookkeeping, the wakeup
//! scheduler and the engine that ties them together.

mod clock;
mod engine;
mod pause;
mod phase;
mod scheduler;

pub use clock::{ms_to_secs, secs_to_ms, Clock, ManualClock, SystemClock};
pub use engine::{EngineSettings, SessionEngine, SessionState, SessionTarget};
pub use pause::PauseController;
pub use phase::{
    advance, build_phases, Phase, PhaseKey, PhaseSequencer, VisualTarget, HOLD_TRANSITION_SECS,
};
pub use scheduler::{Scheduler, TaskHandle, Wakeup};
