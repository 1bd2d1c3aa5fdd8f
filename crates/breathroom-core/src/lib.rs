//! # Breathroom Core Library
//!
//! This library provides the core logic for the Breathroom breathing
//! trainer: it runs a timed breathing routine (or a "combo" of routines)
//! as a repeating inhale / hold / exhale / hold cycle until a target
//! duration is reached, and records the result.
//!
//! ## Architecture
//!
//! - **Session Engine**: A clock-driven state machine. The host calls
//!   `pump()` from its frame loop; nothing runs on internal threads
//! - **Collaborators**: Rendering, audio and persistence are traits the host
//!   implements; their failures are logged and never stop a session
//! - **Storage**: SQLite-based history and custom catalog, TOML-based
//!   configuration, optional remote history endpoint
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Countdown, phase loop, pause, combo advance, stop
//! - [`Catalog`]: Built-in and custom routines and combos
//! - [`Database`]: History and catalog persistence
//! - [`Config`]: Application configuration management

pub mod catalog;
pub mod error;
pub mod events;
pub mod progress;
pub mod sinks;
pub mod storage;
pub mod timer;

pub use catalog::{Catalog, Combo, ComboDraft, Routine, RoutineDraft};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::Event;
pub use progress::{ProgressFrame, Segment, SegmentedTrack};
pub use sinks::{Collaborators, Cue, CueSink, HistoryEntry, HistorySink, NullSink, RoutineSource, VisualSink};
pub use storage::{Config, Database, RemoteHistory};
pub use timer::{
    Clock, EngineSettings, ManualClock, PhaseKey, SessionEngine, SessionState, SessionTarget,
    SystemClock, VisualTarget,
};
