//! Session engine.
//!
//! The session engine is a clock-driven state machine. It does not use
//! internal threads - the host calls `pump()` from its frame loop and may
//! sleep until `next_wakeup_ms()` in between.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Countdown -> Running <-> Paused
//!                        |  ^
//!                        v  |
//!                   Transitioning      (combo only)
//!
//! any active state -> stop -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(SystemClock::new(), settings, collaborators);
//! engine.start(SessionTarget::Routine("box".into()))?;
//! // In a loop:
//! for event in engine.pump() { /* render */ }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::clock::{ms_to_secs, Clock};
use super::pause::PauseController;
use super::phase::{PhaseSequencer, VisualTarget, HOLD_TRANSITION_SECS};
use super::scheduler::{Scheduler, TaskHandle, Wakeup};
use crate::catalog::{Combo, Routine};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::progress::{project, ProgressFrame, SegmentedTrack, DEFAULT_PALETTE};
use crate::sinks::{Collaborators, Cue, HistoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Countdown,
    Running,
    Paused,
    /// Between two combo routines; the display stays frozen.
    Transitioning,
}

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum SessionTarget {
    Routine(String),
    Combo(String),
}

/// Timing constants of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Number of one-second countdown ticks before the first phase.
    pub countdown_ticks: u32,
    pub countdown_interval_ms: u64,
    /// Pause between two routines of a combo.
    pub transition_pause_ms: u64,
    /// Sessions at or below this length are not saved.
    pub min_history_ms: u64,
    pub frame_interval_ms: u64,
    pub palette: Vec<String>,
    /// Used when a combo has no transition sound of its own.
    pub default_transition_sound: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            countdown_interval_ms: 1_000,
            transition_pause_ms: 2_000,
            min_history_ms: 5_000,
            frame_interval_ms: 16,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            default_transition_sound: None,
        }
    }
}

#[derive(Debug, Clone)]
struct ComboRun {
    combo: Combo,
    index: usize,
    started_at_ms: u64,
    total_target_ms: u64,
    track: SegmentedTrack,
}

#[derive(Debug, Clone)]
struct Session {
    name: String,
    routine: Routine,
    combo: Option<ComboRun>,
    countdown_remaining: u32,
    started_at_ms: Option<u64>,
    routine_started_at_ms: u64,
    /// Paused time already spent when the current routine began.
    routine_pause_base_ms: u64,
    pause: PauseController,
    phases: Option<PhaseSequencer>,
    /// Resolved during combo-advance, installed when the pause ends.
    next_routine: Option<Routine>,
    progress: ProgressFrame,
}

impl Session {
    fn elapsed_routine_ms(&self, now_ms: u64) -> u64 {
        if self.started_at_ms.is_none() {
            return 0;
        }
        let paused_in_routine = self
            .pause
            .effective_ms(now_ms)
            .saturating_sub(self.routine_pause_base_ms);
        now_ms
            .saturating_sub(self.routine_started_at_ms)
            .saturating_sub(paused_in_routine)
    }

    fn elapsed_total_ms(&self, now_ms: u64) -> u64 {
        let Some(started) = self.started_at_ms else {
            return 0;
        };
        let origin = self.combo.as_ref().map_or(started, |c| c.started_at_ms);
        now_ms
            .saturating_sub(origin)
            .saturating_sub(self.pause.effective_ms(now_ms))
    }

    fn total_target_ms(&self) -> u64 {
        self.combo
            .as_ref()
            .map_or_else(|| self.routine.target_ms(), |c| c.total_target_ms)
    }

    fn progress_at(&self, now_ms: u64) -> ProgressFrame {
        let routine_secs = ms_to_secs(self.elapsed_routine_ms(now_ms));
        let total_secs = ms_to_secs(self.elapsed_total_ms(now_ms));
        let target_secs = ms_to_secs(self.total_target_ms());
        let percent = project(total_secs, target_secs);
        match &self.combo {
            Some(run) => run.track.frame(percent, routine_secs, total_secs, target_secs),
            None => ProgressFrame {
                percent,
                fill: None,
                marker_pct: None,
                elapsed_routine_secs: routine_secs,
                elapsed_total_secs: total_secs,
                total_target_secs: target_secs,
            },
        }
    }
}

/// Drives one routine or combo from countdown to history entry.
pub struct SessionEngine<C: Clock> {
    clock: C,
    settings: EngineSettings,
    collab: Collaborators,
    scheduler: Scheduler,
    state: SessionState,
    session: Option<Session>,
    pending: Option<TaskHandle>,
}

impl<C: Clock> SessionEngine<C> {
    pub fn new(clock: C, mut settings: EngineSettings, collab: Collaborators) -> Self {
        // A zero interval would re-arm the frame at the same instant forever.
        settings.frame_interval_ms = settings.frame_interval_ms.max(1);
        Self {
            clock,
            settings,
            collab,
            scheduler: Scheduler::new(),
            state: SessionState::Idle,
            session: None,
            pending: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn current_routine(&self) -> Option<&Routine> {
        self.session.as_ref().map(|s| &s.routine)
    }

    pub fn current_phase(&self) -> Option<&super::phase::Phase> {
        self.session
            .as_ref()
            .and_then(|s| s.phases.as_ref())
            .map(PhaseSequencer::current)
    }

    pub fn combo_index(&self) -> Option<usize> {
        self.session
            .as_ref()
            .and_then(|s| s.combo.as_ref())
            .map(|c| c.index)
    }

    /// Progress as last reported to the visual sink.
    pub fn progress(&self) -> Option<&ProgressFrame> {
        self.session.as_ref().map(|s| &s.progress)
    }

    /// When the host should call `pump()` next.
    pub fn next_wakeup_ms(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let now = self.clock.now_ms();
        let session = self.session.as_ref();
        let phases = session.and_then(|s| s.phases.as_ref());
        let progress = session.map(|s| s.progress_at(now));
        Event::StateSnapshot {
            state: self.state,
            name: session.map(|s| s.name.clone()),
            routine_id: session.map(|s| s.routine.id.clone()),
            combo_index: self.combo_index(),
            phase_key: phases.map(|p| p.current().key),
            phase_label: phases.map(|p| p.current().name.clone()),
            phase_remaining_secs: session
                .zip(phases)
                .map(|(s, p)| {
                    // The phase start only shifts on resume; hold it still meanwhile.
                    let ongoing = s.pause.effective_ms(now) - s.pause.accumulated_ms();
                    (p.remaining_ms(now) + ongoing as i64).max(0) as f64 / 1000.0
                })
                .unwrap_or(0.0),
            elapsed_total_secs: progress.as_ref().map_or(0.0, |p| p.elapsed_total_secs),
            total_target_secs: progress.as_ref().map_or(0.0, |p| p.total_target_secs),
            progress_pct: progress.as_ref().map_or(0.0, |p| p.percent),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the countdown for `target`.
    ///
    /// Returns `Ok(None)` when a session is already active (nothing changes).
    ///
    /// # Errors
    /// Returns an error if the routine or combo is unknown, or if a combo's
    /// first member cannot be resolved.
    pub fn start(&mut self, target: SessionTarget) -> Result<Option<Event>> {
        if self.session.is_some() {
            tracing::debug!("start rejected: a session is already active");
            return Ok(None);
        }

        let routines = self.collab.routines.all_routines();
        let find = |id: &str| {
            routines
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .ok_or_else(|| CoreError::RoutineNotFound { id: id.to_string() })
        };

        let (name, routine, combo) = match target {
            SessionTarget::Routine(id) => {
                let routine = find(&id)?;
                (routine.name.clone(), routine, None)
            }
            SessionTarget::Combo(id) => {
                let combo = self
                    .collab
                    .routines
                    .all_combos()
                    .into_iter()
                    .find(|c| c.id == id)
                    .ok_or(CoreError::ComboNotFound { id })?;
                let first = combo
                    .routines
                    .first()
                    .ok_or(ValidationError::EmptyCombo)?;
                let routine = find(first)?;

                // Segments are fixed here; a member that no longer exists
                // gets no width and aborts the session when its turn comes.
                let durations: Vec<(String, f64)> = combo
                    .routines
                    .iter()
                    .map(|id| {
                        let secs = routines
                            .iter()
                            .find(|r| &r.id == id)
                            .map_or(0.0, Routine::target_secs);
                        (id.clone(), secs)
                    })
                    .collect();
                let total_target_ms = combo
                    .routines
                    .iter()
                    .filter_map(|id| routines.iter().find(|r| &r.id == id))
                    .map(Routine::target_ms)
                    .sum();
                let run = ComboRun {
                    track: SegmentedTrack::new(&durations, &self.settings.palette),
                    index: 0,
                    started_at_ms: 0,
                    total_target_ms,
                    combo,
                };
                (run.combo.name.clone(), routine, Some(run))
            }
        };

        let now = self.clock.now_ms();
        let ticks = self.settings.countdown_ticks;
        tracing::info!(session = %name, routine = %routine.id, "starting countdown");

        self.session = Some(Session {
            name: name.clone(),
            routine,
            combo,
            countdown_remaining: ticks,
            started_at_ms: None,
            routine_started_at_ms: now,
            routine_pause_base_ms: 0,
            pause: PauseController::new(),
            phases: None,
            next_routine: None,
            progress: ProgressFrame::empty(),
        });
        self.state = SessionState::Countdown;

        if ticks > 0 {
            self.show_countdown(ticks);
            self.arm(Wakeup::Countdown, now + self.settings.countdown_interval_ms);
        } else {
            self.arm(Wakeup::Countdown, now);
        }

        Ok(Some(Event::CountdownStarted {
            name,
            ticks,
            at: Utc::now(),
        }))
    }

    /// Freeze the session. No-op unless running.
    pub fn pause(&mut self) -> Option<Event> {
        if self.state != SessionState::Running {
            return None;
        }
        let now = self.clock.now_ms();
        let session = self.session.as_mut()?;
        if !session.pause.pause(now) {
            return None;
        }
        self.state = SessionState::Paused;
        log_sink(self.collab.visual.set_instruction("PAUSED"), "visual");
        tracing::info!("session paused");
        Some(Event::SessionPaused {
            elapsed_total_secs: ms_to_secs(session.elapsed_total_ms(now)),
            at: Utc::now(),
        })
    }

    /// Continue a paused session. No-op unless paused.
    pub fn resume(&mut self) -> Option<Event> {
        if self.state != SessionState::Paused {
            return None;
        }
        let now = self.clock.now_ms();
        let session = self.session.as_mut()?;
        let span = session.pause.resume(now)?;
        // The active phase keeps the time it had left when paused.
        if let Some(phases) = session.phases.as_mut() {
            phases.shift(span);
            log_sink(
                self.collab.visual.set_instruction(&phases.current().name),
                "visual",
            );
        }
        self.state = SessionState::Running;
        tracing::info!(paused_ms = span, "session resumed");
        Some(Event::SessionResumed {
            paused_secs: ms_to_secs(span),
            at: Utc::now(),
        })
    }

    /// End the session now. A user-initiated stop is never `completed`.
    /// Returns `None` when idle, so a second stop is harmless.
    pub fn stop(&mut self, user_initiated: bool) -> Option<Event> {
        let now = self.clock.now_ms();
        self.finish(!user_initiated, now)
    }

    /// Fire every wakeup that is due and return what happened.
    ///
    /// A failing step is logged and ends the session as incomplete; errors
    /// never escape to the host.
    pub fn pump(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        while let Some((handle, wakeup)) = self.scheduler.pop_due(now) {
            if self.pending == Some(handle) {
                self.pending = None;
            }
            let result = match wakeup {
                Wakeup::Countdown => self.on_countdown(now, &mut events),
                Wakeup::Frame => self.on_frame(now, &mut events),
                Wakeup::TransitionEnd => self.on_transition_end(now, &mut events),
            };
            if let Err(e) = result {
                tracing::error!(error = %e, "session step failed, stopping as incomplete");
                events.extend(self.finish(false, now));
            }
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn arm(&mut self, wakeup: Wakeup, due_ms: u64) {
        if let Some(old) = self.pending.take() {
            self.scheduler.cancel(old);
        }
        self.pending = Some(self.scheduler.schedule(wakeup, due_ms));
    }

    fn show_countdown(&mut self, remaining: u32) {
        tracing::debug!(remaining, "countdown");
        log_sink(
            self.collab
                .visual
                .set_instruction(&format!("STARTING IN {remaining}…")),
            "visual",
        );
        log_sink(self.collab.cues.emit_cue(&Cue::Countdown, 1.0), "cue");
    }

    fn on_countdown(&mut self, now: u64, events: &mut Vec<Event>) -> Result<()> {
        if self.state != SessionState::Countdown {
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.countdown_remaining = session.countdown_remaining.saturating_sub(1);
        let remaining = session.countdown_remaining;
        if remaining > 0 {
            self.show_countdown(remaining);
            self.arm(Wakeup::Countdown, now + self.settings.countdown_interval_ms);
            events.push(Event::CountdownTick {
                remaining,
                at: Utc::now(),
            });
            return Ok(());
        }
        self.begin_running(now, events)
    }

    fn begin_running(&mut self, now: u64, events: &mut Vec<Event>) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.started_at_ms = Some(now);
        session.routine_started_at_ms = now;
        session.routine_pause_base_ms = 0;
        session.phases = Some(start_phases(&session.routine, now)?);
        if let Some(run) = session.combo.as_mut() {
            run.started_at_ms = now;
            log_sink(self.collab.visual.set_track(run.track.segments()), "visual");
        }
        self.state = SessionState::Running;

        tracing::info!(session = %session.name, "session running");
        events.push(Event::SessionStarted {
            name: session.name.clone(),
            routine_id: session.routine.id.clone(),
            combo_id: session.combo.as_ref().map(|c| c.combo.id.clone()),
            total_target_secs: ms_to_secs(session.total_target_ms()),
            at: Utc::now(),
        });
        events.extend(announce_phase(&mut self.collab, session));
        self.arm(Wakeup::Frame, now);
        Ok(())
    }

    fn on_frame(&mut self, now: u64, events: &mut Vec<Event>) -> Result<()> {
        match self.state {
            SessionState::Paused => {
                self.arm(Wakeup::Frame, now + self.settings.frame_interval_ms);
                return Ok(());
            }
            SessionState::Running => {}
            _ => return Ok(()),
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        // A phase boundary reached after the routine's target is the end
        // of the routine, not the start of another phase.
        let routine_due = session.elapsed_routine_ms(now) >= session.routine.target_ms();
        let phase_done = match session.phases.as_ref() {
            Some(phases) => phases.is_phase_done(now),
            None => return Err(CoreError::Custom("running session has no phases".into())),
        };
        if phase_done && !routine_due {
            if let Some(phases) = session.phases.as_mut() {
                phases.advance(now);
            }
            events.extend(announce_phase(&mut self.collab, session));
        }

        session.progress = session.progress_at(now);
        log_sink(self.collab.visual.set_progress(&session.progress), "visual");

        if routine_due && phase_done {
            return self.finish_routine(now, events);
        }
        self.arm(Wakeup::Frame, now + self.settings.frame_interval_ms);
        Ok(())
    }

    fn finish_routine(&mut self, now: u64, events: &mut Vec<Event>) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let has_next = session
            .combo
            .as_ref()
            .is_some_and(|run| run.index + 1 < run.combo.routines.len());
        if !has_next {
            events.extend(self.finish(true, now));
            return Ok(());
        }

        let finished_id = session.routine.id.clone();
        let Some(run) = session.combo.as_mut() else {
            return Ok(());
        };
        events.push(Event::RoutineFinished {
            routine_id: finished_id,
            combo_index: run.index,
            at: Utc::now(),
        });
        run.index += 1;
        let next_id = run.combo.routines[run.index].clone();
        let sound = run
            .combo
            .transition_sound
            .clone()
            .or_else(|| self.settings.default_transition_sound.clone());

        let next = self
            .collab
            .routines
            .all_routines()
            .into_iter()
            .find(|r| r.id == next_id)
            .ok_or(CoreError::RoutineNotFound { id: next_id })?;

        tracing::info!(next = %next.id, "routine finished, advancing combo");
        if let Some(sound) = sound {
            log_sink(
                self.collab.cues.emit_cue(
                    &Cue::Transition(sound),
                    ms_to_secs(self.settings.transition_pause_ms),
                ),
                "cue",
            );
        }
        session.next_routine = Some(next);
        self.state = SessionState::Transitioning;
        self.arm(Wakeup::TransitionEnd, now + self.settings.transition_pause_ms);
        Ok(())
    }

    fn on_transition_end(&mut self, now: u64, events: &mut Vec<Event>) -> Result<()> {
        if self.state != SessionState::Transitioning {
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let routine = session
            .next_routine
            .take()
            .ok_or_else(|| CoreError::Custom("combo transition without a next routine".into()))?;
        session.phases = Some(start_phases(&routine, now)?);
        session.routine = routine;
        session.routine_started_at_ms = now;
        session.routine_pause_base_ms = session.pause.effective_ms(now);
        self.state = SessionState::Running;

        events.push(Event::ComboAdvanced {
            combo_index: session.combo.as_ref().map_or(0, |c| c.index),
            routine_id: session.routine.id.clone(),
            at: Utc::now(),
        });
        events.extend(announce_phase(&mut self.collab, session));
        self.arm(Wakeup::Frame, now);
        Ok(())
    }

    /// Cancel pending work, save history if long enough, reset to idle.
    fn finish(&mut self, completed: bool, now: u64) -> Option<Event> {
        let session = self.session.take()?;
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
        self.scheduler.cancel_all();
        self.state = SessionState::Idle;

        let actual_ms = session.started_at_ms.map_or(0, |started| {
            now.saturating_sub(started)
                .saturating_sub(session.pause.effective_ms(now))
        });
        let actual_secs = ms_to_secs(actual_ms);
        let target_secs = ms_to_secs(session.total_target_ms());

        let mut history_saved = false;
        if actual_ms > self.settings.min_history_ms {
            let entry = HistoryEntry {
                name: session.name.clone(),
                actual_duration_secs: actual_secs,
                total_target_secs: target_secs,
                completed,
                timestamp: Utc::now(),
            };
            match self.collab.history.submit_history(&entry) {
                Ok(()) => {
                    history_saved = true;
                    tracing::info!(session = %entry.name, secs = actual_secs, completed, "history saved");
                }
                Err(e) => tracing::warn!(error = %e, "failed to save session history"),
            }
        } else {
            tracing::debug!(secs = actual_secs, "session too short, history discarded");
        }

        let message = if completed {
            "SESSION COMPLETE"
        } else {
            "SESSION STOPPED"
        };
        log_sink(self.collab.visual.set_instruction(message), "visual");
        log_sink(
            self.collab
                .visual
                .set_visual_scale(VisualTarget::Contracted, HOLD_TRANSITION_SECS),
            "visual",
        );

        Some(Event::SessionStopped {
            name: session.name,
            actual_duration_secs: actual_secs,
            total_target_secs: target_secs,
            completed,
            history_saved,
            at: Utc::now(),
        })
    }
}

fn start_phases(routine: &Routine, now: u64) -> Result<PhaseSequencer> {
    PhaseSequencer::start(routine, now).ok_or(CoreError::Validation(ValidationError::NoActivePhase))
}

/// Push the active phase to the sinks.
fn announce_phase(collab: &mut Collaborators, session: &Session) -> Option<Event> {
    let phases = session.phases.as_ref()?;
    let phase = phases.current();
    let (target, transition_secs) = phase.visual();
    tracing::debug!(phase = phase.key.as_str(), secs = phase.duration, "phase");

    log_sink(collab.visual.set_instruction(&phase.name), "visual");
    log_sink(collab.cues.emit_cue(&Cue::Phase(phase.key), phase.duration), "cue");
    log_sink(collab.visual.set_visual_scale(target, transition_secs), "visual");

    Some(Event::PhaseChanged {
        routine_id: session.routine.id.clone(),
        phase_index: phases.index(),
        key: phase.key,
        label: phase.name.clone(),
        duration_secs: phase.duration,
        at: Utc::now(),
    })
}

fn log_sink(result: Result<()>, sink: &str) {
    if let Err(e) = result {
        tracing::warn!(sink, error = %e, "collaborator call failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::timer::clock::ManualClock;

    fn engine() -> (SessionEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let engine = SessionEngine::new(
            clock.clone(),
            EngineSettings::default(),
            Collaborators::with_catalog(Catalog::builtin()),
        );
        (engine, clock)
    }

    fn step(engine: &mut SessionEngine<ManualClock>, clock: &ManualClock, ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..ms / 100 {
            clock.advance_ms(100);
            events.extend(engine.pump());
        }
        events
    }

    #[test]
    fn countdown_runs_three_ticks_then_first_phase() {
        let (mut engine, clock) = engine();
        let started = engine.start(SessionTarget::Routine("calm".into())).unwrap();
        assert!(matches!(started, Some(Event::CountdownStarted { ticks: 3, .. })));
        assert_eq!(engine.state(), SessionState::Countdown);

        let events = step(&mut engine, &clock, 2_000);
        let ticks: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::CountdownTick { remaining, .. } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![2, 1]);
        assert_eq!(engine.state(), SessionState::Countdown);

        let events = step(&mut engine, &clock, 1_000);
        assert_eq!(engine.state(), SessionState::Running);
        assert!(events.iter().any(|e| matches!(e, Event::SessionStarted { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PhaseChanged { key: crate::timer::PhaseKey::In, .. })));
    }

    #[test]
    fn start_while_active_is_rejected() {
        let (mut engine, _clock) = engine();
        engine.start(SessionTarget::Routine("box".into())).unwrap();
        let again = engine.start(SessionTarget::Routine("calm".into())).unwrap();
        assert!(again.is_none());
        assert_eq!(engine.current_routine().unwrap().id, "box");
    }

    #[test]
    fn unknown_targets_are_errors() {
        let (mut engine, _clock) = engine();
        assert!(matches!(
            engine.start(SessionTarget::Routine("nope".into())),
            Err(CoreError::RoutineNotFound { .. })
        ));
        assert!(matches!(
            engine.start(SessionTarget::Combo("nope".into())),
            Err(CoreError::ComboNotFound { .. })
        ));
        assert_eq!(engine.state(), SessionState::Idle);
    }

    #[test]
    fn pause_and_resume_only_apply_in_matching_states() {
        let (mut engine, clock) = engine();
        assert!(engine.pause().is_none());
        assert!(engine.resume().is_none());

        engine.start(SessionTarget::Routine("calm".into())).unwrap();
        assert!(engine.pause().is_none(), "countdown cannot be paused");
        step(&mut engine, &clock, 3_000);

        assert!(engine.resume().is_none());
        assert!(engine.pause().is_some());
        assert!(engine.pause().is_none());
        assert_eq!(engine.state(), SessionState::Paused);
        assert!(engine.resume().is_some());
        assert_eq!(engine.state(), SessionState::Running);
    }

    #[test]
    fn phases_cycle_while_running() {
        let (mut engine, clock) = engine();
        engine.start(SessionTarget::Routine("calm".into())).unwrap();
        step(&mut engine, &clock, 3_000);

        let events = step(&mut engine, &clock, 10_000);
        let keys: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::PhaseChanged { key, .. } => Some(*key),
                _ => None,
            })
            .collect();
        assert_eq!(
            keys,
            vec![crate::timer::PhaseKey::Out, crate::timer::PhaseKey::In]
        );
    }

    #[test]
    fn stop_cancels_pending_work() {
        let (mut engine, clock) = engine();
        engine.start(SessionTarget::Routine("calm".into())).unwrap();
        step(&mut engine, &clock, 1_000);
        assert!(engine.stop(true).is_some());
        assert_eq!(engine.next_wakeup_ms(), None);

        let events = step(&mut engine, &clock, 5_000);
        assert!(events.is_empty(), "no stale tick after stop");
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(engine.stop(true).is_none());
    }

    #[test]
    fn snapshot_reports_phase_and_progress() {
        let (mut engine, clock) = engine();
        engine.start(SessionTarget::Routine("calm".into())).unwrap();
        step(&mut engine, &clock, 3_000 + 36_000);
        match engine.snapshot() {
            Event::StateSnapshot {
                state,
                routine_id,
                progress_pct,
                total_target_secs,
                ..
            } => {
                assert_eq!(state, SessionState::Running);
                assert_eq!(routine_id.as_deref(), Some("calm"));
                assert_eq!(total_target_secs, 360.0);
                assert!((progress_pct - 10.0).abs() < 1e-9);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[test]
    fn zero_countdown_starts_on_next_pump() {
        let clock = ManualClock::new();
        let settings = EngineSettings {
            countdown_ticks: 0,
            ..EngineSettings::default()
        };
        let mut engine = SessionEngine::new(clock.clone(), settings, Collaborators::headless());
        engine.start(SessionTarget::Routine("box".into())).unwrap();
        let events = engine.pump();
        assert_eq!(engine.state(), SessionState::Running);
        assert!(events.iter().any(|e| matches!(e, Event::SessionStarted { .. })));
    }

    #[test]
    fn zero_frame_interval_does_not_spin() {
        let clock = ManualClock::new();
        let settings = EngineSettings {
            countdown_ticks: 0,
            frame_interval_ms: 0,
            ..EngineSettings::default()
        };
        let mut engine = SessionEngine::new(clock.clone(), settings, Collaborators::headless());
        assert_eq!(engine.settings().frame_interval_ms, 1);

        engine.start(SessionTarget::Routine("box".into())).unwrap();
        engine.pump();
        assert_eq!(engine.state(), SessionState::Running);
        assert!(engine.next_wakeup_ms().unwrap() > clock.now_ms());

        clock.advance_ms(1);
        engine.pump();
        assert!(engine.pause().is_some());
        engine.pump();
        assert!(engine.next_wakeup_ms().unwrap() > clock.now_ms());
    }

    #[test]
    fn snapshot_holds_phase_remaining_while_paused() {
        let (mut engine, clock) = engine();
        engine.start(SessionTarget::Routine("calm".into())).unwrap();
        step(&mut engine, &clock, 3_000 + 1_000);
        assert!(engine.pause().is_some());
        step(&mut engine, &clock, 2_000);

        match engine.snapshot() {
            Event::StateSnapshot {
                state,
                phase_remaining_secs,
                ..
            } => {
                assert_eq!(state, SessionState::Paused);
                assert!((phase_remaining_secs - 3.0).abs() < 1e-9);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }

        assert!(engine.resume().is_some());
        step(&mut engine, &clock, 1_000);
        match engine.snapshot() {
            Event::StateSnapshot { phase_remaining_secs, .. } => {
                assert!((phase_remaining_secs - 2.0).abs() < 1e-9);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
