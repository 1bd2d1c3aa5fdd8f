//! Routine and combo definitions.
//!
//! Built-in routines and combos are process-wide constants. Custom ones are
//! created through [`RoutineDraft`] / [`ComboDraft`], validated up front and
//! stored by the [`Database`](crate::storage::Database). Once loaded into a
//! [`Catalog`] they are read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::timer::PhaseKey;

pub const MAX_NAME_LEN: usize = 50;
pub const MIN_DURATION_MIN: u32 = 1;
pub const MAX_DURATION_MIN: u32 = 180;
pub const MAX_PHASE_SECS: f64 = 120.0;
/// Shortest nonzero phase the engine can time.
pub const MIN_PHASE_SECS: f64 = 0.1;

/// A named four-phase breathing pattern with a target total duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    /// Phase durations in seconds.
    pub inhale: f64,
    pub hold_in: f64,
    pub exhale: f64,
    pub hold_out: f64,
    /// Display label overrides keyed by phase.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub phase_labels: BTreeMap<PhaseKey, String>,
}

impl Routine {
    /// Target duration in seconds.
    pub fn target_secs(&self) -> f64 {
        f64::from(self.duration_minutes) * 60.0
    }

    pub fn target_ms(&self) -> u64 {
        u64::from(self.duration_minutes).saturating_mul(60_000)
    }

    pub fn phase_secs(&self, key: PhaseKey) -> f64 {
        match key {
            PhaseKey::In => self.inhale,
            PhaseKey::HoldIn => self.hold_in,
            PhaseKey::Out => self.exhale,
            PhaseKey::HoldOut => self.hold_out,
        }
    }

    /// One full inhale/hold/exhale/hold cycle in seconds.
    pub fn cycle_secs(&self) -> f64 {
        self.inhale + self.hold_in + self.exhale + self.hold_out
    }

    /// Short "4-7-8-0" style pattern string.
    pub fn pattern(&self) -> String {
        [self.inhale, self.hold_in, self.exhale, self.hold_out]
            .iter()
            .map(|s| format_secs(*s))
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn is_builtin(&self) -> bool {
        is_builtin_routine(&self.id)
    }
}

fn format_secs(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{secs:.1}")
    }
}

/// An ordered sequence of routines run back-to-back as one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combo {
    pub id: String,
    pub name: String,
    /// Member routine ids, resolved against the catalog at run time.
    pub routines: Vec<String>,
    #[serde(default)]
    pub transition_sound: Option<String>,
}

impl Combo {
    pub fn is_builtin(&self) -> bool {
        is_builtin_combo(&self.id)
    }
}

/// Routines and combos available to a session, built-ins first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    routines: Vec<Routine>,
    combos: Vec<Combo>,
}

impl Catalog {
    pub fn new(routines: Vec<Routine>, combos: Vec<Combo>) -> Self {
        Self { routines, combos }
    }

    pub fn builtin() -> Self {
        Self {
            routines: builtin_routines(),
            combos: builtin_combos(),
        }
    }

    /// Append user-defined routines after the built-ins.
    pub fn with_custom_routines(mut self, custom: Vec<Routine>) -> Self {
        self.routines.extend(custom);
        self
    }

    pub fn with_custom_combos(mut self, custom: Vec<Combo>) -> Self {
        self.combos.extend(custom);
        self
    }

    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }

    pub fn combos(&self) -> &[Combo] {
        &self.combos
    }

    pub fn routine(&self, id: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.id == id)
    }

    pub fn combo(&self, id: &str) -> Option<&Combo> {
        self.combos.iter().find(|c| c.id == id)
    }

    /// Sum of member targets in seconds. Unknown members contribute nothing.
    pub fn combo_target_secs(&self, combo: &Combo) -> f64 {
        combo
            .routines
            .iter()
            .filter_map(|id| self.routine(id))
            .map(Routine::target_secs)
            .sum()
    }
}

// ── Drafts ───────────────────────────────────────────────────────────

/// User input for a custom routine, not yet validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutineDraft {
    pub name: String,
    pub duration_minutes: u32,
    pub inhale: f64,
    pub hold_in: f64,
    pub exhale: f64,
    pub hold_out: f64,
    #[serde(default)]
    pub phase_labels: BTreeMap<PhaseKey, String>,
}

impl RoutineDraft {
    /// Validate and mint a routine with a fresh `custom-` id.
    ///
    /// # Errors
    /// Returns the first rule the draft violates. Nothing is created on error.
    pub fn validate(self) -> Result<Routine, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::InvalidName { max: MAX_NAME_LEN });
        }
        if !(MIN_DURATION_MIN..=MAX_DURATION_MIN).contains(&self.duration_minutes) {
            return Err(ValidationError::DurationOutOfRange {
                min: MIN_DURATION_MIN,
                max: MAX_DURATION_MIN,
                got: self.duration_minutes,
            });
        }
        for (key, secs) in [
            (PhaseKey::In, self.inhale),
            (PhaseKey::HoldIn, self.hold_in),
            (PhaseKey::Out, self.exhale),
            (PhaseKey::HoldOut, self.hold_out),
        ] {
            let timed = secs == 0.0 || (MIN_PHASE_SECS..=MAX_PHASE_SECS).contains(&secs);
            if !secs.is_finite() || !timed {
                return Err(ValidationError::PhaseOutOfRange {
                    phase: key.as_str().to_string(),
                    min: MIN_PHASE_SECS,
                    max: MAX_PHASE_SECS,
                    got: secs,
                });
            }
        }
        if self.inhale + self.hold_in + self.exhale + self.hold_out <= 0.0 {
            return Err(ValidationError::NoActivePhase);
        }

        let phase_labels = self
            .phase_labels
            .into_iter()
            .map(|(k, v)| (k, v.trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        Ok(Routine {
            id: format!("custom-{}", Uuid::new_v4()),
            name,
            duration_minutes: self.duration_minutes,
            inhale: self.inhale,
            hold_in: self.hold_in,
            exhale: self.exhale,
            hold_out: self.hold_out,
            phase_labels,
        })
    }
}

/// User input for a custom combo, not yet validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComboDraft {
    pub name: String,
    pub routines: Vec<String>,
    #[serde(default)]
    pub transition_sound: Option<String>,
}

impl ComboDraft {
    /// Validate against the catalog as it is now. Members can still
    /// disappear later, so the engine re-resolves them at run time.
    pub fn validate(self, catalog: &Catalog) -> Result<Combo, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::InvalidName { max: MAX_NAME_LEN });
        }
        if self.routines.is_empty() {
            return Err(ValidationError::EmptyCombo);
        }
        if let Some(missing) = self.routines.iter().find(|id| catalog.routine(id).is_none()) {
            return Err(ValidationError::UnknownRoutine(missing.clone()));
        }
        Ok(Combo {
            id: format!("combo-{}", Uuid::new_v4()),
            name,
            routines: self.routines,
            transition_sound: self.transition_sound.filter(|s| !s.trim().is_empty()),
        })
    }
}

// ── Built-ins ────────────────────────────────────────────────────────

const BUILTIN_ROUTINES: [(&str, &str, u32, [f64; 4]); 6] = [
    ("box", "Box Breathing", 5, [4.0, 4.0, 4.0, 4.0]),
    ("relax-478", "4-7-8 Relaxation", 6, [4.0, 7.0, 8.0, 0.0]),
    ("coherent", "Coherent Breathing", 10, [5.0, 0.0, 5.0, 0.0]),
    ("calm", "Calm Exhale", 6, [4.0, 0.0, 6.0, 0.0]),
    ("triangle", "Triangle Breathing", 5, [4.0, 4.0, 4.0, 0.0]),
    ("energize", "Energizing Breath", 3, [6.0, 2.0, 3.0, 0.0]),
];

pub fn builtin_routines() -> Vec<Routine> {
    BUILTIN_ROUTINES
        .iter()
        .map(|(id, name, minutes, [inhale, hold_in, exhale, hold_out])| {
            let mut phase_labels = BTreeMap::new();
            if *id == "energize" {
                phase_labels.insert(PhaseKey::HoldIn, "HOLD AT THE TOP".to_string());
            }
            Routine {
                id: (*id).to_string(),
                name: (*name).to_string(),
                duration_minutes: *minutes,
                inhale: *inhale,
                hold_in: *hold_in,
                exhale: *exhale,
                hold_out: *hold_out,
                phase_labels,
            }
        })
        .collect()
}

pub fn builtin_combos() -> Vec<Combo> {
    vec![
        Combo {
            id: "wind-down".into(),
            name: "Wind Down".into(),
            routines: vec!["calm".into(), "relax-478".into()],
            transition_sound: Some("bell".into()),
        },
        Combo {
            id: "focus-reset".into(),
            name: "Focus Reset".into(),
            routines: vec!["energize".into(), "box".into(), "coherent".into()],
            transition_sound: None,
        },
    ]
}

pub fn is_builtin_routine(id: &str) -> bool {
    BUILTIN_ROUTINES.iter().any(|(builtin, ..)| *builtin == id)
}

pub fn is_builtin_combo(id: &str) -> bool {
    builtin_combos().iter().any(|c| c.id == id)
}
