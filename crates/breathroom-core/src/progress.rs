//! Progress projection.
//!
//! A single routine shows a flat bar. A combo shows a track split into one
//! colored segment per member routine, sized by duration; only the fill and
//! the marker move while the session runs.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PALETTE: [&str; 6] = [
    "#4f8cff", "#34c3a0", "#f5a623", "#b36bff", "#ff6b8b", "#5bc0eb",
];

/// Percent of `target_secs` covered by `elapsed_secs`, clamped to 0..=100.
pub fn project(elapsed_secs: f64, target_secs: f64) -> f64 {
    if !(target_secs > 0.0) || !elapsed_secs.is_finite() {
        return 0.0;
    }
    (100.0 * elapsed_secs / target_secs).clamp(0.0, 100.0)
}

/// One routine's slice of a combo track, in percent of the track width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub routine_id: String,
    pub color: String,
    pub start_pct: f64,
    pub width_pct: f64,
}

impl Segment {
    pub fn end_pct(&self) -> f64 {
        self.start_pct + self.width_pct
    }
}

/// Filled part of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillSpan {
    pub color: String,
    pub start_pct: f64,
    pub end_pct: f64,
}

/// What the visual sink draws each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressFrame {
    pub percent: f64,
    /// Per-segment fill for combos; `None` means a flat bar.
    pub fill: Option<Vec<FillSpan>>,
    /// Marker position for combos.
    pub marker_pct: Option<f64>,
    pub elapsed_routine_secs: f64,
    pub elapsed_total_secs: f64,
    pub total_target_secs: f64,
}

impl ProgressFrame {
    pub fn empty() -> Self {
        Self {
            percent: 0.0,
            fill: None,
            marker_pct: None,
            elapsed_routine_secs: 0.0,
            elapsed_total_secs: 0.0,
            total_target_secs: 0.0,
        }
    }

    pub fn remaining_secs(&self) -> f64 {
        (self.total_target_secs - self.elapsed_total_secs).max(0.0)
    }
}

/// Segment layout of a combo, fixed for the whole session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentedTrack {
    segments: Vec<Segment>,
}

impl SegmentedTrack {
    /// Lay out `(routine_id, seconds)` pairs, coloring them from `palette`
    /// by position. An empty palette falls back to [`DEFAULT_PALETTE`].
    pub fn new(durations: &[(String, f64)], palette: &[String]) -> Self {
        let fallback: Vec<String>;
        let palette = if palette.is_empty() {
            fallback = DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect();
            &fallback
        } else {
            palette
        };

        let total: f64 = durations.iter().map(|(_, secs)| secs.max(0.0)).sum();
        let mut start = 0.0;
        let segments = durations
            .iter()
            .enumerate()
            .map(|(i, (id, secs))| {
                let width = if total > 0.0 {
                    100.0 * secs.max(0.0) / total
                } else {
                    0.0
                };
                let segment = Segment {
                    routine_id: id.clone(),
                    color: palette[i % palette.len()].clone(),
                    start_pct: start,
                    width_pct: width,
                };
                start += width;
                segment
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Colored prefix of the track up to `percent`.
    pub fn fill(&self, percent: f64) -> Vec<FillSpan> {
        let percent = percent.clamp(0.0, 100.0);
        let mut spans = Vec::new();
        for segment in &self.segments {
            if percent <= segment.start_pct {
                break;
            }
            spans.push(FillSpan {
                color: segment.color.clone(),
                start_pct: segment.start_pct,
                end_pct: segment.end_pct().min(percent),
            });
        }
        spans
    }

    /// Full frame for a combo at `percent`.
    pub fn frame(
        &self,
        percent: f64,
        elapsed_routine_secs: f64,
        elapsed_total_secs: f64,
        total_target_secs: f64,
    ) -> ProgressFrame {
        ProgressFrame {
            percent,
            fill: Some(self.fill(percent)),
            marker_pct: Some(percent),
            elapsed_routine_secs,
            elapsed_total_secs,
            total_target_secs,
        }
    }
}
