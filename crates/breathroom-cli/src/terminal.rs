//! Terminal renderings of the engine's visual and cue sinks.

use std::io::Write;

use breathroom_core::progress::Segment;
use breathroom_core::{Cue, CueSink, ProgressFrame, VisualSink, VisualTarget};

const BAR_WIDTH: usize = 40;

/// `m:ss`, rounded down to the second.
pub fn fmt_secs(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Progress bar of `width` cells. Segment boundaries of a combo track are
/// drawn as `|`.
pub fn render_bar(percent: f64, width: usize, segments: &[Segment]) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    let boundaries: Vec<usize> = segments
        .iter()
        .skip(1)
        .map(|s| ((s.start_pct / 100.0) * width as f64).round() as usize)
        .collect();

    (0..width)
        .map(|cell| {
            if boundaries.contains(&cell) {
                '|'
            } else if cell < filled {
                '#'
            } else {
                '-'
            }
        })
        .collect()
}

/// Single status line, redrawn in place.
pub struct TerminalVisual {
    quiet: bool,
    segments: Vec<Segment>,
    instruction: String,
    target: Option<VisualTarget>,
    frame: ProgressFrame,
    last_line: String,
}

impl TerminalVisual {
    /// A quiet visual draws nothing; used with `--json`.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            segments: Vec::new(),
            instruction: String::new(),
            target: None,
            frame: ProgressFrame::empty(),
            last_line: String::new(),
        }
    }

    fn line(&self) -> String {
        let arrow = match self.target {
            Some(VisualTarget::Expanded) => "^",
            Some(VisualTarget::Contracted) => "v",
            None => " ",
        };
        format!(
            "[{}] {:>3.0}%  {} left  {} {}",
            render_bar(self.frame.percent, BAR_WIDTH, &self.segments),
            self.frame.percent,
            fmt_secs(self.frame.remaining_secs()),
            arrow,
            self.instruction,
        )
    }

    fn redraw(&mut self) -> breathroom_core::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = self.line();
        if line == self.last_line {
            return Ok(());
        }
        let mut out = std::io::stdout().lock();
        write!(out, "\r\x1b[2K{line}")?;
        out.flush()?;
        self.last_line = line;
        Ok(())
    }
}

impl VisualSink for TerminalVisual {
    fn set_instruction(&mut self, text: &str) -> breathroom_core::Result<()> {
        self.instruction = text.to_string();
        self.redraw()
    }

    fn set_visual_scale(&mut self, target: VisualTarget, _transition_secs: f64) -> breathroom_core::Result<()> {
        self.target = Some(target);
        self.redraw()
    }

    fn set_progress(&mut self, frame: &ProgressFrame) -> breathroom_core::Result<()> {
        self.frame = frame.clone();
        self.redraw()
    }

    fn set_track(&mut self, segments: &[Segment]) -> breathroom_core::Result<()> {
        self.segments = segments.to_vec();
        self.redraw()
    }
}

/// Rings the terminal bell on stderr.
pub struct TerminalBell {
    enabled: bool,
}

impl TerminalBell {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl CueSink for TerminalBell {
    fn emit_cue(&mut self, cue: &Cue, _duration_hint_secs: f64) -> breathroom_core::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        tracing::trace!(?cue, "bell");
        let mut err = std::io::stderr().lock();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_secs_pads_seconds() {
        assert_eq!(fmt_secs(0.0), "0:00");
        assert_eq!(fmt_secs(65.9), "1:05");
        assert_eq!(fmt_secs(540.0), "9:00");
        assert_eq!(fmt_secs(-3.0), "0:00");
    }

    #[test]
    fn render_bar_fills_proportionally() {
        assert_eq!(render_bar(50.0, 10, &[]), "#####-----");
        assert_eq!(render_bar(0.0, 4, &[]), "----");
        assert_eq!(render_bar(120.0, 4, &[]), "####");
    }

    #[test]
    fn render_bar_marks_segment_boundaries() {
        let segments = vec![
            Segment {
                routine_id: "a".into(),
                color: "#000".into(),
                start_pct: 0.0,
                width_pct: 50.0,
            },
            Segment {
                routine_id: "b".into(),
                color: "#fff".into(),
                start_pct: 50.0,
                width_pct: 50.0,
            },
        ];
        assert_eq!(render_bar(20.0, 10, &segments), "##---|----");
    }

    #[test]
    fn quiet_visual_draws_nothing() {
        let mut visual = TerminalVisual::new(true);
        visual.set_instruction("INHALE").unwrap();
        assert!(visual.last_line.is_empty());
        assert!(visual.line().contains("INHALE"));
    }
}
