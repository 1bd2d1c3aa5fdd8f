//! Property tests for phase lists, pause accounting and progress clamping.

use std::collections::BTreeMap;

use breathroom_core::progress::{project, SegmentedTrack};
use breathroom_core::timer::{advance, build_phases, PauseController, PhaseKey};
use breathroom_core::{Catalog, Clock, Collaborators, EngineSettings, ManualClock, Routine, SessionEngine, SessionTarget};
use proptest::prelude::*;

fn phase_secs() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 0.5f64..12.0]
}

fn routine_strategy() -> impl Strategy<Value = Routine> {
    (phase_secs(), phase_secs(), phase_secs(), phase_secs(), 1u32..4)
        .prop_filter("at least one active phase", |(a, b, c, d, _)| a + b + c + d > 0.0)
        .prop_map(|(inhale, hold_in, exhale, hold_out, minutes)| Routine {
            id: "prop".into(),
            name: "Prop".into(),
            duration_minutes: minutes,
            inhale,
            hold_in,
            exhale,
            hold_out,
            phase_labels: BTreeMap::new(),
        })
}

proptest! {
    #[test]
    fn phase_list_keeps_order_and_drops_zeros(routine in routine_strategy()) {
        let phases = build_phases(&routine);
        prop_assert!(!phases.is_empty());
        prop_assert!(phases.iter().all(|p| p.duration > 0.0));

        let keys: Vec<PhaseKey> = phases.iter().map(|p| p.key).collect();
        let expected: Vec<PhaseKey> = PhaseKey::ORDER
            .iter()
            .copied()
            .filter(|k| routine.phase_secs(*k) > 0.0)
            .collect();
        prop_assert_eq!(keys, expected);

        let total: f64 = phases.iter().map(|p| p.duration).sum();
        prop_assert!((total - routine.cycle_secs()).abs() < 1e-9);
    }

    #[test]
    fn phase_index_wraps_in_range(routine in routine_strategy(), steps in 0usize..50) {
        let phases = build_phases(&routine);
        let mut index = 0;
        for _ in 0..steps {
            index = advance(&phases, index);
            prop_assert!(index < phases.len());
        }
        prop_assert_eq!(index, steps % phases.len());
    }

    #[test]
    fn pause_total_is_sum_of_spans(spans in prop::collection::vec((0u64..5_000, 0u64..5_000), 0..20)) {
        let mut pause = PauseController::new();
        let mut now = 0;
        let mut expected = 0;
        for (running, paused) in spans {
            now += running;
            prop_assert!(pause.pause(now));
            now += paused;
            prop_assert_eq!(pause.resume(now), Some(paused));
            expected += paused;
        }
        prop_assert_eq!(pause.effective_ms(now), expected);
        prop_assert!(!pause.is_paused());
    }

    #[test]
    fn progress_is_clamped(elapsed in -1_000.0f64..100_000.0, target in -10.0f64..50_000.0) {
        let pct = project(elapsed, target);
        prop_assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn segments_tile_the_track(durations in prop::collection::vec(1.0f64..3_600.0, 1..6)) {
        let pairs: Vec<(String, f64)> = durations
            .iter()
            .enumerate()
            .map(|(i, d)| (format!("r{i}"), *d))
            .collect();
        let track = SegmentedTrack::new(&pairs, &[]);
        let segments = track.segments();
        prop_assert!(segments[0].start_pct.abs() < 1e-9);
        for pair in segments.windows(2) {
            prop_assert!((pair[0].end_pct() - pair[1].start_pct).abs() < 1e-9);
        }
        prop_assert!((segments[segments.len() - 1].end_pct() - 100.0).abs() < 1e-6);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Whatever the pattern, a routine ends on a phase boundary no earlier
    /// than its target and less than one phase later.
    #[test]
    fn routine_completes_within_one_phase_of_target(routine in routine_strategy()) {
        let clock = ManualClock::new();
        let catalog = Catalog::new(vec![routine.clone()], vec![]);
        let mut engine = SessionEngine::new(
            clock.clone(),
            EngineSettings { countdown_ticks: 0, ..EngineSettings::default() },
            Collaborators::with_catalog(catalog),
        );
        engine.start(SessionTarget::Routine("prop".into())).unwrap();

        let mut stopped_at = None;
        for _ in 0..(routine.target_ms() / 100 + 200) {
            let events = engine.pump();
            if events.iter().any(|e| matches!(e, breathroom_core::Event::SessionStopped { completed: true, .. })) {
                stopped_at = Some(clock.now_ms());
                break;
            }
            clock.advance_ms(100);
        }

        let stopped_at = stopped_at.expect("routine completed");
        let longest = build_phases(&routine)
            .iter()
            .map(|p| p.duration_ms())
            .max()
            .unwrap_or(0);
        prop_assert!(stopped_at >= routine.target_ms());
        prop_assert!(stopped_at < routine.target_ms() + longest + 100);
    }
}
