//! Full pipeline integration tests: source → parser → evaluator → scheduler → instruments.
//!
//! A manual clock stands in for real time and a recording instrument stands
//! in for a device, so every dispatched note can be checked exactly.

use std::rc::Rc;

use assert_approx_eq::assert_approx_eq;
use cadenza::config::EngineConfig;
use cadenza::event::{ManualClock, PlayState};
use cadenza::instrument::{Instrument, InstrumentRegistry, NoteRecord, RecordingInstrument};
use cadenza::log::MemoryLogger;
use cadenza::{Error, Interpreter};

/// Scheduler tick length used by these tests, in seconds.
const TICK: f64 = 0.025;

struct Rig {
    interpreter: Interpreter,
    clock: Rc<ManualClock>,
    default: Rc<RecordingInstrument>,
    logger: Rc<MemoryLogger>,
}

/// 120 BPM, so one beat is half a second and beat `b` sounds at `b / 2` s.
fn rig() -> Rig {
    let clock = Rc::new(ManualClock::new());
    let default = Rc::new(RecordingInstrument::new("default"));
    let instruments = Rc::new(InstrumentRegistry::new());
    instruments.register("default", default.clone() as Rc<dyn Instrument>);
    let logger = Rc::new(MemoryLogger::new());
    let config = EngineConfig {
        seed: Some(42),
        ..EngineConfig::default()
    };
    let interpreter = Interpreter::new(clock.clone(), instruments, logger.clone(), None, &config);
    Rig {
        interpreter,
        clock,
        default,
        logger,
    }
}

impl Rig {
    fn run(&mut self, source: &str) {
        self.interpreter.execute(source).expect("program failed");
        self.interpreter.tick();
    }

    /// Advance the clock by `seconds`, ticking along the way.
    fn play_for(&mut self, seconds: f64) {
        let ticks = (seconds / TICK).round() as usize;
        for _ in 0..ticks {
            self.clock.advance(TICK);
            self.interpreter.tick();
        }
    }

    /// Start beats of every note played on the default instrument.
    fn beats(&self) -> Vec<f64> {
        self.default
            .notes()
            .iter()
            .map(|n: &NoteRecord| n.at.expect("scheduled note") * 2.0)
            .collect()
    }
}

fn assert_beats(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert_approx_eq!(*a, *e);
    }
}

#[test]
fn step_sequence_loops_on_its_grid() {
    let mut rig = rig();
    rig.run("s = step { x - x | x = 88 }; loop s;");
    assert_eq!(rig.interpreter.scheduler().state(), PlayState::Playing);

    // One cycle is 0.75 beats: two notes and a rest, the last note ends at 0.75.
    rig.play_for(0.5);
    assert_eq!(rig.default.pitches(), vec![88; 3]);
    assert_beats(&rig.beats(), &[0.0, 0.5, 0.75]);
}

#[test]
fn procedures_sleep_between_notes() {
    let mut rig = rig();
    rig.run("p = seq { play 60; sleep 1; play 62; sleep 1; }; loop p;");
    rig.play_for(1.0);
    assert_eq!(rig.default.pitches(), vec![60, 62, 60]);
    assert_beats(&rig.beats(), &[0.0, 1.0, 2.0]);
}

#[test]
fn euclidean_rhythm_in_a_procedure() {
    let mut rig = rig();
    rig.run(
        "pattern = spread(3, 8);
         p = seq {
             i = 0;
             while (i < len(pattern)) {
                 if (pattern[i]) play 36;
                 sleep 0.25;
                 i = i + 1;
             }
         };
         loop p;",
    );
    rig.play_for(0.8);
    assert_beats(&rig.beats(), &[0.0, 0.75, 1.5]);
}

#[test]
fn chords_and_note_values() {
    let mut rig = rig();
    rig.run(
        "bass = instrument(\"default\");
         p = seq { play [60, 64, 67]; sleep 1; play note(bass, 40, 100, 2); sleep 3; };
         loop p;",
    );
    rig.play_for(0.5);
    let notes = rig.default.notes();
    assert_eq!(rig.default.pitches(), vec![60, 64, 67, 40]);
    assert_eq!(notes[3].velocity, 100);
    assert_beats(&rig.beats(), &[0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn failing_loop_is_removed_and_others_keep_playing() {
    let mut rig = rig();
    rig.run(
        "a = seq { play 60; sleep 1; play missing; };
         b = step { 70 };
         loop a;
         loop b;",
    );
    rig.play_for(1.0);

    let errors = rig.logger.errors();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("loop 'a'"));
    assert!(errors[0].contains("missing"));

    let loops = rig.interpreter.scheduler().loops();
    assert!(!loops.contains("a"));
    assert!(loops.contains("b"));

    let before = rig.default.pitches().iter().filter(|&&p| p == 70).count();
    rig.play_for(0.5);
    let after = rig.default.pitches().iter().filter(|&&p| p == 70).count();
    assert_eq!(after - before, 4);
    assert_eq!(rig.logger.errors().len(), 1);
}

#[test]
fn re_evaluating_replaces_a_loop_at_its_boundary() {
    let mut rig = rig();
    rig.run("s = seq { play 60; sleep 1; }; loop s;");
    rig.play_for(0.25);
    rig.interpreter
        .execute("s = seq { play 72; sleep 1; }; loop s;")
        .unwrap();
    rig.play_for(0.75);
    // Cycles are one beat long; the new pattern takes over at beat 1.
    assert_eq!(rig.default.pitches(), vec![60, 72, 72]);
    assert_beats(&rig.beats(), &[0.0, 1.0, 2.0]);
}

#[test]
fn errors_in_a_new_version_leave_running_loops_alone() {
    let mut rig = rig();
    rig.run("s = step { 60 }; loop s;");
    let err = rig.interpreter.execute("loop s; x = ;").unwrap_err();
    assert!(matches!(err, Error::Syntax(_)));
    let err = rig.interpreter.execute("x = 1 + true;").unwrap_err();
    assert!(matches!(err, Error::Runtime(_)));

    rig.play_for(0.5);
    assert!(rig.interpreter.scheduler().loops().contains("s"));
    assert_eq!(rig.default.pitches().len(), 5);
}

#[test]
fn tempo_from_a_procedure_applies_on_the_next_tick() {
    let mut rig = rig();
    rig.run("p = seq { tempo 60; play 60; sleep 4; }; loop p;");
    assert_approx_eq!(rig.interpreter.scheduler().transport().bpm(), 120.0);
    rig.play_for(TICK);
    assert_approx_eq!(rig.interpreter.scheduler().transport().bpm(), 60.0);
}

#[test]
fn print_goes_to_the_logger() {
    let mut rig = rig();
    rig.run("f = fun(x) { return x * 2; }; print(\"twice: \" + str(f(21)));");
    assert_eq!(rig.logger.infos(), vec!["twice: 42".to_string()]);
}

#[test]
fn stop_silences_everything() {
    let mut rig = rig();
    rig.run("p = seq { play 60; sleep 8; }; loop p;");
    rig.interpreter.scheduler_mut().stop();
    let notes = rig.default.notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].stopped, Some(None));
    assert!(rig.interpreter.scheduler().loops().is_empty());
}

#[test]
fn loop_with_a_vanishing_cycle_plays_once() {
    let mut rig = rig();
    rig.run("s = step { 72 }; loop s;");
    rig.play_for(5.0);
    rig.interpreter
        .execute("p = seq { play 60; sleep 1 / 1000000000000000; }; loop p;")
        .unwrap();
    rig.play_for(1.0);

    let played = rig.default.pitches().iter().filter(|&&p| p == 60).count();
    assert_eq!(played, 1);
    let errors = rig.logger.errors();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("loop 'p'"));
    assert!(rig.interpreter.scheduler().loops().contains("s"));
}
