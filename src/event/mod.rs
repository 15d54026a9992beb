//! Event engine: event sources, loop storage and the lookahead scheduler.
//!
//! The [`Scheduler`] ticks on a fixed interval. Each tick advances the
//! virtual playhead by the wall-clock time elapsed since the previous tick,
//! pulls every loop up to a short lookahead horizon, and hands the notes to
//! their instruments with absolute start times on the audio clock. Notes are
//! scheduled ahead of the clock, so tick jitter never shows up in timing.
//!
//! The scheduler does not own an audio device; instruments are resolved by
//! name through the [`InstrumentRegistry`], which keeps all scheduling logic
//! testable with a [`ManualClock`] and recording instruments.

pub mod clock;
pub mod control;
pub mod loops;
pub mod source;
pub mod transport;
pub mod types;

pub use clock::{AudioClock, ManualClock, SystemClock};
pub use control::{Control, ControlQueue};
pub use loops::LoopStorage;
pub use source::StaticSource;
pub use transport::{is_valid_bpm, PlayState, Transport, DEFAULT_BPM};
pub use types::{EventSource, EventSourceSequence, MusicalEvent, NoteEvent, Sequence};

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::config::EngineConfig;
use crate::instrument::{InstrumentRegistry, NoteHandle};
use crate::log::Logger;

/// A dispatched note waiting for its note-off.
struct SoundingNote {
    handle: Box<dyn NoteHandle>,
    /// Note-off position in beats.
    off: f64,
}

/// Drives loops against the audio clock.
pub struct Scheduler {
    clock: Rc<dyn AudioClock>,
    instruments: Rc<InstrumentRegistry>,
    logger: Rc<dyn Logger>,
    loops: LoopStorage,
    transport: Transport,
    controls: ControlQueue,
    /// Clock time of the last playhead advance.
    last_time: f64,
    sounding: Vec<SoundingNote>,
    /// Lookahead window in seconds.
    lookahead: f64,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        clock: Rc<dyn AudioClock>,
        instruments: Rc<InstrumentRegistry>,
        logger: Rc<dyn Logger>,
        config: &EngineConfig,
    ) -> Self {
        let last_time = clock.current_time();
        let bpm = if is_valid_bpm(config.tempo) {
            config.tempo
        } else {
            logger.error(&format!(
                "ignoring invalid tempo {}, using {DEFAULT_BPM}",
                config.tempo
            ));
            DEFAULT_BPM
        };
        Self {
            clock,
            instruments,
            loops: LoopStorage::new(logger.clone()),
            logger,
            transport: Transport::new(bpm),
            controls: ControlQueue::new(),
            last_time,
            sounding: Vec::new(),
            lookahead: config.lookahead_seconds(),
            interval: config.scheduler_interval(),
        }
    }

    /// The queue this scheduler drains at the start of every tick.
    pub fn controls(&self) -> ControlQueue {
        self.controls.clone()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn state(&self) -> PlayState {
        self.transport.state()
    }

    pub fn loops(&self) -> &LoopStorage {
        &self.loops
    }

    /// Notes dispatched whose note-off has not been sent yet.
    pub fn sounding_notes(&self) -> usize {
        self.sounding.len()
    }

    /// Start playback, or resume after [`pause`](Self::pause).
    ///
    /// Starting from stopped rewinds the playhead to zero. No-op while
    /// already playing.
    pub fn play(&mut self) {
        if self.transport.is_playing() {
            return;
        }
        self.transport.play();
        self.last_time = self.clock.current_time();
        debug!(position = self.transport.position(), "playback started");
    }

    /// Hold the playhead and silence sounding notes. Loops are kept.
    pub fn pause(&mut self) {
        if !self.transport.is_playing() {
            return;
        }
        self.advance();
        self.transport.pause();
        self.silence();
    }

    /// Drop every loop and silence every note.
    pub fn stop(&mut self) {
        self.loops.unset_all();
        self.silence();
        self.transport.stop();
        debug!("playback stopped");
    }

    /// Install `source` under `id`.
    ///
    /// While playback is running or paused the loop starts at the next whole
    /// beat, and a loop already running under `id` finishes its current
    /// cycle before being replaced.
    pub fn set_loop(&mut self, id: &str, source: Box<dyn EventSource>) {
        let running = self.transport.state() != PlayState::Stopped;
        let start = if running {
            self.transport.position().ceil()
        } else {
            0.0
        };
        self.loops.set_loop(id, source, start, running);
    }

    pub fn unset_loop(&mut self, id: &str) {
        self.loops.unset_loop(id);
    }

    /// Change tempo from now on. Time already elapsed keeps the old tempo.
    pub fn set_tempo(&mut self, bpm: f64) {
        if !is_valid_bpm(bpm) {
            self.logger.error(&format!("ignoring invalid tempo {bpm}"));
            return;
        }
        if self.transport.is_playing() {
            self.advance();
        }
        self.transport.set_bpm(bpm);
    }

    /// Apply every queued [`Control`], oldest first.
    pub fn apply_controls(&mut self) {
        for control in self.controls.drain() {
            match control {
                Control::SetLoop { id, source } => self.set_loop(&id, source),
                Control::SetTempo(bpm) => self.set_tempo(bpm),
                Control::Play => self.play(),
            }
        }
    }

    /// One scheduling pass.
    pub fn tick(&mut self) {
        self.apply_controls();
        if !self.transport.is_playing() {
            return;
        }

        let now = self.advance();
        let playhead = self.transport.position();
        let horizon = playhead + self.transport.seconds_to_beats(self.lookahead);

        for event in self.loops.events_until(horizon) {
            let MusicalEvent::Note(note) = event else {
                continue;
            };
            let at = (now + self.transport.beats_to_seconds(note.start - playhead)).max(now);
            let handle = self
                .instruments
                .get(&note.instrument)
                .play_note(note.pitch, note.volume, Some(at));
            self.sounding.push(SoundingNote {
                handle,
                off: note.start + note.duration,
            });
        }

        let seconds_per_beat = self.transport.seconds_per_beat();
        let window_end = now + self.lookahead;
        self.sounding.retain_mut(|note| {
            let off_at = (now + (note.off - playhead) * seconds_per_beat).max(now);
            if off_at > window_end {
                return true;
            }
            note.handle.stop(Some(off_at));
            false
        });
    }

    /// Tick every interval until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            self.tick();
            thread::sleep(self.interval);
        }
    }

    /// Move the playhead to the clock's current time. Returns that time.
    fn advance(&mut self) -> f64 {
        let now = self.clock.current_time();
        let elapsed = (now - self.last_time).max(0.0);
        self.last_time = now;
        self.transport.advance_by_seconds(elapsed);
        now
    }

    fn silence(&mut self) {
        for mut note in self.sounding.drain(..) {
            note.handle.stop(None);
        }
    }
}
