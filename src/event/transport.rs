//! Transport state: play/pause/stop control, tempo and the virtual playhead.
//!
//! The playhead is measured in beats and advanced by elapsed wall-clock
//! seconds at the tempo in effect when the advance happens. Tempo changes are
//! never applied retroactively.

/// Default tempo in beats per minute.
pub const DEFAULT_BPM: f64 = 120.0;

/// A tempo the transport can run at: positive and finite.
pub fn is_valid_bpm(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0
}

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

/// Musical transport: tracks tempo, state and playhead position.
#[derive(Debug)]
pub struct Transport {
    bpm: f64,
    state: PlayState,
    position: f64,
}

impl Transport {
    /// Create a new transport in the stopped state at position zero.
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm,
            state: PlayState::Stopped,
            position: 0.0,
        }
    }

    /// Start or resume playback. Starting from `Stopped` rewinds to zero.
    pub fn play(&mut self) {
        if self.state == PlayState::Stopped {
            self.reset();
        }
        self.state = PlayState::Playing;
    }

    /// Hold the playhead where it is.
    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
        }
    }

    /// Stop playback.
    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
    }

    /// Reset position to zero without changing play state.
    pub fn reset(&mut self) {
        self.position = 0.0;
    }

    /// Current play state.
    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    /// Current playhead position in beats.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Current BPM.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set a new BPM. Takes effect on the next conversion.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * self.seconds_per_beat()
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds * self.bpm / 60.0
    }

    /// Advance the playhead by `seconds` of wall-clock time.
    ///
    /// Returns the `(from, to)` beat range covered, or `None` when not playing.
    pub fn advance_by_seconds(&mut self, seconds: f64) -> Option<(f64, f64)> {
        if self.state != PlayState::Playing {
            return None;
        }
        let from = self.position;
        self.position += self.seconds_to_beats(seconds.max(0.0));
        Some((from, self.position))
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}
