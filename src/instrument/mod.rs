//! Instruments: anything that can play a pitch at a given time and hand back
//! a handle to stop it.

pub mod recording;
pub mod registry;

pub use recording::{NoteRecord, RecordingInstrument};
pub use registry::InstrumentRegistry;

use tracing::debug;

/// Common interface for all note-playing devices.
///
/// Times are absolute seconds on the scheduler's audio clock. `None` means
/// "now".
pub trait Instrument {
    /// Start a note and return a handle that stops it.
    fn play_note(&self, pitch: u8, velocity: u8, at: Option<f64>) -> Box<dyn NoteHandle>;

    /// Human-readable name for this instrument.
    fn name(&self) -> &str;
}

/// A sounding (or scheduled) note.
pub trait NoteHandle {
    fn stop(&mut self, at: Option<f64>);
}

/// Handle that does nothing when stopped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopHandle;

impl NoteHandle for NopHandle {
    fn stop(&mut self, _at: Option<f64>) {}
}

/// Silently drops every note. Stands in for unregistered names.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopInstrument;

impl Instrument for NopInstrument {
    fn play_note(&self, _pitch: u8, _velocity: u8, _at: Option<f64>) -> Box<dyn NoteHandle> {
        Box::new(NopHandle)
    }

    fn name(&self) -> &str {
        "nop"
    }
}

/// Reports every note through `tracing` instead of making a sound.
#[derive(Debug, Clone)]
pub struct LogInstrument {
    name: String,
}

impl LogInstrument {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Instrument for LogInstrument {
    fn play_note(&self, pitch: u8, velocity: u8, at: Option<f64>) -> Box<dyn NoteHandle> {
        debug!(instrument = %self.name, pitch, velocity, ?at, "note on");
        Box::new(LogHandle {
            instrument: self.name.clone(),
            pitch,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct LogHandle {
    instrument: String,
    pitch: u8,
}

impl NoteHandle for LogHandle {
    fn stop(&mut self, at: Option<f64>) {
        debug!(instrument = %self.instrument, pitch = self.pitch, ?at, "note off");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_instrument_accepts_notes() {
        let mut handle = NopInstrument.play_note(60, 100, Some(1.0));
        handle.stop(None);
        assert_eq!(NopInstrument.name(), "nop");
    }

    #[test]
    fn log_instrument_keeps_its_name() {
        let inst = LogInstrument::new("lead");
        assert_eq!(inst.name(), "lead");
        let mut handle = inst.play_note(64, 80, None);
        handle.stop(Some(0.5));
    }
}
