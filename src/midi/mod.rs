//! MIDI output: listing devices and playing notes on them.

pub mod output;

pub use output::{MidiInstrument, MidirBackend};

use std::io;
use std::rc::Rc;

use crate::instrument::Instrument;

/// Highest MIDI channel number; channels are numbered from 0.
pub const MAX_CHANNEL: u8 = 15;

/// An output port as shown to the performer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiOutputInfo {
    /// Stable handle for this session: the port's index.
    pub id: String,
    pub name: String,
}

/// Access to MIDI output devices.
pub trait MidiBackend {
    /// Every output port currently available.
    fn outputs(&self) -> io::Result<Vec<MidiOutputInfo>>;

    /// Open `output` (an id or part of a port name) as an instrument sending
    /// on `channel` (0–15).
    fn connect(&self, output: &str, channel: u8) -> io::Result<Rc<dyn Instrument>>;
}

/// Find an output by exact id, falling back to the first whose name
/// contains `query`.
pub fn find_output<'a>(outputs: &'a [MidiOutputInfo], query: &str) -> Option<&'a MidiOutputInfo> {
    outputs
        .iter()
        .find(|o| o.id == query)
        .or_else(|| outputs.iter().find(|o| o.name.contains(query)))
}

/// Note-on status and data bytes.
pub fn note_on(channel: u8, pitch: u8, velocity: u8) -> [u8; 3] {
    [0x90 | (channel & 0x0F), pitch & 0x7F, velocity & 0x7F]
}

/// Note-off status and data bytes.
pub fn note_off(channel: u8, pitch: u8) -> [u8; 3] {
    [0x80 | (channel & 0x0F), pitch & 0x7F, 0]
}

pub(crate) fn is_note_off(message: &[u8; 3]) -> bool {
    message[0] & 0xF0 == 0x80
}
