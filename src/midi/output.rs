//! MIDI output through `midir`.
//!
//! Notes are scheduled ahead of time, so each connection gets a dispatcher
//! thread that holds messages until their due instant and then writes them
//! to the port.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

use midir::MidiOutput;
use tracing::{debug, warn};

use super::{find_output, is_note_off, note_off, note_on, MidiBackend, MidiOutputInfo, MAX_CHANNEL};
use crate::event::clock::SystemClock;
use crate::instrument::{Instrument, NoteHandle};

/// A message due at a given instant, tagged with the note it belongs to.
#[derive(Debug, Clone, Copy)]
struct Timed {
    at: Instant,
    note: u64,
    message: [u8; 3],
}

enum Command {
    Send(Timed),
    /// Drop whatever is still queued for a note.
    Cancel(u64),
}

/// Sending side of a dispatcher thread. Warns once when the thread is gone.
#[derive(Clone)]
struct Outbox {
    sender: Sender<Command>,
    warned: Rc<Cell<bool>>,
}

impl Outbox {
    fn send(&self, command: Command) {
        if let Err(e) = self.sender.send(command) {
            if !self.warned.replace(true) {
                warn!("MIDI dispatcher stopped, dropping messages: {e}");
            }
        }
    }
}

/// Opens ports with `midir`. Note times are read against `clock`, which
/// must be the scheduler's clock.
#[derive(Debug, Clone, Copy)]
pub struct MidirBackend {
    clock: SystemClock,
}

impl MidirBackend {
    pub fn new(clock: SystemClock) -> Self {
        Self { clock }
    }
}

impl MidiBackend for MidirBackend {
    fn outputs(&self) -> io::Result<Vec<MidiOutputInfo>> {
        let midi_out = MidiOutput::new("cadenza-list")
            .map_err(|e| io::Error::other(format!("MIDI init: {e}")))?;
        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .map(|(i, port)| MidiOutputInfo {
                id: i.to_string(),
                name: midi_out
                    .port_name(port)
                    .unwrap_or_else(|_| "unknown".to_string()),
            })
            .collect())
    }

    fn connect(&self, output: &str, channel: u8) -> io::Result<Rc<dyn Instrument>> {
        if channel > MAX_CHANNEL {
            return Err(io::Error::other(format!(
                "MIDI channel must be between 0 and {MAX_CHANNEL}, got {channel}"
            )));
        }

        let outputs = self.outputs()?;
        let info = find_output(&outputs, output)
            .ok_or_else(|| io::Error::other(format!("MIDI output matching '{output}' not found")))?
            .clone();

        let midi_out = MidiOutput::new("cadenza")
            .map_err(|e| io::Error::other(format!("MIDI init: {e}")))?;
        let index: usize = info
            .id
            .parse()
            .map_err(|_| io::Error::other(format!("bad MIDI output id '{}'", info.id)))?;
        let port = midi_out
            .ports()
            .get(index)
            .cloned()
            .ok_or_else(|| io::Error::other(format!("MIDI output '{}' disappeared", info.name)))?;
        let mut connection = midi_out
            .connect(&port, "cadenza-output")
            .map_err(|e| io::Error::other(format!("MIDI connect: {e}")))?;

        let name = format!("midi:{}:{channel}", info.id);
        debug!(port = %info.name, channel, "MIDI output connected");
        let instrument = MidiInstrument::spawn(name, channel, self.clock, move |message| {
            if let Err(e) = connection.send(message) {
                warn!("MIDI send failed: {e}");
            }
        });
        Ok(Rc::new(instrument))
    }
}

/// Plays notes on one channel of a MIDI output.
pub struct MidiInstrument {
    name: String,
    channel: u8,
    clock: SystemClock,
    outbox: Outbox,
    next_note: Cell<u64>,
}

impl MidiInstrument {
    /// Start a dispatcher thread writing due messages to `sink`.
    pub fn spawn(
        name: impl Into<String>,
        channel: u8,
        clock: SystemClock,
        sink: impl FnMut(&[u8]) + Send + 'static,
    ) -> Self {
        let (sender, receiver) = mpsc::channel::<Command>();
        thread::spawn(move || dispatch(receiver, sink));
        Self {
            name: name.into(),
            channel,
            clock,
            outbox: Outbox {
                sender,
                warned: Rc::new(Cell::new(false)),
            },
            next_note: Cell::new(0),
        }
    }
}

fn instant(clock: &SystemClock, seconds: Option<f64>) -> Instant {
    seconds.map_or_else(Instant::now, |s| clock.instant_at(s))
}

impl Instrument for MidiInstrument {
    fn play_note(&self, pitch: u8, velocity: u8, at: Option<f64>) -> Box<dyn NoteHandle> {
        let note = self.next_note.get();
        self.next_note.set(note.wrapping_add(1));
        self.outbox.send(Command::Send(Timed {
            at: instant(&self.clock, at),
            note,
            message: note_on(self.channel, pitch, velocity),
        }));
        Box::new(MidiNoteHandle {
            outbox: self.outbox.clone(),
            clock: self.clock,
            channel: self.channel,
            pitch,
            note,
            stopped: false,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct MidiNoteHandle {
    outbox: Outbox,
    clock: SystemClock,
    channel: u8,
    pitch: u8,
    note: u64,
    stopped: bool,
}

impl NoteHandle for MidiNoteHandle {
    /// Stopping "now" also drops the note-on if it is still queued.
    fn stop(&mut self, at: Option<f64>) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if at.is_none() {
            self.outbox.send(Command::Cancel(self.note));
        }
        self.outbox.send(Command::Send(Timed {
            at: instant(&self.clock, at),
            note: self.note,
            message: note_off(self.channel, self.pitch),
        }));
    }
}

/// Deliver messages in time order until every sender is gone.
///
/// On shutdown pending note-offs are sent at once and
/// pending note-ons are dropped.
fn dispatch(receiver: Receiver<Command>, mut sink: impl FnMut(&[u8])) {
    // Ties keep arrival order.
    let mut pending: BinaryHeap<Reverse<(Instant, u64, u64, [u8; 3])>> = BinaryHeap::new();
    let mut arrivals: u64 = 0;

    loop {
        let now = Instant::now();
        while let Some(Reverse((at, _, _, message))) = pending.peek().copied() {
            if at > now {
                break;
            }
            pending.pop();
            sink(&message);
        }

        let received = match pending.peek() {
            Some(Reverse((at, _, _, _))) => receiver.recv_timeout(at.saturating_duration_since(now)),
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Command::Send(timed)) => {
                pending.push(Reverse((timed.at, arrivals, timed.note, timed.message)));
                arrivals += 1;
            }
            Ok(Command::Cancel(note)) => {
                pending.retain(|Reverse((_, _, queued, _))| *queued != note);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    while let Some(Reverse((_, _, _, message))) = pending.pop() {
        if is_note_off(&message) {
            sink(&message);
        }
    }
}
