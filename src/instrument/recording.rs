//! An instrument that remembers what it was asked to play.
//!
//! Useful for offline rendering of a program's note schedule and for
//! asserting on scheduler output.

use std::cell::RefCell;
use std::rc::Rc;

use super::{Instrument, NoteHandle};

/// One note-on request and, once stopped, its note-off time.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRecord {
    pub pitch: u8,
    pub velocity: u8,
    pub at: Option<f64>,
    /// `None` until stopped; `Some(None)` when stopped "now".
    pub stopped: Option<Option<f64>>,
}

pub struct RecordingInstrument {
    name: String,
    notes: Rc<RefCell<Vec<NoteRecord>>>,
}

impl RecordingInstrument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Every note played so far, in request order.
    pub fn notes(&self) -> Vec<NoteRecord> {
        self.notes.borrow().clone()
    }

    pub fn pitches(&self) -> Vec<u8> {
        self.notes.borrow().iter().map(|n| n.pitch).collect()
    }

    pub fn clear(&self) {
        self.notes.borrow_mut().clear();
    }
}

impl Instrument for RecordingInstrument {
    fn play_note(&self, pitch: u8, velocity: u8, at: Option<f64>) -> Box<dyn NoteHandle> {
        let mut notes = self.notes.borrow_mut();
        notes.push(NoteRecord {
            pitch,
            velocity,
            at,
            stopped: None,
        });
        Box::new(RecordingHandle {
            notes: self.notes.clone(),
            index: notes.len() - 1,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct RecordingHandle {
    notes: Rc<RefCell<Vec<NoteRecord>>>,
    index: usize,
}

impl NoteHandle for RecordingHandle {
    fn stop(&mut self, at: Option<f64>) {
        if let Some(note) = self.notes.borrow_mut().get_mut(self.index) {
            note.stopped = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_note_on_and_off() {
        let inst = RecordingInstrument::new("rec");
        let mut handle = inst.play_note(60, 100, Some(0.5));
        assert_eq!(inst.notes()[0].stopped, None);
        handle.stop(Some(0.75));
        assert_eq!(
            inst.notes(),
            vec![NoteRecord {
                pitch: 60,
                velocity: 100,
                at: Some(0.5),
                stopped: Some(Some(0.75)),
            }]
        );
    }

    #[test]
    fn clear_forgets_notes() {
        let inst = RecordingInstrument::new("rec");
        inst.play_note(60, 100, None);
        inst.clear();
        assert!(inst.pitches().is_empty());
    }
}
