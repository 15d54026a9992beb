//! Event source backed by a pre-materialized [`Sequence`].

use super::types::{sequence_length, EventSource, EventSourceSequence, MusicalEvent, Sequence};
use crate::eval::error::RuntimeError;

/// Smallest step a static loop's length is rounded up to, in beats.
pub const MINIMUM_STEP: f64 = 0.25;

/// Round `pos` up to the next multiple of [`MINIMUM_STEP`].
pub fn quantize_up(pos: f64) -> f64 {
    (pos / MINIMUM_STEP).ceil() * MINIMUM_STEP
}

/// Scans forward through a time-sorted sequence.
#[derive(Debug, Clone)]
pub struct StaticSource {
    events: Sequence,
    cursor: usize,
    /// Loop length: the latest event end, rounded up to the minimum step.
    length: f64,
}

impl StaticSource {
    pub fn new(mut events: Sequence) -> Self {
        events.sort_by(|a, b| a.time().total_cmp(&b.time()));
        let length = quantize_up(sequence_length(&events));
        Self {
            events,
            cursor: 0,
            length,
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }
}

impl EventSource for StaticSource {
    fn restart(&mut self) {
        self.cursor = 0;
    }

    fn events_until(&mut self, playhead: f64) -> Result<EventSourceSequence, RuntimeError> {
        let due = self.events[self.cursor..]
            .iter()
            .take_while(|e| e.time() <= playhead)
            .count();
        let events: Vec<MusicalEvent> = self.events[self.cursor..self.cursor + due].to_vec();
        self.cursor += due;

        let done = self.cursor == self.events.len() && playhead >= self.length;
        let position = if done {
            self.length
        } else {
            quantize_up(playhead.clamp(0.0, self.length))
        };

        Ok(EventSourceSequence {
            events,
            playhead: position,
            done,
        })
    }
}
