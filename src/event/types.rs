//! Event data model: timestamped musical events and the event-source contract.
//!
//! All times are in beats, where one beat is a quarter note.

use crate::eval::error::RuntimeError;

/// A note to be played on a named instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    /// Start time in beats.
    pub start: f64,
    /// MIDI pitch (0–127).
    pub pitch: u8,
    /// Velocity (0–127).
    pub volume: u8,
    /// Duration in beats.
    pub duration: f64,
    /// Name of the instrument in the registry.
    pub instrument: String,
}

/// A single event in a [`Sequence`].
#[derive(Debug, Clone, PartialEq)]
pub enum MusicalEvent {
    Note(NoteEvent),
    PitchBend { time: f64, instrument: String },
}

impl MusicalEvent {
    pub fn note(start: f64, pitch: u8, volume: u8, duration: f64, instrument: &str) -> Self {
        MusicalEvent::Note(NoteEvent {
            start,
            pitch,
            volume,
            duration,
            instrument: instrument.to_string(),
        })
    }

    /// When the event happens.
    pub fn time(&self) -> f64 {
        match self {
            MusicalEvent::Note(note) => note.start,
            MusicalEvent::PitchBend { time, .. } => *time,
        }
    }

    /// When the event stops sounding. Bends are instantaneous.
    pub fn end(&self) -> f64 {
        match self {
            MusicalEvent::Note(note) => note.start + note.duration,
            MusicalEvent::PitchBend { time, .. } => *time,
        }
    }

    pub fn instrument(&self) -> &str {
        match self {
            MusicalEvent::Note(note) => &note.instrument,
            MusicalEvent::PitchBend { instrument, .. } => instrument,
        }
    }

    /// The same event moved `offset` beats later.
    pub fn shifted(mut self, offset: f64) -> Self {
        match &mut self {
            MusicalEvent::Note(note) => note.start += offset,
            MusicalEvent::PitchBend { time, .. } => *time += offset,
        }
        self
    }
}

/// An ordered list of events.
pub type Sequence = Vec<MusicalEvent>;

/// Latest end time in the sequence, or 0 for an empty one.
pub fn sequence_length(seq: &[MusicalEvent]) -> f64 {
    seq.iter().map(MusicalEvent::end).fold(0.0, f64::max)
}

/// `left :+: right`: play `right` after everything in `left` has finished.
pub fn concatenate(mut left: Sequence, right: Sequence) -> Sequence {
    let offset = sequence_length(&left);
    left.extend(right.into_iter().map(|e| e.shifted(offset)));
    left
}

/// `left :=: right`: play both at once, merged in time order.
///
/// The sort is stable, so events sharing a time keep their left-then-right order.
pub fn stack(mut left: Sequence, right: Sequence) -> Sequence {
    left.extend(right);
    left.sort_by(|a, b| a.time().total_cmp(&b.time()));
    left
}

/// Result of pulling events from an [`EventSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventSourceSequence {
    /// Events produced by this pull, in source-local time.
    pub events: Sequence,
    /// Local playhead position reached by the source.
    pub playhead: f64,
    /// The source has nothing more to produce until restarted.
    pub done: bool,
}

/// Something that can be pulled for events up to a local playhead position.
pub trait EventSource {
    /// Rewind to local time zero.
    fn restart(&mut self);

    /// Produce the events due up to `playhead` (in local beats).
    fn events_until(&mut self, playhead: f64) -> Result<EventSourceSequence, RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn note(start: f64, duration: f64) -> MusicalEvent {
        MusicalEvent::note(start, 60, 64, duration, "default")
    }

    fn bend(time: f64) -> MusicalEvent {
        MusicalEvent::PitchBend {
            time,
            instrument: "default".to_string(),
        }
    }

    #[test]
    fn time_and_end() {
        let n = note(1.0, 0.5);
        assert_approx_eq!(n.time(), 1.0);
        assert_approx_eq!(n.end(), 1.5);
        assert_approx_eq!(bend(2.0).end(), 2.0);
    }

    #[test]
    fn shifted_moves_notes_and_bends() {
        assert_approx_eq!(note(0.25, 0.25).shifted(1.0).time(), 1.25);
        assert_approx_eq!(bend(0.5).shifted(2.0).time(), 2.5);
    }

    #[test]
    fn concatenate_offsets_by_latest_end() {
        // The long first note ends after the short second one.
        let left = vec![note(0.0, 2.0), note(0.5, 0.25)];
        let right = vec![note(0.0, 0.25)];
        let seq = concatenate(left, right);
        assert_eq!(seq.len(), 3);
        assert_approx_eq!(seq[2].time(), 2.0);
    }

    #[test]
    fn concatenate_with_empty_left() {
        let seq = concatenate(vec![], vec![note(0.5, 0.25)]);
        assert_approx_eq!(seq[0].time(), 0.5);
    }

    #[test]
    fn stack_sorts_by_time() {
        let left = vec![note(0.0, 0.25), note(0.5, 0.25)];
        let right = vec![note(0.25, 0.25), bend(0.3)];
        let times: Vec<f64> = stack(left, right).iter().map(|e| e.time()).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.3, 0.5]);
    }

    #[test]
    fn stack_is_stable_for_equal_times() {
        let left = vec![MusicalEvent::note(0.0, 60, 64, 0.25, "a")];
        let right = vec![MusicalEvent::note(0.0, 62, 64, 0.25, "b")];
        let seq = stack(left, right);
        assert_eq!(seq[0].instrument(), "a");
        assert_eq!(seq[1].instrument(), "b");
    }

    #[test]
    fn sequence_length_of_empty_is_zero() {
        assert_approx_eq!(sequence_length(&[]), 0.0);
    }
}
