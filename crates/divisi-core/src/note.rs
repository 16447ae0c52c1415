//! Note events for MIDI track sequencing.

use serde::{Deserialize, Serialize};

/// A single scheduled note.
///
/// Duplicates and overlapping notes are permitted; the sequence is stored
/// exactly as given and validated nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI note number (0-127 by convention, not enforced).
    pub pitch: u8,
    /// Start time in seconds from sequence origin.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Velocity in [0, 1].
    pub velocity: f32,
}

impl NoteEvent {
    pub fn new(pitch: u8, start: f64, duration: f64, velocity: f32) -> Self {
        Self {
            pitch,
            start,
            duration,
            velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_serde_round_trip() {
        let note = NoteEvent::new(60, 0.5, 1.25, 0.8);
        let json = serde_json::to_string(&note).unwrap();
        let back: NoteEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(note, back);
    }
}
