//! Decoded note data shared by every pipeline stage
//!
//! These are plain snapshots owned by the caller. Nothing in the pipeline
//! mutates them; each stage borrows what it needs.

use serde::{Deserialize, Serialize};

use crate::note::PITCH_CLASSES;

/// A single sounding note in absolute time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Display pitch name, e.g. "C4" or "F#5"
    pub name: String,
    /// MIDI note number (0-127)
    pub midi: u8,
    /// Onset in seconds
    pub note_on: f64,
    /// Offset in seconds
    pub note_off: f64,
    /// Velocity normalized to 0.0-1.0
    pub velocity: f64,
}

impl Note {
    pub fn new(
        name: impl Into<String>,
        midi: u8,
        note_on: f64,
        note_off: f64,
        velocity: f64,
    ) -> Self {
        Self {
            name: name.into(),
            midi,
            note_on,
            note_off,
            velocity,
        }
    }

    /// Length in seconds, never negative
    pub fn duration(&self) -> f64 {
        let duration = self.note_off - self.note_on;
        if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        }
    }

    pub fn pitch_class(&self) -> u8 {
        self.midi % 12
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    /// Notes in caller order; not guaranteed to be sorted by onset
    pub notes: Vec<Note>,
    pub instrument_family: Option<String>,
    pub is_drum: bool,
    /// Per-track sound override, wins over auto-mapping and the global sound
    pub sound: Option<String>,
    pub drum_bank: Option<String>,
    /// Explicit visibility; `None` means hidden only when there are no notes
    pub hidden: Option<bool>,
}

impl Track {
    pub fn new(id: impl Into<String>, name: impl Into<String>, notes: Vec<Note>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            notes,
            instrument_family: None,
            is_drum: false,
            sound: None,
            drum_bank: None,
            hidden: None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.unwrap_or(self.notes.is_empty())
    }

    pub fn is_visible(&self) -> bool {
        !self.is_hidden()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
        }
    }

    /// Semitone offsets of the seven diatonic degrees
    pub fn intervals(&self) -> &'static [u8; 7] {
        match self {
            Mode::Major => &[0, 2, 4, 5, 7, 9, 11],
            Mode::Minor => &[0, 2, 3, 5, 7, 8, 10],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySignature {
    /// Root pitch class name from `PITCH_CLASSES`
    pub root: String,
    pub mode: Mode,
    /// 0-100
    pub confidence: u8,
    /// Rounded mean of `midi / 12` over notes on the root pitch class
    pub average_octave: i32,
}

impl KeySignature {
    pub fn new(root_index: u8, mode: Mode, confidence: u8, average_octave: i32) -> Self {
        Self {
            root: PITCH_CLASSES[(root_index % 12) as usize].to_string(),
            mode,
            confidence: confidence.min(100),
            average_octave,
        }
    }

    /// Semitone index of the root; unknown names resolve to C
    pub fn root_index(&self) -> u8 {
        crate::note::pitch_class_index(&self.root).unwrap_or(0)
    }
}

impl Default for KeySignature {
    fn default() -> Self {
        Self::new(0, Mode::Major, 0, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_hidden_defaults_to_empty_notes() {
        let empty = Track::new("track-0", "Empty", vec![]);
        assert!(empty.is_hidden());

        let full = Track::new("track-1", "Lead", vec![Note::new("C4", 60, 0.0, 1.0, 0.8)]);
        assert!(full.is_visible());

        let mut forced = full.clone();
        forced.hidden = Some(true);
        assert!(forced.is_hidden());
    }

    #[test]
    fn test_note_duration_never_negative() {
        let backwards = Note::new("C4", 60, 2.0, 1.0, 0.5);
        assert_eq!(backwards.duration(), 0.0);
        assert_eq!(Note::new("C4", 60, 1.0, 1.5, 0.5).duration(), 0.5);
    }

    #[test]
    fn test_key_signature_default() {
        let key = KeySignature::default();
        assert_eq!(key.root, "C");
        assert_eq!(key.mode, Mode::Major);
        assert_eq!(key.confidence, 0);
        assert_eq!(key.average_octave, 4);
    }

    #[test]
    fn test_key_signature_root_index() {
        assert_eq!(KeySignature::new(10, Mode::Minor, 80, 4).root, "Bb");
        assert_eq!(KeySignature::new(10, Mode::Minor, 80, 4).root_index(), 10);
    }
}
