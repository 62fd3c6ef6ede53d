//! Scale degrees for relative notation
//!
//! Pitches are expressed as a degree index of the playback key's scale,
//! counted from the root at the key's average octave, so `n("0 7")` with
//! `.scale("C4:major")` plays C4 then C5. A pitch outside the scale is
//! written as the degree a semitone above it with a flat marker.

use crate::model::KeySignature;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    Natural,
    Flat,
    Sharp,
}

/// Position of a pitch in a scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Degree {
    /// Degree plus seven per octave away from the anchor; may be negative
    pub index: i32,
    pub accidental: Accidental,
}

impl Degree {
    pub fn to_strudel(&self) -> String {
        match self.accidental {
            Accidental::Natural => self.index.to_string(),
            Accidental::Flat => format!("{}b", self.index),
            Accidental::Sharp => format!("{}#", self.index),
        }
    }
}

/// Average octave limited to the blocks MIDI notes can occupy (`0..=10`)
fn anchor_octave(key: &KeySignature) -> i32 {
    key.average_octave.clamp(0, 10)
}

/// Map a MIDI note to a degree of `key`'s scale
pub fn degree_for(midi: u8, key: &KeySignature) -> Degree {
    let intervals = key.mode.intervals();
    let anchor = anchor_octave(key) * 12 + key.root_index() as i32;
    let offset = midi as i32 - anchor;
    let octave = offset.div_euclid(12);
    let pitch_class = offset.rem_euclid(12) as u8;

    let at = |degree: usize, octave: i32, accidental: Accidental| Degree {
        index: degree as i32 + 7 * octave,
        accidental,
    };

    if let Some(degree) = intervals.iter().position(|&i| i == pitch_class) {
        return at(degree, octave, Accidental::Natural);
    }

    // The root one octave up sits a semitone above the leading tone
    if pitch_class == 11 {
        return at(0, octave + 1, Accidental::Flat);
    }
    if let Some(degree) = intervals.iter().position(|&i| i == pitch_class + 1) {
        return at(degree, octave, Accidental::Flat);
    }
    if let Some(degree) = intervals.iter().position(|&i| i + 1 == pitch_class) {
        return at(degree, octave, Accidental::Sharp);
    }

    // Unreachable for major and minor; keeps the mapping total
    let degree = intervals.iter().rposition(|&i| i <= pitch_class).unwrap_or(0);
    at(degree, octave, Accidental::Natural)
}

/// Argument of `.scale()`, e.g. "C4:major"
///
/// The average octave counts MIDI blocks of twelve (`midi / 12`), which is one
/// above scientific pitch notation.
pub fn scale_name(key: &KeySignature) -> String {
    format!("{}{}:{}", key.root, anchor_octave(key) - 1, key.mode.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mode;

    fn c_major() -> KeySignature {
        KeySignature::new(0, Mode::Major, 90, 5)
    }

    fn a_minor() -> KeySignature {
        KeySignature::new(9, Mode::Minor, 90, 4)
    }

    fn render(midi: u8, key: &KeySignature) -> String {
        degree_for(midi, key).to_strudel()
    }

    #[test]
    fn test_diatonic_degrees() {
        let key = c_major();
        let rendered: Vec<String> = [60u8, 62, 64, 65, 67, 69, 71, 72]
            .iter()
            .map(|&m| render(m, &key))
            .collect();
        assert_eq!(rendered, vec!["0", "1", "2", "3", "4", "5", "6", "7"]);
    }

    #[test]
    fn test_chromatic_pitches_are_flattened() {
        let key = c_major();
        assert_eq!(render(61, &key), "1b");
        assert_eq!(render(63, &key), "2b");
        assert_eq!(render(66, &key), "4b");
        assert_eq!(render(68, &key), "5b");
        assert_eq!(render(70, &key), "6b");
    }

    #[test]
    fn test_below_anchor_is_negative() {
        let key = c_major();
        assert_eq!(render(59, &key), "-1");
        assert_eq!(render(48, &key), "-7");
        assert_eq!(render(58, &key), "-1b");
    }

    #[test]
    fn test_minor_leading_tone_wraps_to_next_root() {
        let key = a_minor();
        assert_eq!(render(57, &key), "0");
        assert_eq!(render(60, &key), "2");
        assert_eq!(render(68, &key), "7b");
        assert_eq!(render(61, &key), "3b");
    }

    #[test]
    fn test_scale_name() {
        assert_eq!(scale_name(&c_major()), "C4:major");
        assert_eq!(scale_name(&a_minor()), "A3:minor");
        assert_eq!(scale_name(&KeySignature::default()), "C3:major");
    }

    #[test]
    fn test_extreme_octaves_are_clamped() {
        let high = KeySignature::new(0, Mode::Major, 50, i32::MAX);
        assert_eq!(scale_name(&high), "C9:major");
        assert_eq!(render(120, &high), "0");

        let low = KeySignature::new(0, Mode::Major, 50, i32::MIN);
        assert_eq!(scale_name(&low), "C-1:major");
        assert_eq!(render(0, &low), "0");
    }

    #[test]
    fn test_every_midi_note_maps() {
        for key in [c_major(), a_minor(), KeySignature::new(6, Mode::Minor, 0, 0)] {
            for midi in 0..=127u8 {
                let degree = degree_for(midi, &key);
                assert_ne!(degree.accidental, Accidental::Sharp);
            }
        }
    }
}
