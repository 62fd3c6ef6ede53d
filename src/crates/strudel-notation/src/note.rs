/// Pitch class names used for key roots, indexed by semitone above C
pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Convert a MIDI note number to a string representation (e.g., "c4", "g#5")
pub fn note_num_to_str(note_num: u8) -> String {
    const NOTE_NAMES: [&str; 12] = [
        "c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "b"
    ];

    let note_name = NOTE_NAMES[(note_num % 12) as usize];
    let octave = (note_num / 12) as i32 - 1;

    format!("{}{}", note_name, octave)
}

/// Semitone index (0-11) of a pitch class name such as "C", "f#", "Eb" or "Bb".
pub fn pitch_class_index(name: &str) -> Option<u8> {
    let name = name.trim().to_lowercase();
    let mut chars = name.chars();
    let base: i32 = match chars.next()? {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };

    let mut offset = 0;
    for accidental in chars {
        match accidental {
            '#' | 's' => offset += 1,
            'b' => offset -= 1,
            _ => return None,
        }
    }

    Some((base + offset).rem_euclid(12) as u8)
}

/// Parse a pitch name like "C4", "F#5", "Bb-1" into its normalized lowercase form.
///
/// Returns `None` when the name is not a letter, optional accidentals and an
/// integer octave, or when it falls outside the MIDI range.
pub fn parse_pitch_name(name: &str) -> Option<String> {
    let name = name.trim().to_lowercase();
    let split = name
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_ascii_digit() || *c == '-')
        .map(|(i, _)| i)?;

    let (pitch, octave_str) = name.split_at(split);
    pitch_class_index(pitch)?;
    let octave: i32 = octave_str.parse().ok()?;
    if !(-1..=9).contains(&octave) {
        return None;
    }

    // Accidentals may cross an octave boundary (cb4 == b3), so range-check the raw sum
    let letter_offset = match pitch.as_bytes()[0] {
        b'c' => 0,
        b'd' => 2,
        b'e' => 4,
        b'f' => 5,
        b'g' => 7,
        b'a' => 9,
        _ => 11,
    };
    let shift = pitch.chars().skip(1).fold(0, |acc, c| if c == 'b' { acc - 1 } else { acc + 1 });
    let midi_num = (octave + 1) * 12 + letter_offset + shift;

    if (0..=127).contains(&midi_num) {
        Some(name)
    } else {
        None
    }
}

/// Format a number rounded to `precision` decimal places with trailing zeros trimmed.
pub fn format_decimal(value: f64, precision: u32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let formatted = format!("{:.*}", precision as usize, value);
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        formatted.as_str()
    };

    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
