/// Drum machine banks available in Strudel's sample library
pub const DRUM_BANKS: [&str; 5] = [
    "RolandTR909",
    "RolandTR808",
    "RolandTR707",
    "LinnDrum",
    "GM",
];

/// Bank used when a drum track has none
pub const DEFAULT_DRUM_BANK: &str = "RolandTR909";

/// Sample name for drum notes outside the map
pub const GENERIC_HIT: &str = "perc";

/// Convert a General MIDI percussion note number to a drum machine sample name.
///
/// Only names every bank provides are used, so the bank modifier can be
/// swapped freely. Unmapped numbers return `None`.
pub fn gm_drum_to_sample(note_num: u8) -> Option<&'static str> {
    match note_num {
        // Bass Drums
        35 | 36 => Some("bd"),

        // Snares
        37 => Some("rim"), // Side Stick
        38 | 40 => Some("sd"),
        39 => Some("cp"), // Hand Clap

        // Toms
        41 | 43 => Some("lt"),
        45 | 47 => Some("mt"),
        48 | 50 => Some("ht"),

        // Hi-Hats
        42 | 44 => Some("hh"), // Closed, Pedal
        46 => Some("oh"),

        // Cymbals
        49 | 52 | 55 | 57 => Some("cr"),
        51 | 53 | 59 => Some("rd"),

        // Percussion
        54 => Some("tb"), // Tambourine
        56 => Some("cb"), // Cowbell
        69 | 70 | 82 => Some("sh"), // Cabasa, Maracas, Shaker
        75 => Some("cp"), // Claves

        _ => None,
    }
}

/// The track's bank, or the default when unset or blank
pub fn drum_bank(bank: Option<&str>) -> &str {
    match bank.map(str::trim) {
        Some(b) if !b.is_empty() => b,
        _ => DEFAULT_DRUM_BANK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_drums() {
        assert_eq!(gm_drum_to_sample(36), Some("bd")); // Bass drum
        assert_eq!(gm_drum_to_sample(38), Some("sd")); // Snare
        assert_eq!(gm_drum_to_sample(42), Some("hh")); // Closed hi-hat
        assert_eq!(gm_drum_to_sample(46), Some("oh")); // Open hi-hat
        assert_eq!(gm_drum_to_sample(49), Some("cr")); // Crash
        assert_eq!(gm_drum_to_sample(82), Some("sh")); // Shaker
    }

    #[test]
    fn test_unmapped_drums() {
        assert_eq!(gm_drum_to_sample(60), None);
        assert_eq!(gm_drum_to_sample(0), None);
    }

    #[test]
    fn test_drum_bank_default() {
        assert_eq!(drum_bank(None), "RolandTR909");
        assert_eq!(drum_bank(Some("  ")), "RolandTR909");
        assert_eq!(drum_bank(Some("LinnDrum")), "LinnDrum");
        assert!(DRUM_BANKS.contains(&DEFAULT_DRUM_BANK));
    }
}
