//! Key detection
//!
//! Builds a duration-weighted chroma vector from every melodic note and
//! correlates each of its twelve rotations against the Krumhansl-Kessler
//! major and minor profiles.

use log::debug;

use crate::model::{KeySignature, Mode, Track};

pub const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
pub const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

const DEFAULT_OCTAVE: i32 = 4;

/// The winning candidate of the 24-key search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyCandidate {
    pub root: u8,
    pub mode: Mode,
    pub correlation: f64,
}

impl KeyCandidate {
    /// Correlation scaled to 0-100
    pub fn confidence(&self) -> u8 {
        (self.correlation * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Detect the key of all non-drum tracks
pub fn detect_key(tracks: &[Track]) -> KeySignature {
    let (chroma, total_duration) = build_chroma(tracks);

    if total_duration <= 0.0 {
        debug!("No melodic duration to analyse, using the default key");
        return KeySignature::default();
    }

    let best = estimate_from_chroma(&chroma);
    let average_octave = average_root_octave(tracks, best.root);
    let key = KeySignature::new(best.root, best.mode, best.confidence(), average_octave);

    debug!(
        "Detected key {} {} (confidence {}, octave {})",
        key.root,
        key.mode.as_str(),
        key.confidence,
        key.average_octave
    );

    key
}

/// Duration-weighted pitch-class histogram plus the total duration
pub fn build_chroma(tracks: &[Track]) -> ([f64; 12], f64) {
    let mut chroma = [0.0; 12];
    let mut total_duration = 0.0;

    for note in tracks.iter().filter(|t| !t.is_drum).flat_map(|t| &t.notes) {
        let duration = note.duration();
        chroma[note.pitch_class() as usize] += duration;
        total_duration += duration;
    }

    (chroma, total_duration)
}

/// Pick the best of the 24 major/minor candidates for a chroma vector.
///
/// Majors are tried before minors and roots in ascending order; only a
/// strictly greater correlation replaces the current best.
pub fn estimate_from_chroma(chroma: &[f64; 12]) -> KeyCandidate {
    let mut best = KeyCandidate {
        root: 0,
        mode: Mode::Major,
        correlation: f64::NEG_INFINITY,
    };

    for (mode, profile) in [(Mode::Major, &MAJOR_PROFILE), (Mode::Minor, &MINOR_PROFILE)] {
        for root in 0..12u8 {
            let r = correlation(&rotate(chroma, root as usize), profile);
            if r > best.correlation {
                best = KeyCandidate {
                    root,
                    mode,
                    correlation: r,
                };
            }
        }
    }

    best
}

/// Shift so that bin `root` lands at index 0
fn rotate(chroma: &[f64; 12], root: usize) -> [f64; 12] {
    let mut rotated = [0.0; 12];
    for (i, value) in rotated.iter_mut().enumerate() {
        *value = chroma[(i + root) % 12];
    }
    rotated
}

/// Pearson correlation; 0 when either side has no variance
pub fn correlation(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;

    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    if den_x == 0.0 || den_y == 0.0 {
        return 0.0;
    }

    let r = num / (den_x * den_y).sqrt();
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

fn average_root_octave(tracks: &[Track], root: u8) -> i32 {
    let octaves: Vec<i32> = tracks
        .iter()
        .filter(|t| !t.is_drum)
        .flat_map(|t| &t.notes)
        .filter(|n| n.pitch_class() == root)
        .map(|n| (n.midi / 12) as i32)
        .collect();

    if octaves.is_empty() {
        return DEFAULT_OCTAVE;
    }

    let mean = octaves.iter().sum::<i32>() as f64 / octaves.len() as f64;
    mean.round() as i32
}
