//! Strudel notation generation for decoded MIDI tracks
//!
//! This library estimates the key of a set of tracks, quantizes note timing,
//! maps track names to Strudel sounds and renders everything as Strudel
//! mini notation. It performs no I/O; callers hand in decoded tracks and a
//! `Config` snapshot and get one text blob back.

pub mod ast;
pub mod config;
pub mod drums;
pub mod instruments;
pub mod key;
pub mod model;
pub mod note;
pub mod output;
pub mod quantize;
pub mod scale;
pub mod track;

// Re-export main types for convenience
pub use config::{
    Config, CycleUnit, NotationOptions, NotationType, QuantizeOptions, TimeSignature, TimingStyle,
};
pub use instruments::{auto_sound, resolve_sound, SoundChoice};
pub use key::detect_key;
pub use model::{KeySignature, Mode, Note, Track};
pub use output::OutputFormatter;
pub use quantize::{quantize_time, Quantizer};
pub use track::TrackBuilder;

/// Render every visible track as one Strudel program.
///
/// Returns an empty string when no track is visible.
pub fn generate(tracks: &[Track], config: &Config) -> String {
    OutputFormatter::default().build_output(tracks, config)
}
