//! MIDI to Strudel converter library
//!
//! Decodes Standard MIDI Files into the tracks consumed by `strudel_notation`.

pub mod midi;

// Re-export main types for convenience
pub use midi::{DecodeError, MidiData};
