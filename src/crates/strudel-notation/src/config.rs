//! Conversion settings
//!
//! `Config` is the caller-owned snapshot handed to the generator. The source
//! tempo and time signature are fixed at construction: every time-to-cycle
//! calculation uses them, and they are what the playback values reset to.
//! `NotationOptions` holds the style settings that can be loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::model::KeySignature;

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_GLOBAL_SOUND: &str = "triangle";
pub const MIN_PRECISION: u32 = 2;
pub const MAX_PRECISION: u32 = 10;
/// Largest numerator a MIDI time signature event can carry
pub const MAX_NUMERATOR: u32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Replace a zero numerator or denominator with 4/4 and cap the numerator
    pub fn sanitized(self) -> Self {
        if self.numerator == 0 || self.denominator == 0 {
            Self::default()
        } else {
            Self::new(self.numerator.min(MAX_NUMERATOR), self.denominator)
        }
    }

    /// Quarter-note beats in one bar (6/8 -> 3, 7/8 -> 3.5)
    pub fn beats_per_bar(&self) -> f64 {
        let sig = self.sanitized();
        sig.numerator as f64 * (4.0 / sig.denominator as f64)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotationType {
    /// Pitch names such as `c4`
    #[default]
    Absolute,
    /// Scale degrees against the playback key
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleUnit {
    #[default]
    Bar,
    Beat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingStyle {
    /// `c4@0.25`
    #[default]
    ExplicitDuration,
    /// `[c4 - e4 -]`
    BracketSubdivision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeOptions {
    pub enabled: bool,
    pub threshold_ms: f64,
    /// Percent, 0-100
    pub strength: f64,
    /// Grid lines per beat
    pub grid: u32,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_ms: 50.0,
            strength: 100.0,
            grid: 4,
        }
    }
}

/// Style settings independent of the loaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotationOptions {
    pub notation_type: NotationType,
    pub cycle_unit: CycleUnit,
    pub timing_style: TimingStyle,
    pub quantize: QuantizeOptions,
    pub include_velocity: bool,
    pub measures_per_line: u32,
    /// Decimal places for durations and velocities
    pub duration_precision: u32,
    pub use_auto_mapping: bool,
    pub global_sound: String,
}

impl Default for NotationOptions {
    fn default() -> Self {
        Self {
            notation_type: NotationType::default(),
            cycle_unit: CycleUnit::default(),
            timing_style: TimingStyle::default(),
            quantize: QuantizeOptions::default(),
            include_velocity: false,
            measures_per_line: 1,
            duration_precision: 4,
            use_auto_mapping: false,
            global_sound: DEFAULT_GLOBAL_SOUND.to_string(),
        }
    }
}

impl NotationOptions {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Self>(json).map(Self::sanitized)
    }

    /// Clamp out-of-range values to something the generator can use
    pub fn sanitized(mut self) -> Self {
        self.measures_per_line = self.measures_per_line.max(1);
        self.duration_precision = self.duration_precision.clamp(MIN_PRECISION, MAX_PRECISION);
        self.quantize.grid = self.quantize.grid.max(1);
        self.quantize.threshold_ms = finite_or(self.quantize.threshold_ms, 0.0).max(0.0);
        self.quantize.strength = finite_or(self.quantize.strength, 0.0).clamp(0.0, 100.0);
        if self.global_sound.trim().is_empty() {
            self.global_sound = DEFAULT_GLOBAL_SOUND.to_string();
        }
        self
    }

    /// Smallest distinguishable amount of time, in cycles
    pub fn epsilon(&self) -> f64 {
        10f64.powi(-(self.duration_precision.clamp(MIN_PRECISION, MAX_PRECISION) as i32))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    bpm: f64,
    source_bpm: f64,
    time_signature: TimeSignature,
    source_time_signature: TimeSignature,
    key: Option<KeySignature>,
    playback_key: Option<KeySignature>,
    pub options: NotationOptions,
}

impl Config {
    /// Build a config for a freshly decoded file; playback values start at the source values
    pub fn new(
        source_bpm: f64,
        source_time_signature: TimeSignature,
        key: Option<KeySignature>,
    ) -> Self {
        let source_bpm = sanitize_bpm(source_bpm);
        let source_time_signature = source_time_signature.sanitized();

        Self {
            bpm: source_bpm,
            source_bpm,
            time_signature: source_time_signature,
            source_time_signature,
            playback_key: key.clone(),
            key,
            options: NotationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: NotationOptions) -> Self {
        self.options = options.sanitized();
        self
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn source_bpm(&self) -> f64 {
        self.source_bpm
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = if bpm.is_finite() && bpm > 0.0 {
            bpm
        } else {
            self.source_bpm
        };
    }

    pub fn reset_bpm(&mut self) {
        self.bpm = self.source_bpm;
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn source_time_signature(&self) -> TimeSignature {
        self.source_time_signature
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = if time_signature.numerator == 0 || time_signature.denominator == 0 {
            self.source_time_signature
        } else {
            time_signature.sanitized()
        };
    }

    pub fn reset_time_signature(&mut self) {
        self.time_signature = self.source_time_signature;
    }

    /// The key detected from the source notes
    pub fn key(&self) -> Option<&KeySignature> {
        self.key.as_ref()
    }

    pub fn playback_key(&self) -> Option<&KeySignature> {
        self.playback_key.as_ref()
    }

    pub fn set_playback_key(&mut self, key: KeySignature) {
        self.playback_key = Some(key);
    }

    pub fn reset_playback_key(&mut self) {
        self.playback_key = self.key.clone();
    }

    /// Playback key, then detected key, then C major around octave 4
    pub fn effective_playback_key(&self) -> KeySignature {
        self.playback_key
            .clone()
            .or_else(|| self.key.clone())
            .unwrap_or_default()
    }

    /// Playback beats per cycle, used only for the emitted tempo
    pub fn playback_beats_per_cycle(&self) -> f64 {
        match self.options.cycle_unit {
            CycleUnit::Bar => self.time_signature.beats_per_bar(),
            CycleUnit::Beat => 1.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_BPM, TimeSignature::default(), None)
    }
}

fn sanitize_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() && bpm > 0.0 {
        bpm
    } else {
        DEFAULT_BPM
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mode;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bpm(), 120.0);
        assert_eq!(config.source_time_signature(), TimeSignature::new(4, 4));
        assert_eq!(config.options.notation_type, NotationType::Absolute);
        assert_eq!(config.options.cycle_unit, CycleUnit::Bar);
        assert_eq!(config.options.timing_style, TimingStyle::ExplicitDuration);
        assert!(!config.options.quantize.enabled);
        assert_eq!(config.options.quantize.threshold_ms, 50.0);
        assert_eq!(config.options.quantize.strength, 100.0);
        assert_eq!(config.options.measures_per_line, 1);
        assert_eq!(config.options.duration_precision, 4);
        assert_eq!(config.options.global_sound, "triangle");
    }

    #[test]
    fn test_playback_changes_leave_source_untouched() {
        let mut config = Config::new(96.0, TimeSignature::new(3, 4), None);
        config.set_bpm(140.0);
        config.set_time_signature(TimeSignature::new(6, 8));

        assert_eq!(config.bpm(), 140.0);
        assert_eq!(config.source_bpm(), 96.0);
        assert_eq!(config.source_time_signature(), TimeSignature::new(3, 4));

        config.reset_bpm();
        config.reset_time_signature();
        assert_eq!(config.bpm(), 96.0);
        assert_eq!(config.time_signature(), TimeSignature::new(3, 4));
    }

    #[test]
    fn test_degenerate_source_values_are_sanitized() {
        let config = Config::new(f64::NAN, TimeSignature::new(0, 4), None);
        assert_eq!(config.source_bpm(), DEFAULT_BPM);
        assert_eq!(config.source_time_signature(), TimeSignature::default());

        let mut config = Config::new(-5.0, TimeSignature::new(7, 0), None);
        assert_eq!(config.source_bpm(), DEFAULT_BPM);
        config.set_bpm(0.0);
        assert_eq!(config.bpm(), DEFAULT_BPM);
    }

    #[test]
    fn test_numerator_is_capped() {
        let config = Config::new(120.0, TimeSignature::new(1_000_000_000, 1), None);
        assert_eq!(config.source_time_signature(), TimeSignature::new(MAX_NUMERATOR, 1));

        let mut config = Config::default();
        config.set_time_signature(TimeSignature::new(u32::MAX, 4));
        assert_eq!(config.time_signature(), TimeSignature::new(MAX_NUMERATOR, 4));
    }

    #[test]
    fn test_playback_key_reset() {
        let detected = KeySignature::new(9, Mode::Minor, 72, 5);
        let mut config = Config::new(120.0, TimeSignature::default(), Some(detected.clone()));
        assert_eq!(config.playback_key(), Some(&detected));

        config.set_playback_key(KeySignature::new(2, Mode::Major, 72, 4));
        assert_eq!(config.effective_playback_key().root, "D");
        assert_eq!(config.key(), Some(&detected));

        config.reset_playback_key();
        assert_eq!(config.effective_playback_key(), detected);
    }

    #[test]
    fn test_effective_key_without_detection() {
        let config = Config::default();
        assert_eq!(config.effective_playback_key(), KeySignature::default());
    }

    #[test]
    fn test_beats_per_cycle() {
        let mut config = Config::new(120.0, TimeSignature::new(6, 8), None);
        assert_eq!(config.playback_beats_per_cycle(), 3.0);
        config.set_time_signature(TimeSignature::new(7, 8));
        assert_eq!(config.playback_beats_per_cycle(), 3.5);
        config.options.cycle_unit = CycleUnit::Beat;
        assert_eq!(config.playback_beats_per_cycle(), 1.0);
    }

    #[test]
    fn test_options_from_json() {
        let options = NotationOptions::from_json_str(
            r#"{
                "notation_type": "relative",
                "timing_style": "bracket_subdivision",
                "quantize": { "enabled": true, "strength": 250 },
                "measures_per_line": 0,
                "duration_precision": 99
            }"#,
        )
        .unwrap();

        assert_eq!(options.notation_type, NotationType::Relative);
        assert_eq!(options.timing_style, TimingStyle::BracketSubdivision);
        assert!(options.quantize.enabled);
        assert_eq!(options.quantize.strength, 100.0);
        assert_eq!(options.quantize.threshold_ms, 50.0);
        assert_eq!(options.measures_per_line, 1);
        assert_eq!(options.duration_precision, MAX_PRECISION);
        assert_eq!(options.cycle_unit, CycleUnit::Bar);
    }

    #[test]
    fn test_options_from_bad_json() {
        assert!(NotationOptions::from_json_str("{ \"cycle_unit\": \"fortnight\" }").is_err());
    }

    #[test]
    fn test_epsilon_follows_precision() {
        let mut options = NotationOptions::default();
        assert!((options.epsilon() - 0.0001).abs() < 1e-12);
        options.duration_precision = 2;
        assert!((options.epsilon() - 0.01).abs() < 1e-12);
        options.duration_precision = 0;
        assert!((options.epsilon() - 0.01).abs() < 1e-12);
    }
}
