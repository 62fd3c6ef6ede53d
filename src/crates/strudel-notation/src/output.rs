use log::{debug, error, warn};
use serde::Serialize;

use crate::ast::Pattern;
use crate::config::{Config, MAX_PRECISION, MIN_PRECISION};
use crate::model::Track;
use crate::note::format_decimal;
use crate::track::TrackBuilder;

pub struct OutputFormatter {
    tab_size: usize,
}

impl OutputFormatter {
    pub fn new(tab_size: usize) -> Self {
        Self { tab_size }
    }

    /// Patterns for every visible track, in input order
    pub fn build_patterns(&self, tracks: &[Track], config: &Config) -> Vec<Pattern> {
        let builder = TrackBuilder::new(config);
        tracks
            .iter()
            .filter(|track| {
                if track.is_hidden() {
                    debug!("Skipping hidden track '{}'", track.name);
                }
                track.is_visible()
            })
            .map(|track| builder.build(track))
            .collect()
    }

    /// Build JSON output of the AST
    pub fn build_output_json(&self, tracks: &[Track], config: &Config) -> String {
        #[derive(Serialize)]
        struct JsonOutput {
            bpm: f64,
            beats_per_cycle: f64,
            tracks: Vec<Pattern>,
        }

        let output = JsonOutput {
            bpm: config.bpm(),
            beats_per_cycle: config.playback_beats_per_cycle(),
            tracks: self.build_patterns(tracks, config),
        };

        serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
            error!("Error serializing to JSON: {}", e);
            "{}".to_string()
        })
    }

    /// Full Strudel program: tempo header, then one `$:` block per visible track
    pub fn build_output(&self, tracks: &[Track], config: &Config) -> String {
        let patterns = self.build_patterns(tracks, config);
        if patterns.is_empty() {
            return String::new();
        }

        let precision = config
            .options
            .duration_precision
            .clamp(MIN_PRECISION, MAX_PRECISION);
        let mut output = vec![format!("{}\n", self.tempo_header(config, precision))];

        for (idx, pattern) in patterns.iter().enumerate() {
            output.push(format!("// Track {}: {}", idx + 1, pattern.name));

            if let Err(e) = pattern.validate() {
                warn!("Track {} validation error: {}", idx + 1, e);
            }

            let pattern_str = pattern.to_strudel(precision, &self.get_indent(1));
            output.push(format!("$: {}\n", pattern_str));
        }

        output.join("\n")
    }

    /// `setcpm(bpm/beats)` from the playback tempo and time signature
    fn tempo_header(&self, config: &Config, precision: u32) -> String {
        let bpm = format_decimal(config.bpm(), precision);
        let beats = config.playback_beats_per_cycle();
        if beats == 1.0 {
            format!("setcpm({})", bpm)
        } else {
            format!("setcpm({}/{})", bpm, format_decimal(beats, precision))
        }
    }

    fn get_indent(&self, tabs: usize) -> String {
        " ".repeat(self.tab_size * tabs)
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CycleUnit, NotationOptions, TimeSignature};
    use crate::model::Note;

    fn piano() -> Track {
        Track::new(
            "track-0",
            "Piano",
            vec![Note::new("C4", 60, 0.0, 0.5, 1.0)],
        )
    }

    #[test]
    fn test_build_output() {
        let output = OutputFormatter::default().build_output(&[piano()], &Config::default());
        assert_eq!(
            output,
            "setcpm(120/4)\n\n// Track 1: Piano\n$: note(`<\n  [c4@0.25 -@0.75]>`).sound(\"triangle\")\n"
        );
    }

    #[test]
    fn test_tracks_separated_by_blank_line() {
        let mut bass = piano();
        bass.name = "Bass".into();
        let output = OutputFormatter::default().build_output(&[piano(), bass], &Config::default());

        assert!(output.contains(">`).sound(\"triangle\")\n\n// Track 2: Bass\n$: note(`<"));
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn test_hidden_tracks_skipped_and_numbering_counts_visible() {
        let mut hidden = piano();
        hidden.name = "Muted".into();
        hidden.hidden = Some(true);
        let empty = Track::new("track-1", "Empty", vec![]);
        let mut lead = piano();
        lead.name = "Lead".into();

        let output =
            OutputFormatter::default().build_output(&[hidden, empty, lead], &Config::default());
        assert!(!output.contains("Muted"));
        assert!(!output.contains("Empty"));
        assert!(output.contains("// Track 1: Lead"));
    }

    #[test]
    fn test_no_visible_tracks_is_empty() {
        let formatter = OutputFormatter::default();
        assert_eq!(formatter.build_output(&[], &Config::default()), "");

        let empty = Track::new("track-0", "Empty", vec![]);
        assert_eq!(formatter.build_output(&[empty], &Config::default()), "");
    }

    #[test]
    fn test_header_uses_playback_values() {
        let mut config = Config::new(100.0, TimeSignature::new(4, 4), None);
        config.set_bpm(90.5);
        config.set_time_signature(TimeSignature::new(7, 8));
        let output = OutputFormatter::default().build_output(&[piano()], &config);
        assert!(output.starts_with("setcpm(90.5/3.5)\n\n"));

        config.options.cycle_unit = CycleUnit::Beat;
        let output = OutputFormatter::default().build_output(&[piano()], &config);
        assert!(output.starts_with("setcpm(90.5)\n\n"));
    }

    #[test]
    fn test_tab_size() {
        let config = Config::default().with_options(NotationOptions {
            measures_per_line: 2,
            ..Default::default()
        });
        let output = OutputFormatter::new(4).build_output(&[piano()], &config);
        assert!(output.contains("$: note(`<\n    [c4@0.25 -@1.75]>`).sound(\"triangle\").slow(2)\n"));
    }

    #[test]
    fn test_json_output() {
        let json = OutputFormatter::default().build_output_json(&[piano()], &Config::default());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["bpm"], 120.0);
        assert_eq!(value["beats_per_cycle"], 4.0);
        assert_eq!(value["tracks"][0]["name"], "Piano");
        assert_eq!(value["tracks"][0]["sound"], "triangle");
    }
}
