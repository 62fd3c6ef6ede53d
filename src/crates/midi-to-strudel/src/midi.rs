//! Standard MIDI File decoding
//!
//! Each SMF track becomes one `Track` with notes in absolute seconds. Times
//! follow every tempo change in the file; the reported tempo and time
//! signature are the first ones found.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, warn};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use strudel_notation::drums::DEFAULT_DRUM_BANK;
use strudel_notation::note::note_num_to_str;
use strudel_notation::{Note, TimeSignature, Track};

const DEFAULT_MPQN: u32 = 500_000;
const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

/// Zero-based channel reserved for percussion by General MIDI
pub const PERCUSSION_CHANNEL: u8 = 9;

/// General MIDI instrument families, eight programs each
const FAMILIES: [&str; 16] = [
    "piano",
    "chromatic percussion",
    "organ",
    "guitar",
    "bass",
    "strings",
    "ensemble",
    "brass",
    "reed",
    "pipe",
    "synth lead",
    "synth pad",
    "synth effects",
    "world",
    "percussive",
    "sound effects",
];

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Failed to read MIDI file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse MIDI file: {0}")]
    Parse(#[from] midly::Error),

    #[error("Unsupported MIDI timing: {0}")]
    UnsupportedTiming(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Debug, Clone)]
pub struct MidiData {
    /// First tempo in the file, rounded; 120 when absent
    pub bpm: f64,
    /// First time signature in the file; 4/4 when absent
    pub time_signature: TimeSignature,
    pub tracks: Vec<Track>,
}

impl MidiData {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let smf = Smf::parse(data)?;

        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) if tpb.as_int() > 0 => tpb.as_int() as u64,
            Timing::Metrical(_) => {
                return Err(DecodeError::UnsupportedTiming("zero ticks per beat".into()))
            }
            Timing::Timecode(fps, subframe) => {
                return Err(DecodeError::UnsupportedTiming(format!(
                    "SMPTE timecode ({} fps, {} subframes)",
                    fps.as_int(),
                    subframe
                )))
            }
        };

        debug!(
            "MIDI format: {:?}, tracks: {}, ticks per beat: {}",
            smf.header.format,
            smf.tracks.len(),
            ticks_per_beat
        );

        let tempo_map = TempoMap::from_smf(&smf, ticks_per_beat);
        let bpm = first_tempo(&smf)
            .map(|mpqn| (MICROSECONDS_PER_MINUTE / mpqn as f64).round())
            .filter(|bpm| bpm.is_finite() && *bpm > 0.0)
            .unwrap_or(120.0);
        let time_signature = first_time_signature(&smf).unwrap_or_default();
        let last_tick = smf
            .tracks
            .iter()
            .map(|track| track.iter().map(|e| e.delta.as_int() as u64).sum::<u64>())
            .max()
            .unwrap_or(0);

        let tracks = smf
            .tracks
            .iter()
            .enumerate()
            .map(|(index, events)| decode_track(index, events, &tempo_map, last_tick))
            .collect();

        Ok(MidiData {
            bpm,
            time_signature,
            tracks,
        })
    }
}

/// Tick to seconds conversion honouring tempo changes
struct TempoMap {
    ticks_per_beat: u64,
    /// (start tick, microseconds per quarter, seconds at start), ascending
    segments: Vec<(u64, u32, f64)>,
}

impl TempoMap {
    fn from_smf(smf: &Smf, ticks_per_beat: u64) -> Self {
        let mut changes: Vec<(u64, u32)> = vec![(0, DEFAULT_MPQN)];
        for track in &smf.tracks {
            let mut abs_tick: u64 = 0;
            for event in track {
                abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);
                if let TrackEventKind::Meta(MetaMessage::Tempo(mpqn)) = event.kind {
                    debug!("Tempo change at tick {} -> {} us/qn", abs_tick, mpqn.as_int());
                    changes.push((abs_tick, mpqn.as_int()));
                }
            }
        }
        changes.sort_by_key(|(tick, _)| *tick);

        let mut segments: Vec<(u64, u32, f64)> = Vec::with_capacity(changes.len());
        for (tick, mpqn) in changes {
            let seconds = match segments.last() {
                Some(&(start, last_mpqn, at)) => {
                    at + span_seconds(tick - start, last_mpqn, ticks_per_beat)
                }
                None => 0.0,
            };
            // A later change at the same tick replaces the earlier one
            if segments.last().is_some_and(|&(start, _, _)| start == tick) {
                segments.pop();
            }
            segments.push((tick, mpqn, seconds));
        }

        Self {
            ticks_per_beat,
            segments,
        }
    }

    fn seconds(&self, tick: u64) -> f64 {
        match self.segments.iter().rfind(|(start, _, _)| *start <= tick) {
            Some(&(start, mpqn, at)) => at + span_seconds(tick - start, mpqn, self.ticks_per_beat),
            None => span_seconds(tick, DEFAULT_MPQN, self.ticks_per_beat),
        }
    }
}

fn span_seconds(ticks: u64, mpqn: u32, ticks_per_beat: u64) -> f64 {
    ticks as f64 * (mpqn as f64 / 1_000_000.0) / ticks_per_beat as f64
}

fn first_tempo(smf: &Smf) -> Option<u32> {
    first_meta(smf, |meta| match meta {
        MetaMessage::Tempo(mpqn) => Some(mpqn.as_int()),
        _ => None,
    })
}

fn first_time_signature(smf: &Smf) -> Option<TimeSignature> {
    first_meta(smf, |meta| match meta {
        MetaMessage::TimeSignature(numerator, denominator_pow, _, _) => {
            let denominator = 1u32.checked_shl(*denominator_pow as u32)?;
            Some(TimeSignature::new(*numerator as u32, denominator).sanitized())
        }
        _ => None,
    })
}

/// Earliest matching meta event by absolute tick, ties broken by track order
fn first_meta<T>(smf: &Smf, pick: impl Fn(&MetaMessage) -> Option<T>) -> Option<T> {
    let mut found: Option<(u64, T)> = None;
    for track in &smf.tracks {
        let mut abs_tick: u64 = 0;
        for event in track {
            abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);
            if found.as_ref().is_some_and(|(tick, _)| *tick <= abs_tick) {
                break;
            }
            if let TrackEventKind::Meta(meta) = &event.kind {
                if let Some(value) = pick(meta) {
                    found = Some((abs_tick, value));
                    break;
                }
            }
        }
    }
    found.map(|(_, value)| value)
}

/// Display name in the decoder's convention, e.g. "C#4"
fn note_name(key: u8) -> String {
    note_num_to_str(key).to_uppercase()
}

/// Instrument family of a program number, or "drums" on the percussion channel
fn instrument_family(channel: Option<u8>, program: u8) -> String {
    if channel == Some(PERCUSSION_CHANNEL) {
        return "drums".to_string();
    }
    FAMILIES[(program as usize / 8) % FAMILIES.len()].to_string()
}

struct NoteInterval {
    key: u8,
    start_tick: u64,
    end_tick: u64,
    velocity: u8,
}

fn decode_track(
    index: usize,
    events: &[TrackEvent],
    tempo_map: &TempoMap,
    last_tick: u64,
) -> Track {
    let mut abs_tick: u64 = 0;
    let mut name: Option<String> = None;
    let mut channel: Option<u8> = None;
    let mut program: u8 = 0;
    let mut open_notes: BTreeMap<(u8, u8), Vec<(u64, u8)>> = BTreeMap::new();
    let mut intervals: Vec<NoteInterval> = Vec::new();

    for event in events {
        abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);

        match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(bytes)) if name.is_none() => {
                let decoded = String::from_utf8_lossy(bytes);
                let cleaned = decoded.trim_end_matches('\0').trim();
                if !cleaned.is_empty() {
                    name = Some(cleaned.to_string());
                }
            }
            TrackEventKind::Midi { channel: ch, message } => {
                let ch = ch.as_int();
                if channel.is_none() {
                    channel = Some(ch);
                }

                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        open_notes
                            .entry((ch, key.as_int()))
                            .or_default()
                            .push((abs_tick, vel.as_int()));
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let stack = open_notes.get_mut(&(ch, key.as_int()));
                        match stack.filter(|s| !s.is_empty()).map(|s| s.remove(0)) {
                            Some((start_tick, velocity)) => intervals.push(NoteInterval {
                                key: key.as_int(),
                                start_tick,
                                end_tick: abs_tick,
                                velocity,
                            }),
                            None => debug!(
                                "Ignoring NoteOff without NoteOn for {} on channel {} at tick {}",
                                key.as_int(),
                                ch,
                                abs_tick
                            ),
                        }
                    }
                    MidiMessage::ProgramChange { program: prog } => {
                        program = prog.as_int();
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    for ((ch, key), stack) in open_notes {
        for (start_tick, velocity) in stack {
            let end_tick = if last_tick > start_tick {
                last_tick
            } else {
                start_tick + tempo_map.ticks_per_beat
            };
            warn!(
                "Unclosed NoteOn for {}, channel: {} at tick: {} auto-closing at: {}",
                key, ch, start_tick, end_tick
            );
            intervals.push(NoteInterval {
                key,
                start_tick,
                end_tick,
                velocity,
            });
        }
    }

    let mut notes: Vec<Note> = intervals
        .iter()
        .map(|interval| {
            Note::new(
                note_name(interval.key),
                interval.key,
                tempo_map.seconds(interval.start_tick),
                tempo_map.seconds(interval.end_tick),
                interval.velocity as f64 / 127.0,
            )
        })
        .collect();
    notes.sort_by(|a, b| a.note_on.total_cmp(&b.note_on).then(a.midi.cmp(&b.midi)));

    let name = name.unwrap_or_else(|| format!("Track {}", index + 1));
    let is_drum = channel == Some(PERCUSSION_CHANNEL) || name.to_lowercase().contains("drum");

    debug!(
        "Track {} '{}': {} notes, channel {:?}, program {}, drum: {}",
        index,
        name,
        notes.len(),
        channel,
        program,
        is_drum
    );

    let mut track = Track::new(format!("track-{}", index), name, notes);
    track.instrument_family = Some(instrument_family(channel, program));
    track.is_drum = is_drum;
    track.drum_bank = is_drum.then(|| DEFAULT_DRUM_BANK.to_string());
    track
}
