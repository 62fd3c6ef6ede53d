//! Track to pattern conversion
//!
//! Notes are moved from absolute seconds onto the cycle grid of the source
//! tempo, grouped into chords and split into windows of `measures_per_line`
//! cycles. Each window becomes one line, written either with explicit `@`
//! durations or as beat slots subdivided into equal cells.

use log::debug;

use crate::ast::{Pattern, PatternKind, Step};
use crate::config::{Config, CycleUnit, NotationType, TimingStyle, MAX_PRECISION, MIN_PRECISION};
use crate::drums::{drum_bank, gm_drum_to_sample, GENERIC_HIT};
use crate::instruments::resolve_sound;
use crate::model::{KeySignature, Note, Track};
use crate::note::{format_decimal, note_num_to_str, parse_pitch_name};
use crate::quantize::Quantizer;
use crate::scale::{degree_for, scale_name};

/// Cell counts tried for one beat, smallest first
const SUBDIVISIONS: [usize; 8] = [1, 2, 3, 4, 6, 8, 12, 16];

/// Notes starting later than this many cycles are dropped
pub const MAX_CYCLES: f64 = 100_000.0;

/// Cycle length derived from the source tempo and time signature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBase {
    pub seconds_per_beat: f64,
    /// Seconds per cycle
    pub cycle_len: f64,
}

impl TimeBase {
    pub fn from_config(config: &Config) -> Self {
        let seconds_per_beat = 60.0 / config.source_bpm();
        let seconds_per_bar = seconds_per_beat * config.source_time_signature().beats_per_bar();
        let cycle_len = match config.options.cycle_unit {
            CycleUnit::Bar => seconds_per_bar,
            CycleUnit::Beat => seconds_per_beat,
        };

        Self {
            seconds_per_beat,
            cycle_len,
        }
    }

    pub fn to_cycles(&self, seconds: f64) -> f64 {
        seconds / self.cycle_len
    }

    /// Length of one beat in cycles
    pub fn beat_cycles(&self) -> f64 {
        self.seconds_per_beat / self.cycle_len
    }
}

/// A rendered note token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Exact(String),
    /// The preferred form was unavailable and a default was used
    Fallback(String),
}

impl Rendered {
    pub fn into_token(self) -> String {
        match self {
            Rendered::Exact(token) | Rendered::Fallback(token) => token,
        }
    }

    fn map(self, f: impl FnOnce(String) -> String) -> Rendered {
        match self {
            Rendered::Exact(token) => Rendered::Exact(f(token)),
            Rendered::Fallback(token) => Rendered::Fallback(f(token)),
        }
    }
}

/// Outcome of fitting onsets to equal cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subdivision {
    /// `cells[i]` is the cell the i-th onset starts on
    Fit { count: usize, cells: Vec<usize> },
    Unfit,
}

/// Find the smallest cell count for which every offset lands on its own cell line.
///
/// `offsets` are ascending positions inside a span of length `span`.
pub fn fit_subdivision(offsets: &[f64], span: f64, epsilon: f64) -> Subdivision {
    if !span.is_finite() || span <= 0.0 {
        return Subdivision::Unfit;
    }

    for count in SUBDIVISIONS {
        let cell_len = span / count as f64;
        let mut cells: Vec<usize> = Vec::with_capacity(offsets.len());

        let fits = offsets.iter().all(|&offset| {
            let cell = (offset / cell_len).round();
            if !(0.0..count as f64).contains(&cell) || (offset - cell * cell_len).abs() > epsilon {
                return false;
            }
            let cell = cell as usize;
            if cells.last().is_some_and(|&last| last >= cell) {
                return false;
            }
            cells.push(cell);
            true
        });

        if fits {
            return Subdivision::Fit { count, cells };
        }
    }

    Subdivision::Unfit
}

/// A note placed on the cycle grid
#[derive(Debug, Clone)]
struct TimedNote<'a> {
    index: usize,
    onset: f64,
    duration: f64,
    note: &'a Note,
}

/// Notes starting together, rendered as one step
#[derive(Debug, Clone, PartialEq)]
struct Group {
    onset: f64,
    duration: f64,
    step: Step,
}

impl Group {
    fn end(&self) -> f64 {
        self.onset + self.duration
    }
}

pub struct TrackBuilder<'a> {
    config: &'a Config,
    time_base: TimeBase,
    quantizer: Option<Quantizer>,
    key: KeySignature,
    epsilon: f64,
}

impl<'a> TrackBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        let time_base = TimeBase::from_config(config);
        let quantize = &config.options.quantize;
        let quantizer = quantize
            .enabled
            .then(|| Quantizer::from_options(quantize, time_base.seconds_per_beat));

        Self {
            config,
            time_base,
            quantizer,
            key: config.effective_playback_key(),
            epsilon: config.options.epsilon(),
        }
    }

    fn precision(&self) -> u32 {
        self.config
            .options
            .duration_precision
            .clamp(MIN_PRECISION, MAX_PRECISION)
    }

    fn measures_per_line(&self) -> u32 {
        self.config.options.measures_per_line.max(1)
    }

    /// Build the pattern for one track
    pub fn build(&self, track: &Track) -> Pattern {
        let options = &self.config.options;
        let kind = if track.is_drum {
            PatternKind::Drum
        } else if options.notation_type == NotationType::Relative {
            PatternKind::Degree
        } else {
            PatternKind::Note
        };

        let timed = self.timed_notes(track);
        let groups = self.group_chords(track, &timed);
        let window = self.measures_per_line() as f64;

        let mut lines: Vec<Step> = Vec::new();
        for (index, groups) in self.split_windows(groups) {
            // Windows without a note starting in them stay silent
            lines.resize(index, Step::Rest);
            let start = index as f64 * window;
            let end = start + window;
            lines.push(match options.timing_style {
                TimingStyle::ExplicitDuration => sequence(self.render_span(&groups, start, end)),
                TimingStyle::BracketSubdivision => self.render_subdivided(&groups, start, end),
            });
        }

        let measures = self.measures_per_line();
        let mut pattern = Pattern {
            name: track.name.clone(),
            kind,
            lines,
            scale: None,
            sound: None,
            bank: None,
            slow: (measures > 1).then_some(measures),
        };

        match kind {
            PatternKind::Drum => {
                pattern.bank = Some(drum_bank(track.drum_bank.as_deref()).to_string());
            }
            PatternKind::Degree => {
                pattern.scale = Some(scale_name(&self.key));
                pattern.sound = Some(resolve_sound(track, self.config).as_str().to_string());
            }
            PatternKind::Note => {
                pattern.sound = Some(resolve_sound(track, self.config).as_str().to_string());
            }
        }

        debug!(
            "Track '{}': {} notes, {} lines, {:?}",
            track.name,
            timed.len(),
            pattern.lines.len(),
            kind
        );
        pattern
    }

    /// Token for a single note, including the velocity suffix when enabled
    pub fn render_note(&self, track: &Track, note: &Note) -> Rendered {
        let rendered = if track.is_drum {
            match gm_drum_to_sample(note.midi) {
                Some(sample) => Rendered::Exact(sample.to_string()),
                None => Rendered::Fallback(GENERIC_HIT.to_string()),
            }
        } else {
            match self.config.options.notation_type {
                NotationType::Absolute => match parse_pitch_name(&note.name) {
                    Some(name) => Rendered::Exact(name),
                    None => Rendered::Fallback(note_num_to_str(note.midi)),
                },
                NotationType::Relative => {
                    Rendered::Exact(degree_for(note.midi, &self.key).to_strudel())
                }
            }
        };

        if let Rendered::Fallback(token) = &rendered {
            debug!(
                "Track '{}': no direct token for note {} ({:?}), using '{}'",
                track.name, note.midi, note.name, token
            );
        }

        if !self.config.options.include_velocity {
            return rendered;
        }
        let velocity = if note.velocity.is_finite() {
            note.velocity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        rendered.map(|token| format!("{}:{}", token, format_decimal(velocity, self.precision())))
    }

    /// Notes in cycles, quantized when enabled, ordered by (cycle, onset, input index)
    fn timed_notes<'t>(&self, track: &'t Track) -> Vec<TimedNote<'t>> {
        let mut timed: Vec<TimedNote<'t>> = track
            .notes
            .iter()
            .enumerate()
            .filter_map(|(index, note)| {
                if !note.note_on.is_finite() {
                    debug!(
                        "Track '{}': skipping note {} with onset {}",
                        track.name, index, note.note_on
                    );
                    return None;
                }

                let mut onset = note.note_on.max(0.0);
                let mut duration = note.duration();
                if let Some(quantizer) = &self.quantizer {
                    onset = quantizer.quantize(onset).max(0.0);
                    let snapped = quantizer.quantize(duration);
                    // A duration snapped to nothing keeps its raw length
                    if self.time_base.to_cycles(snapped) >= self.epsilon {
                        duration = snapped;
                    }
                }

                let onset = self.time_base.to_cycles(onset);
                if onset > MAX_CYCLES {
                    debug!(
                        "Track '{}': skipping note {} at cycle {}, past the last {} cycles",
                        track.name, index, onset, MAX_CYCLES
                    );
                    return None;
                }

                Some(TimedNote {
                    index,
                    onset,
                    duration: self.time_base.to_cycles(duration),
                    note,
                })
            })
            .collect();

        timed.sort_by(|a, b| {
            a.onset
                .floor()
                .total_cmp(&b.onset.floor())
                .then(a.onset.total_cmp(&b.onset))
                .then(a.index.cmp(&b.index))
        });
        timed
    }

    fn group_chords(&self, track: &Track, timed: &[TimedNote]) -> Vec<Group> {
        let mut pending: Vec<(f64, f64, Vec<String>)> = Vec::new();

        for timed_note in timed {
            let token = self.render_note(track, timed_note.note).into_token();
            match pending.last_mut() {
                Some((onset, duration, tokens)) if timed_note.onset - *onset < self.epsilon => {
                    *duration = (*duration).max(timed_note.duration);
                    if !tokens.contains(&token) {
                        tokens.push(token);
                    }
                }
                _ => pending.push((timed_note.onset, timed_note.duration, vec![token])),
            }
        }

        pending
            .into_iter()
            .map(|(onset, duration, mut tokens)| {
                let step = if tokens.len() == 1 {
                    Step::Note(tokens.remove(0))
                } else {
                    Step::Chord(tokens)
                };
                Group {
                    onset,
                    duration,
                    step,
                }
            })
            .collect()
    }

    /// Assign each group to the window containing its onset.
    ///
    /// Only windows holding at least one group are returned, in ascending
    /// index order. Groups arrive sorted by onset.
    fn split_windows(&self, groups: Vec<Group>) -> Vec<(usize, Vec<Group>)> {
        let window = self.measures_per_line() as f64;
        let mut windows: Vec<(usize, Vec<Group>)> = Vec::new();

        for group in groups {
            let index = ((group.onset + self.epsilon / 2.0) / window).floor() as usize;
            match windows.last_mut() {
                Some((current, in_window)) if *current == index => in_window.push(group),
                _ => windows.push((index, vec![group])),
            }
        }

        windows
    }

    /// Weighted steps covering `start..end`, with rests for gaps
    fn render_span(&self, groups: &[Group], start: f64, end: f64) -> Vec<Step> {
        let mut steps = Vec::new();
        let mut cursor = start;

        for (i, group) in groups.iter().enumerate() {
            let onset = group.onset.max(cursor).min(end);
            if onset - cursor > self.epsilon {
                steps.push(Step::Rest.weighted(onset - cursor));
            }

            let next = groups.get(i + 1).map_or(end, |g| g.onset.min(end));
            let weight = (group.end().min(next) - onset).max(self.epsilon);
            steps.push(group.step.clone().weighted(weight));
            cursor = onset + weight;
        }

        if end - cursor > self.epsilon {
            steps.push(Step::Rest.weighted(end - cursor));
        }
        steps
    }

    /// One step per beat slot, each subdivided into equal cells
    fn render_subdivided(&self, groups: &[Group], start: f64, end: f64) -> Step {
        let beat = self.time_base.beat_cycles();
        let mut slots: Vec<Step> = Vec::new();
        let mut remaining = groups;
        let mut sounding_until = start;
        let mut slot = 0usize;

        loop {
            let slot_start = start + slot as f64 * beat;
            if slot_start >= end - self.epsilon {
                break;
            }
            let slot_end = (slot_start + beat).min(end);
            let is_last = slot_end >= end - self.epsilon;

            let split = if is_last {
                remaining.len()
            } else {
                remaining
                    .iter()
                    .position(|g| g.onset + self.epsilon / 2.0 >= slot_end)
                    .unwrap_or(remaining.len())
            };
            let (in_slot, later) = remaining.split_at(split);
            remaining = later;

            let fraction = (slot_end - slot_start) / beat;
            let full = fraction >= 1.0 - self.epsilon;
            let step = self.render_slot(
                in_slot,
                slot_start,
                slot_end,
                sounding_until,
                slots.last(),
                full,
            );
            if let Some(last) = in_slot.last() {
                sounding_until = last.end();
            }

            slots.push(if full { step } else { step.weighted(fraction) });
            slot += 1;
        }

        if slots.iter().all(|s| s.is_silent()) {
            return Step::Rest;
        }
        sequence(slots)
    }

    fn render_slot(
        &self,
        groups: &[Group],
        slot_start: f64,
        slot_end: f64,
        sounding_until: f64,
        previous: Option<&Step>,
        full: bool,
    ) -> Step {
        if groups.is_empty() {
            // `_` only extends a plain token; after a bracketed slot it stretches the whole group
            let held = full
                && slot_start < sounding_until - self.epsilon
                && matches!(previous, Some(Step::Note(_) | Step::Chord(_) | Step::Hold));
            return if held { Step::Hold } else { Step::Rest };
        }

        let span = slot_end - slot_start;
        let offsets: Vec<f64> = groups
            .iter()
            .map(|g| (g.onset - slot_start).max(0.0))
            .collect();

        match fit_subdivision(&offsets, span, self.epsilon) {
            Subdivision::Fit { count, cells } => {
                let cell_len = span / count as f64;
                let mut steps = vec![Step::Rest; count];
                let mut until = sounding_until;
                let mut starts = cells.iter().zip(groups).peekable();

                for cell in 0..count {
                    if let Some((_, group)) = starts.next_if(|(c, _)| **c == cell) {
                        steps[cell] = group.step.clone();
                        until = group.end();
                    } else if cell > 0
                        && steps[cell - 1] != Step::Rest
                        && slot_start + cell as f64 * cell_len < until - self.epsilon
                    {
                        steps[cell] = Step::Hold;
                    }
                }

                sequence(steps)
            }
            Subdivision::Unfit => {
                debug!(
                    "No subdivision fits {} onsets at cycle {:.3}, using explicit durations",
                    groups.len(),
                    slot_start
                );
                sequence(self.render_span(groups, slot_start, slot_end))
            }
        }
    }
}

/// Collapse a list of steps; a lone step spans its whole parent and loses its weight
fn sequence(mut steps: Vec<Step>) -> Step {
    match steps.len() {
        0 => Step::Rest,
        1 => match steps.remove(0) {
            Step::Weighted(step, _) => *step,
            step => step,
        },
        _ => Step::Sequence(steps),
    }
}
