//! Abstract Syntax Tree (AST) types for Strudel patterns
//!
//! Tracks are built into these types first and only turned into text at the
//! end, so structure can be validated before string generation.

use serde::Serialize;

use crate::note::format_decimal;

/// One element of a mini notation sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Step {
    /// Rest/silence (-)
    Rest,

    /// Continue the previous element (_)
    Hold,

    /// Single token (e.g., "a4", "2b", "sd")
    Note(String),

    /// Simultaneous tokens (e.g., [a4,c5,e5])
    Chord(Vec<String>),

    /// Steps sharing the parent's time span (e.g., [a4 - c5])
    Sequence(Vec<Step>),

    /// Step with a relative duration (e.g., a4@0.25)
    Weighted(Box<Step>, f64),
}

impl Step {
    pub fn weighted(self, weight: f64) -> Step {
        Step::Weighted(Box::new(self), weight)
    }

    /// Convert to Strudel mini notation, rounding weights to `precision` places
    pub fn to_strudel(&self, precision: u32) -> String {
        match self {
            Step::Rest => "-".to_string(),
            Step::Hold => "_".to_string(),
            Step::Note(n) => n.clone(),
            Step::Chord(notes) => format!("[{}]", notes.join(",")),
            Step::Sequence(steps) => match steps.as_slice() {
                [single] if !matches!(single, Step::Weighted(..)) => single.to_strudel(precision),
                _ => {
                    let inner: Vec<String> =
                        steps.iter().map(|s| s.to_strudel(precision)).collect();
                    format!("[{}]", inner.join(" "))
                }
            },
            Step::Weighted(step, weight) => {
                format!("{}@{}", step.to_strudel(precision), format_decimal(*weight, precision))
            }
        }
    }

    /// Check if step is empty/silent
    pub fn is_silent(&self) -> bool {
        match self {
            Step::Rest => true,
            Step::Sequence(steps) => steps.iter().all(|s| s.is_silent()),
            Step::Weighted(step, _) => step.is_silent(),
            _ => false,
        }
    }

    fn validate(&self, line: usize) -> Result<(), String> {
        match self {
            Step::Chord(notes) if notes.is_empty() => Err(format!("Empty chord at line {}", line)),
            Step::Sequence(steps) if steps.is_empty() => {
                Err(format!("Empty sequence at line {}", line))
            }
            Step::Note(n) if n.is_empty() => Err(format!("Empty note at line {}", line)),
            Step::Weighted(_, w) if !w.is_finite() || *w <= 0.0 => {
                Err(format!("Invalid weight {} at line {}", w, line))
            }
            Step::Sequence(steps) => steps.iter().try_for_each(|s| s.validate(line)),
            Step::Weighted(step, _) => step.validate(line),
            _ => Ok(()),
        }
    }
}

/// Pattern function the track is written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatternKind {
    /// note("c4 e4")
    Note,
    /// n("0 2").scale(...)
    Degree,
    /// s("bd sd")
    Drum,
}

impl PatternKind {
    pub fn function(&self) -> &'static str {
        match self {
            PatternKind::Note => "note",
            PatternKind::Degree => "n",
            PatternKind::Drum => "s",
        }
    }
}

/// A complete track pattern with modifiers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    pub name: String,
    pub kind: PatternKind,
    /// One entry per window of `measures_per_line` cycles
    pub lines: Vec<Step>,

    // Modifiers
    pub scale: Option<String>,
    pub sound: Option<String>,
    pub bank: Option<String>,
    pub slow: Option<u32>,
}

impl Pattern {
    /// Convert to Strudel code, one window per indented line
    pub fn to_strudel(&self, precision: u32, indent: &str) -> String {
        let mut output = vec![format!("{}(`<", self.kind.function())];

        if self.lines.is_empty() {
            output.push(format!("{}-", indent));
        }
        for line in &self.lines {
            output.push(format!("{}{}", indent, line.to_strudel(precision)));
        }

        // Closing bracket and modifiers go on the last line
        let last_idx = output.len() - 1;
        output[last_idx].push_str(">`)");

        if let Some(scale) = &self.scale {
            output[last_idx].push_str(&format!(".scale(\"{}\")", scale));
        }

        if let Some(sound) = &self.sound {
            output[last_idx].push_str(&format!(".sound(\"{}\")", sound));
        }

        if let Some(bank) = &self.bank {
            output[last_idx].push_str(&format!(".bank(\"{}\")", bank));
        }

        if let Some(slow) = self.slow.filter(|&s| s > 1) {
            output[last_idx].push_str(&format!(".slow({})", slow));
        }

        output.join("\n")
    }

    /// Validate pattern structure
    pub fn validate(&self) -> Result<(), String> {
        self.lines
            .iter()
            .enumerate()
            .try_for_each(|(i, line)| line.validate(i))
    }
}
