use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Parser, ValueEnum};
use log::{debug, warn};
use std::fs;
use std::path::PathBuf;

use midi_to_strudel::MidiData;
use strudel_notation::drums::DRUM_BANKS;
use strudel_notation::note::pitch_class_index;
use strudel_notation::{
    detect_key, Config, CycleUnit, KeySignature, Mode, NotationOptions, NotationType,
    OutputFormatter, TimeSignature, TimingStyle, Track,
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CycleArg {
    Bar,
    Beat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TimingArg {
    /// Explicit `@` durations
    Duration,
    /// Beats subdivided into equal cells
    Division,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Major,
    Minor,
}

#[derive(Parser, Debug)]
#[command(name = "midi-to-strudel")]
#[command(about = "Convert MIDI files to Strudel code", long_about = None)]
struct Args {
    /// Path to the MIDI file (default: uses first .mid file in current directory)
    #[arg(short, long)]
    midi: Option<PathBuf>,

    /// Output file path (default: `<midi-name>.strudel`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print output to stdout instead of file
    #[arg(long)]
    stdout: bool,

    /// Suppress informational messages (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// How many spaces to use for indentation in the output
    #[arg(short, long, default_value = "2")]
    tab_size: usize,

    /// Write the pattern AST as JSON instead of Strudel code
    #[arg(long)]
    json: bool,

    /// JSON file with notation options; flags below override it
    #[arg(long)]
    options: Option<PathBuf>,

    /// Write scale degrees against the playback key instead of pitch names
    #[arg(short, long)]
    relative: bool,

    /// Length of one cycle
    #[arg(long, value_enum)]
    cycle_unit: Option<CycleArg>,

    /// How note timing is written
    #[arg(long, value_enum)]
    timing: Option<TimingArg>,

    /// Snap note timing to the grid
    #[arg(long)]
    quantize: bool,

    /// Maximum distance to the grid that gets snapped, in milliseconds
    #[arg(long)]
    threshold_ms: Option<f64>,

    /// How far notes move toward the grid, in percent
    #[arg(long)]
    strength: Option<f64>,

    /// Grid lines per beat (4 = sixteenth notes)
    #[arg(long)]
    grid: Option<u32>,

    /// Append note velocity to every note
    #[arg(long)]
    velocity: bool,

    /// Cycles written on each line
    #[arg(long)]
    measures_per_line: Option<u32>,

    /// Decimal places for durations and velocities
    #[arg(long)]
    precision: Option<u32>,

    /// Pick a sound for each track from its name
    #[arg(long)]
    auto_sound: bool,

    /// Sound for tracks without a more specific one
    #[arg(long)]
    global_sound: Option<String>,

    /// Playback tempo (note timing still follows the file's tempo)
    #[arg(long)]
    bpm: Option<f64>,

    /// Playback time signature for the tempo header, e.g. "3/4"
    #[arg(long, value_parser = parse_time_signature)]
    time_signature: Option<TimeSignature>,

    /// Playback key root for relative notation, e.g. "A" or "F#"
    #[arg(long)]
    key: Option<String>,

    /// Playback key mode (default: the detected mode)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Octave of the playback scale as written in `.scale()`, e.g. 3 for "A3:minor"
    #[arg(
        long,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-1..=9)
    )]
    octave: Option<i32>,

    /// Hide a track by its 1-based index (repeatable)
    #[arg(long)]
    hide: Vec<usize>,

    /// Sound for one track as `<index>=<sound>`, 1-based (repeatable)
    #[arg(long, value_parser = parse_sound_override)]
    sound: Vec<(usize, String)>,

    /// Drum machine bank for drum tracks
    #[arg(long, value_parser = PossibleValuesParser::new(DRUM_BANKS))]
    drum_bank: Option<String>,
}

fn parse_time_signature(s: &str) -> Result<TimeSignature, String> {
    let (numerator, denominator) = s
        .split_once('/')
        .ok_or_else(|| format!("expected <numerator>/<denominator>, got '{}'", s))?;
    let parse = |part: &str| match part.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(format!("invalid time signature '{}'", s)),
    };
    Ok(TimeSignature::new(parse(numerator)?, parse(denominator)?))
}

fn parse_sound_override(s: &str) -> Result<(usize, String), String> {
    let (index, sound) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <index>=<sound>, got '{}'", s))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid track index '{}': {}", index, e))?;
    let sound = sound.trim();
    if sound.is_empty() {
        return Err(format!("missing sound for track {}", index));
    }
    Ok((index, sound.to_string()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Find MIDI file
    let midi_path = if let Some(path) = args.midi.clone() {
        if !path.exists() {
            anyhow::bail!("MIDI file not found: {}", path.display());
        }
        path
    } else {
        find_first_midi_file()?
    };

    // Determine output path (use .strudel extension)
    let output_path = if let Some(path) = args.output.clone() {
        path
    } else {
        let stem = midi_path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        PathBuf::from(format!("{}.strudel", stem))
    };

    if !args.quiet {
        eprintln!("Processing MIDI file: {}", midi_path.display());
    }

    let midi_data = MidiData::from_file(&midi_path)
        .with_context(|| format!("Failed to decode {}", midi_path.display()))?;

    let mut tracks = midi_data.tracks;
    apply_track_flags(&mut tracks, &args);

    let key = detect_key(&tracks);
    if !args.quiet {
        eprintln!(
            "Detected key: {} {} (confidence {}%)",
            key.root,
            key.mode.as_str(),
            key.confidence
        );
    }

    let mut config = Config::new(midi_data.bpm, midi_data.time_signature, Some(key))
        .with_options(notation_options(&args)?);
    apply_playback_flags(&mut config, &args)?;
    debug!("Config: {:?}", config);

    // Format output
    let formatter = OutputFormatter::new(args.tab_size);
    let output = if args.json {
        format!("{}\n", formatter.build_output_json(&tracks, &config))
    } else {
        formatter.build_output(&tracks, &config)
    };

    if output.is_empty() && !args.quiet {
        eprintln!("No visible tracks to convert");
    }

    // Output handling
    if args.stdout {
        // Print directly to stdout (clean, no logs)
        print!("{}", output);
    } else {
        fs::write(&output_path, &output)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        if !args.quiet {
            eprintln!("Output saved to {}", output_path.display());
        }
    }

    Ok(())
}

/// Options from the options file, overridden by flags
fn notation_options(args: &Args) -> Result<NotationOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file {}", path.display()))?;
            NotationOptions::from_json_str(&json)
                .with_context(|| format!("Invalid options file {}", path.display()))?
        }
        None => NotationOptions::default(),
    };

    if args.relative {
        options.notation_type = NotationType::Relative;
    }
    if let Some(unit) = args.cycle_unit {
        options.cycle_unit = match unit {
            CycleArg::Bar => CycleUnit::Bar,
            CycleArg::Beat => CycleUnit::Beat,
        };
    }
    if let Some(timing) = args.timing {
        options.timing_style = match timing {
            TimingArg::Duration => TimingStyle::ExplicitDuration,
            TimingArg::Division => TimingStyle::BracketSubdivision,
        };
    }
    if args.quantize {
        options.quantize.enabled = true;
    }
    if let Some(threshold) = args.threshold_ms {
        options.quantize.threshold_ms = threshold;
    }
    if let Some(strength) = args.strength {
        options.quantize.strength = strength;
    }
    if let Some(grid) = args.grid {
        options.quantize.grid = grid;
    }
    if args.velocity {
        options.include_velocity = true;
    }
    if let Some(measures) = args.measures_per_line {
        options.measures_per_line = measures;
    }
    if let Some(precision) = args.precision {
        options.duration_precision = precision;
    }
    if args.auto_sound {
        options.use_auto_mapping = true;
    }
    if let Some(sound) = &args.global_sound {
        options.global_sound = sound.clone();
    }

    Ok(options.sanitized())
}

fn apply_track_flags(tracks: &mut [Track], args: &Args) {
    for &index in &args.hide {
        match index.checked_sub(1).and_then(|i| tracks.get_mut(i)) {
            Some(track) => track.hidden = Some(true),
            None => warn!("--hide {}: no such track ({} tracks)", index, tracks.len()),
        }
    }

    for (index, sound) in &args.sound {
        match index.checked_sub(1).and_then(|i| tracks.get_mut(i)) {
            Some(track) => track.sound = Some(sound.clone()),
            None => warn!("--sound {}: no such track ({} tracks)", index, tracks.len()),
        }
    }

    if let Some(bank) = &args.drum_bank {
        for track in tracks.iter_mut().filter(|t| t.is_drum) {
            track.drum_bank = Some(bank.clone());
        }
    }
}

fn apply_playback_flags(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(bpm) = args.bpm {
        config.set_bpm(bpm);
    }
    if let Some(time_signature) = args.time_signature {
        config.set_time_signature(time_signature);
    }

    if args.key.is_none() && args.mode.is_none() && args.octave.is_none() {
        return Ok(());
    }

    let detected = config.effective_playback_key();
    let root = match &args.key {
        Some(name) => {
            pitch_class_index(name).with_context(|| format!("Unknown key root: {}", name))?
        }
        None => detected.root_index(),
    };
    let mode = match args.mode {
        Some(ModeArg::Major) => Mode::Major,
        Some(ModeArg::Minor) => Mode::Minor,
        None => detected.mode,
    };
    config.set_playback_key(KeySignature::new(
        root,
        mode,
        detected.confidence,
        // `.scale()` prints one below the stored octave
        args.octave.map_or(detected.average_octave, |octave| octave + 1),
    ));

    Ok(())
}

fn find_first_midi_file() -> Result<PathBuf> {
    let entries = fs::read_dir(".")
        .context("Failed to read current directory")?;

    let mut midi_files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("mid") {
            midi_files.push(path);
        }
    }

    // Directory order is platform dependent
    midi_files.sort();
    midi_files
        .into_iter()
        .next()
        .context("No MIDI files found in current directory")
}
