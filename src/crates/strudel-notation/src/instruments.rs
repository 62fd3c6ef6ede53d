//! Track name to Strudel sound mapping
//!
//! Scores every General MIDI soundfont name in Strudel's catalog against the
//! track name and instrument family, with a couple of hard overrides and
//! keyword fallbacks. Ties go to the alphabetically first sound.

use log::debug;

use crate::config::Config;
use crate::model::Track;

/// Strudel sound catalog, alphabetically sorted and de-duplicated
pub const INSTRUMENTS: &[&str] = &[
    "brown", "bytebeat", "gm_accordion", "gm_acoustic_bass", "gm_acoustic_guitar_nylon",
    "gm_acoustic_guitar_steel", "gm_agogo", "gm_alto_sax", "gm_applause", "gm_bagpipe",
    "gm_bandoneon", "gm_banjo", "gm_baritone_sax", "gm_bassoon", "gm_bird_tweet",
    "gm_blown_bottle", "gm_brass_section", "gm_breath_noise", "gm_celesta", "gm_cello",
    "gm_choir_aahs", "gm_church_organ", "gm_clarinet", "gm_clavinet", "gm_contrabass",
    "gm_crackle", "gm_distortion_guitar", "gm_drawbar_organ", "gm_dulcimer",
    "gm_electric_bass_finger", "gm_electric_bass_pick", "gm_electric_guitar_clean",
    "gm_electric_guitar_jazz", "gm_electric_guitar_muted", "gm_english_horn", "gm_epiano1",
    "gm_epiano2", "gm_fiddle", "gm_flute", "gm_french_horn", "gm_fretless_bass",
    "gm_fx_atmosphere", "gm_fx_brightness", "gm_fx_crystal", "gm_fx_echoes", "gm_fx_goblins",
    "gm_fx_rain", "gm_fx_sci_fi", "gm_fx_soundtrack", "gm_glockenspiel",
    "gm_guitar_fret_noise", "gm_guitar_harmonics", "gm_gunshot", "gm_harmonica",
    "gm_harpsichord", "gm_helicopter", "gm_kalimba", "gm_koto", "gm_lead_1_square",
    "gm_lead_2_sawtooth", "gm_lead_3_calliope", "gm_lead_4_chiff", "gm_lead_5_charang",
    "gm_lead_6_voice", "gm_lead_7_fifths", "gm_lead_8_bass_lead", "gm_marimba",
    "gm_melodic_tom", "gm_music_box", "gm_muted_trumpet", "gm_oboe", "gm_ocarina",
    "gm_orchestra_hit", "gm_orchestral_harp", "gm_overdriven_guitar", "gm_pad_bowed",
    "gm_pad_choir", "gm_pad_halo", "gm_pad_metallic", "gm_pad_new_age", "gm_pad_poly",
    "gm_pad_sweep", "gm_pad_warm", "gm_pan_flute", "gm_percussive_organ", "gm_piano",
    "gm_piccolo", "gm_pizzicato_strings", "gm_recorder", "gm_reed_organ", "gm_reverse_cymbal",
    "gm_rock_organ", "gm_seashore", "gm_shakuhachi", "gm_shamisen", "gm_shanai", "gm_sitar",
    "gm_slap_bass_1", "gm_slap_bass_2", "gm_soprano_sax", "gm_steel_drums",
    "gm_string_ensemble_1", "gm_string_ensemble_2", "gm_synth_bass_1", "gm_synth_bass_2",
    "gm_synth_brass_1", "gm_synth_brass_2", "gm_synth_choir", "gm_synth_drum",
    "gm_synth_strings_1", "gm_synth_strings_2", "gm_taiko_drum", "gm_telephone",
    "gm_tenor_sax", "gm_timpani", "gm_tinkle_bell", "gm_tremolo_strings", "gm_trombone",
    "gm_trumpet", "gm_tuba", "gm_tubular_bells", "gm_vibraphone", "gm_viola", "gm_violin",
    "gm_voice_oohs", "gm_whistle", "gm_woodblock", "gm_xylophone", "pink", "pulse", "saw",
    "sawtooth", "sbd", "sine", "sqr", "square", "supersaw", "tri", "triangle", "white",
    "z_noise", "z_sawtooth", "z_sine", "z_square", "z_tan", "z_triangle", "zzfx",
];

/// Prefix of the General MIDI soundfont names
const GM_PREFIX: &str = "gm_";

/// Minimum score for a catalog match to be accepted
const MIN_SCORE: u32 = 5;

const SYNTH_SOUND: &str = "triangle";
const ENSEMBLE_SOUND: &str = "gm_string_ensemble_1";
const ELECTRIC_GUITAR_SOUND: &str = "gm_electric_guitar_clean";
const ELECTRIC_BASS_SOUND: &str = "gm_electric_bass_pick";
const ACOUSTIC_GUITAR_SOUND: &str = "gm_acoustic_guitar_nylon";
const PIANO_SOUND: &str = "gm_piano";
const DRUM_SYNTH_SOUND: &str = "gm_synth_drum";

/// Pick a Strudel sound for a melodic track from its name and instrument family.
///
/// Returns `None` when nothing matches well enough; callers then use the
/// global sound.
pub fn auto_sound(name: &str, instrument_family: Option<&str>) -> Option<&'static str> {
    let name_lower = name.to_lowercase();
    let family = instrument_family.unwrap_or("").to_lowercase();
    let search = format!("{} {}", name_lower, family);

    // Generic synths sound best as a plain waveform
    if search.contains("synth")
        && !search.contains("bass")
        && !search.contains("strings")
        && !search.contains("brass")
    {
        return Some(SYNTH_SOUND);
    }

    if name_lower.trim() == "strings"
        || (name_lower.contains("string")
            && !name_lower.contains("guitar")
            && !name_lower.contains("bass")
            && !name_lower.contains("quartet")
            && !name_lower.contains("solo"))
    {
        return Some(ENSEMBLE_SOUND);
    }

    let track_words = tokenize(&search);

    let mut best: Option<&'static str> = None;
    let mut max_score = 0;

    for &inst in INSTRUMENTS.iter().filter(|i| i.starts_with(GM_PREFIX)) {
        let score = score_instrument(inst, &search, &track_words);
        if score > max_score {
            max_score = score;
            best = Some(inst);
        }
    }

    if max_score >= MIN_SCORE {
        return best;
    }

    keyword_fallback(&search)
}

/// Words of at least three alphanumeric characters
fn tokenize(search: &str) -> Vec<&str> {
    search
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| w.len() > 2)
        .collect()
}

fn score_instrument(inst: &str, search: &str, track_words: &[&str]) -> u32 {
    let clean = inst.trim_start_matches(GM_PREFIX).replace('_', " ");
    let mut score = 0;

    if search.contains(clean.as_str()) {
        score += 20;
    }

    for word in clean.split(' ') {
        if track_words.contains(&word) {
            score += 5;
        } else if search.contains(word) {
            score += 2;
        }
    }

    score
}

fn keyword_fallback(search: &str) -> Option<&'static str> {
    if search.contains("guitar") {
        if search.contains("electric") {
            return Some(ELECTRIC_GUITAR_SOUND);
        }
        if search.contains("bass") {
            return Some(ELECTRIC_BASS_SOUND);
        }
        return Some(ACOUSTIC_GUITAR_SOUND);
    }

    if search.contains("bass") {
        return Some(ELECTRIC_BASS_SOUND);
    }
    if search.contains("piano") {
        return Some(PIANO_SOUND);
    }
    if search.contains("drum") {
        return Some(DRUM_SYNTH_SOUND);
    }

    None
}

/// Where a track's sound came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundChoice {
    /// Set explicitly on the track
    Override(String),
    /// Matched from the track name by `auto_sound`
    Auto(&'static str),
    /// Nothing more specific applied
    Global(String),
}

impl SoundChoice {
    pub fn as_str(&self) -> &str {
        match self {
            SoundChoice::Override(s) | SoundChoice::Global(s) => s,
            SoundChoice::Auto(s) => s,
        }
    }
}

/// Override, then auto-mapping (when enabled), then the global sound
pub fn resolve_sound(track: &Track, config: &Config) -> SoundChoice {
    if let Some(sound) = track.sound.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return SoundChoice::Override(sound.to_string());
    }

    if config.options.use_auto_mapping {
        if let Some(sound) = auto_sound(&track.name, track.instrument_family.as_deref()) {
            return SoundChoice::Auto(sound);
        }
        debug!("No sound match for track '{}', using global sound", track.name);
    }

    SoundChoice::Global(config.options.global_sound.clone())
}
