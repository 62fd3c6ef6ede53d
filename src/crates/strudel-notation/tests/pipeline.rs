use strudel_notation::{
    detect_key, generate, Config, KeySignature, Mode, NotationOptions, NotationType, Note,
    OutputFormatter, TimeSignature, TimingStyle, Track,
};

fn note(name: &str, midi: u8, on: f64, off: f64) -> Note {
    Note::new(name, midi, on, off, 0.8)
}

fn melody() -> Track {
    Track::new(
        "track-0",
        "Grand Piano",
        vec![
            note("A3", 57, 0.0, 0.5),
            note("C4", 60, 0.5, 1.0),
            note("E4", 64, 1.0, 1.5),
            note("A3", 57, 1.5, 2.0),
            note("D4", 62, 2.0, 3.0),
            note("A3", 57, 3.0, 4.0),
        ],
    )
}

fn drums() -> Track {
    let mut track = Track::new(
        "track-1",
        "Beat",
        vec![
            note("C2", 36, 0.0, 0.1),
            note("F#2", 42, 0.5, 0.6),
            note("D2", 38, 1.0, 1.1),
            note("F#2", 42, 1.5, 1.6),
        ],
    );
    track.is_drum = true;
    track.drum_bank = Some("RolandTR808".into());
    track
}

#[test]
fn single_note_renders_quarter_bar() {
    let track = Track::new("track-0", "Piano", vec![note("C4", 60, 0.0, 0.5)]);
    let output = generate(&[track], &Config::new(120.0, TimeSignature::new(4, 4), None));

    assert!(output.contains("c4@0.25"));
    assert!(output.starts_with("setcpm(120/4)"));
}

#[test]
fn empty_track_list_is_empty_output() {
    assert_eq!(generate(&[], &Config::default()), "");
}

#[test]
fn absolute_pipeline() {
    let tracks = vec![melody(), drums()];
    let config = Config::new(120.0, TimeSignature::default(), Some(detect_key(&tracks)));

    assert_eq!(
        generate(&tracks, &config),
        "setcpm(120/4)\n\
         \n\
         // Track 1: Grand Piano\n\
         $: note(`<\n  [a3@0.25 c4@0.25 e4@0.25 a3@0.25]\n  [d4@0.5 a3@0.5]>`).sound(\"triangle\")\n\
         \n\
         // Track 2: Beat\n\
         $: s(`<\n  [bd@0.05 -@0.2 hh@0.05 -@0.2 sd@0.05 -@0.2 hh@0.05 -@0.2]>`).bank(\"RolandTR808\")\n"
    );
}

#[test]
fn relative_pipeline_uses_detected_key() {
    let tracks = vec![melody()];
    let key = detect_key(&tracks);
    assert_eq!(key.root, "A");
    assert_eq!(key.mode, Mode::Minor);

    let config = Config::new(120.0, TimeSignature::default(), Some(key)).with_options(NotationOptions {
        notation_type: NotationType::Relative,
        use_auto_mapping: true,
        ..Default::default()
    });
    let output = generate(&tracks, &config);

    assert!(output.contains("$: n(`<\n  [0@0.25 2@0.25 4@0.25 0@0.25]\n  [3@0.5 0@0.5]>`)"));
    assert!(output.contains(".scale(\"A3:minor\").sound(\"gm_piano\")"));
}

#[test]
fn playback_changes_only_touch_header() {
    let tracks = vec![melody()];
    let mut config = Config::new(120.0, TimeSignature::default(), Some(detect_key(&tracks)));
    let before = generate(&tracks, &config);

    config.set_bpm(140.0);
    config.set_playback_key(KeySignature::new(9, Mode::Minor, 50, 4));
    let after = generate(&tracks, &config);

    assert!(after.starts_with("setcpm(140/4)"));
    assert_eq!(
        before.split_once('\n').map(|(_, body)| body),
        after.split_once('\n').map(|(_, body)| body)
    );
}

#[test]
fn subdivision_pipeline() {
    let config = Config::default().with_options(NotationOptions {
        timing_style: TimingStyle::BracketSubdivision,
        ..Default::default()
    });
    let output = generate(&[melody(), drums()], &config);

    assert!(output.contains("  [a3 c4 e4 a3]\n  [d4 _ a3 _]>`)"));
    assert!(output.contains("[bd hh sd hh]>`).bank(\"RolandTR808\")"));
}

#[test]
fn hidden_tracks_are_skipped() {
    let mut hidden = drums();
    hidden.hidden = Some(true);
    let output = generate(&[hidden, melody()], &Config::default());

    assert!(!output.contains("Beat"));
    assert!(output.contains("// Track 1: Grand Piano"));
}

#[test]
fn output_is_deterministic() {
    let tracks = vec![melody(), drums()];
    let config = Config::default().with_options(NotationOptions {
        include_velocity: true,
        ..Default::default()
    });

    let first = generate(&tracks, &config);
    for _ in 0..5 {
        assert_eq!(generate(&tracks, &config), first);
    }
}

#[test]
fn tab_size_is_configurable() {
    let output = OutputFormatter::new(4).build_output(&[melody()], &Config::default());
    assert!(output.contains("note(`<\n    [a3@0.25"));
}
