//! End-to-end scheduling behaviour through `Session`.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use keyglow_core::arpeggiator::ArpeggiatorScheduler;
use keyglow_core::melody::MelodyStore;
use keyglow_core::session::Session;
use keyglow_core::sound::RecordingTrigger;
use keyglow_core::transport::TransportScheduler;
use keyglow_types::{ArpPattern, ArpeggiatorConfig, Note, PitchIndex, PitchRange};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn session(range: PitchRange) -> Session {
    Session::with_parts(range, TransportScheduler::new(), ArpeggiatorScheduler::with_seed(42))
}

/// 100 notes with unique pitches, supplied out of order, with overlaps and
/// shared start times.
fn dense_melody() -> Vec<Note> {
    (0..100)
        .map(|i| {
            let start = ((i * 37) % 50) as f64 * 0.05;
            let duration = 0.05 + (i % 7) as f64 * 0.3;
            Note::new(i, start, duration)
        })
        .collect()
}

fn scenario_melody() -> MelodyStore {
    MelodyStore::new(vec![
        Note::new(0, 0.0, 1.0),
        Note::new(4, 0.5, 1.0),
        Note::new(7, 2.0, 0.5),
    ])
    .unwrap()
}

fn active(session: &Session) -> Vec<PitchIndex> {
    session.transport().active().iter().copied().collect()
}

fn arp(pattern: ArpPattern, octave_span: u8) -> ArpeggiatorConfig {
    ArpeggiatorConfig {
        enabled: true,
        step_period_ms: 100,
        pattern,
        octave_span,
    }
}

/// Press `keys` on an arp-enabled session and collect `steps` steps.
fn arp_steps(config: ArpeggiatorConfig, keys: &[PitchIndex], steps: u64) -> Vec<PitchIndex> {
    let t0 = Instant::now();
    let mut session = session(PitchRange::default());
    session.set_arp_config(config, t0);
    let mut recorder = RecordingTrigger::new();
    for &key in keys {
        session.press(key, &mut recorder);
    }
    for n in 1..=steps {
        session.tick(t0 + ms(100 * n), &mut recorder);
    }
    recorder.pitches()
}

#[test]
fn irregular_frames_trigger_every_note_once_in_start_order() {
    let notes = dense_melody();
    let starts: HashMap<PitchIndex, f64> = notes.iter().map(|n| (n.pitch, n.start_time)).collect();

    let mut session = session(PitchRange::new(0, 128));
    session.load_melody(MelodyStore::new(notes).unwrap());
    let total = session.transport().duration();

    let mut recorder = RecordingTrigger::new();
    let t0 = Instant::now();
    assert!(session.play(t0));

    let pattern = [1, 500, 16, 16, 1, 1, 500, 16];
    let mut now = t0;
    let mut frames = 0;
    while session.transport().is_playing() {
        now += ms(pattern[frames % pattern.len()]);
        session.tick(now, &mut recorder);
        frames += 1;
        assert!(frames < 10_000, "transport never finished");
    }
    assert!(now.duration_since(t0).as_secs_f64() >= total);

    let fired = recorder.pitches();
    let mut counts: HashMap<PitchIndex, usize> = HashMap::new();
    for pitch in &fired {
        *counts.entry(*pitch).or_default() += 1;
    }
    assert_eq!(counts.len(), 100);
    assert!(counts.values().all(|&c| c == 1));

    let fired_starts: Vec<f64> = fired.iter().map(|p| starts[p]).collect();
    assert!(fired_starts.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn slow_frame_drains_every_passed_note() {
    let mut session = session(PitchRange::default());
    session.load_melody(MelodyStore::sequential(&[(0, 0.1), (1, 0.1), (2, 0.1), (3, 0.1)]).unwrap());
    let mut recorder = RecordingTrigger::new();
    let t0 = Instant::now();
    session.play(t0);
    session.tick(t0 + ms(350), &mut recorder);
    assert_eq!(recorder.pitches(), vec![0, 1, 2, 3]);
}

#[test]
fn scenario_projection_while_playing_and_after_seek() {
    let mut session = session(PitchRange::default());
    session.load_melody(scenario_melody());
    let mut recorder = RecordingTrigger::new();

    let t0 = Instant::now();
    session.play(t0);
    session.tick(t0 + ms(600), &mut recorder);
    assert_eq!(active(&session), vec![0, 4]);

    session.seek(2.2);
    assert_eq!(active(&session), vec![7]);
}

#[test]
fn seek_projection_ignores_history() {
    let probe = [0.0, 0.25, 0.6, 1.2, 1.75, 2.2, 2.6, 3.0];

    let mut fresh = session(PitchRange::default());
    fresh.load_melody(scenario_melody());

    let mut played = session(PitchRange::default());
    played.load_melody(scenario_melody());
    let mut recorder = RecordingTrigger::new();
    let t0 = Instant::now();
    played.play(t0);
    played.tick(t0 + ms(1800), &mut recorder);
    played.seek(0.3);
    played.tick(t0 + ms(2500), &mut recorder);
    played.pause();

    for &t in &probe {
        fresh.seek(t);
        played.seek(t);
        assert_eq!(active(&fresh), active(&played), "projection differs at {}", t);
    }
}

#[test]
fn seek_while_paused_updates_highlights() {
    let mut session = session(PitchRange::default());
    session.load_melody(scenario_melody());
    session.seek(0.75);
    let keys = session.highlights();
    assert!(keys[0].is_active());
    assert!(keys[4].is_active());
    assert!(!keys[7].is_active());
}

#[test]
fn seek_then_play_resumes_from_the_cursor() {
    let mut session = session(PitchRange::default());
    session.load_melody(scenario_melody());
    session.seek(0.5);
    let mut recorder = RecordingTrigger::new();
    let t0 = Instant::now();
    session.play(t0);
    session.tick(t0, &mut recorder);
    session.tick(t0 + ms(1600), &mut recorder);
    assert_eq!(recorder.pitches(), vec![4, 7]);
}

#[test]
fn arpeggiator_pattern_laws() {
    let chord = [0, 4, 7];
    assert_eq!(arp_steps(arp(ArpPattern::Up, 1), &chord, 6), vec![0, 4, 7, 0, 4, 7]);
    assert_eq!(arp_steps(arp(ArpPattern::Down, 1), &chord, 6), vec![7, 4, 0, 7, 4, 0]);
    assert_eq!(
        arp_steps(arp(ArpPattern::UpDown, 1), &chord, 8),
        vec![0, 4, 7, 4, 0, 4, 7, 4]
    );

    let random = arp_steps(arp(ArpPattern::Random, 1), &chord, 200);
    assert_eq!(random.len(), 200);
    let allowed: BTreeSet<PitchIndex> = chord.into_iter().collect();
    assert!(random.iter().all(|p| allowed.contains(p)));
    // Independent draws: every pitch shows up, and immediate repeats happen.
    let seen: BTreeSet<PitchIndex> = random.iter().copied().collect();
    assert_eq!(seen, allowed);
    assert!(random.windows(2).any(|w| w[0] == w[1]));
}

#[test]
fn single_key_across_two_octaves_alternates() {
    assert_eq!(
        arp_steps(arp(ArpPattern::Up, 2), &[3], 6),
        vec![3, 15, 3, 15, 3, 15]
    );
}

#[test]
fn reconfiguration_restarts_the_step_index() {
    let t0 = Instant::now();
    let mut session = session(PitchRange::default());
    session.set_arp_config(arp(ArpPattern::Up, 1), t0);
    let mut recorder = RecordingTrigger::new();
    for key in [0, 4, 7] {
        session.press(key, &mut recorder);
    }
    session.tick(t0 + ms(100), &mut recorder);
    session.tick(t0 + ms(200), &mut recorder);
    assert_eq!(recorder.pitches(), vec![0, 4]);

    let t1 = t0 + ms(250);
    session.set_arp_config(arp(ArpPattern::Down, 1), t1);
    assert_eq!(session.arpeggiator().step_index(), 0);
    // The old clock was due at 300; the new one first fires at 350.
    session.tick(t0 + ms(300), &mut recorder);
    assert_eq!(recorder.pitches(), vec![0, 4]);
    session.tick(t1 + ms(100), &mut recorder);
    session.tick(t1 + ms(200), &mut recorder);
    assert_eq!(recorder.pitches(), vec![0, 4, 7, 4]);
}

#[test]
fn disabling_the_arpeggiator_silences_it_immediately() {
    let t0 = Instant::now();
    let mut session = session(PitchRange::default());
    session.set_arp_config(arp(ArpPattern::Up, 1), t0);
    let mut recorder = RecordingTrigger::new();
    session.press(0, &mut recorder);
    session.set_arp_config(ArpeggiatorConfig::default(), t0 + ms(50));
    for n in 1..=10 {
        session.tick(t0 + ms(100 * n), &mut recorder);
    }
    assert!(recorder.pitches().is_empty());
    assert_eq!(session.arpeggiator().active(), None);
}

#[test]
fn arpeggiator_and_transport_share_the_sound_surface() {
    let t0 = Instant::now();
    let mut session = session(PitchRange::default());
    session.load_melody(MelodyStore::sequential(&[(20, 0.15), (22, 0.15)]).unwrap());
    session.set_arp_config(arp(ArpPattern::Up, 1), t0);
    session.set_transpose(1);
    let mut recorder = RecordingTrigger::new();
    session.press(0, &mut recorder);
    session.play(t0);
    session.tick(t0, &mut recorder);
    session.tick(t0 + ms(100), &mut recorder);
    session.tick(t0 + ms(200), &mut recorder);

    let mut fired = recorder.pitches();
    fired.sort_unstable();
    // Melody 20 and 22 plus two arpeggiator steps on key 0, all transposed.
    assert_eq!(fired, vec![1, 1, 21, 23]);

    // Stopping the transport leaves the arpeggiator running.
    session.stop();
    assert!(session.arpeggiator().is_running());
}
