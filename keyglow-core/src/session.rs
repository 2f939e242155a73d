//! The composition root: one held-key registry, one melody, two schedulers.
//!
//! The transport and the arpeggiator are independent state machines. They
//! meet only at the sound surface (`SoundOut`) and in the highlight
//! projection; neither reads the other's lifecycle.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use keyglow_types::{
    ArpeggiatorConfig, KeyHighlight, PitchIndex, PitchRange, PlayerConfig, TheorySettings, Voice,
};

use crate::arpeggiator::ArpeggiatorScheduler;
use crate::config::Config;
use crate::held_keys::HeldKeys;
use crate::highlight::{self, HighlightSources};
use crate::melody::{MelodyError, MelodyStore};
use crate::sound::{SoundOut, SoundTrigger};
use crate::transport::TransportScheduler;

/// Restore point for a running arpeggio preview.
#[derive(Debug)]
struct ArpPreview {
    ends_at: Instant,
    restore_enabled: bool,
    restore_held: BTreeSet<PitchIndex>,
}

pub struct Session {
    range: PitchRange,
    held: HeldKeys,
    transport: TransportScheduler,
    arp: ArpeggiatorScheduler,
    voice: Voice,
    theory: TheorySettings,
    preview: Option<ArpPreview>,
}

impl Session {
    pub fn new(range: PitchRange) -> Self {
        Self::with_parts(range, TransportScheduler::new(), ArpeggiatorScheduler::new())
    }

    /// Build with explicit schedulers, e.g. a seeded arpeggiator.
    pub fn with_parts(
        range: PitchRange,
        transport: TransportScheduler,
        arp: ArpeggiatorScheduler,
    ) -> Self {
        Self {
            range,
            held: HeldKeys::new(),
            transport,
            arp,
            voice: Voice::default(),
            theory: TheorySettings::default(),
            preview: None,
        }
    }

    pub fn from_config(config: &Config, now: Instant) -> Self {
        let transport =
            TransportScheduler::new().with_staleness_window(config.staleness_window_secs());
        let mut session =
            Self::with_parts(config.pitch_range(), transport, ArpeggiatorScheduler::new());
        session.apply_config(config.player_defaults(), now);
        session
    }

    // ── Held keys ─────────────────────────────────────────────────

    /// Key down. With the arpeggiator off the key also sounds immediately;
    /// with it on, only the arpeggiator's steps make sound.
    pub fn press(&mut self, pitch: PitchIndex, sound: &mut dyn SoundTrigger) -> bool {
        if !self.range.contains(pitch) {
            log::debug!(target: "session", "ignoring press outside range: {}", pitch);
            return false;
        }
        self.held.press(pitch);
        if !self.arp.config().enabled {
            SoundOut::new(sound, &self.voice, self.range).fire(pitch);
        }
        true
    }

    /// Key up. Never silences anything; decay belongs to the sound back end.
    pub fn release(&mut self, pitch: PitchIndex) -> bool {
        self.held.release(pitch)
    }

    /// MIDI note-on, mapped through the pitch reference. Velocity 0 is a note-off.
    pub fn note_on(&mut self, midi: u8, velocity: u8, sound: &mut dyn SoundTrigger) -> bool {
        if velocity == 0 {
            return self.note_off(midi);
        }
        let pitch = self.range.pitch_for_midi(i32::from(midi));
        self.press(pitch, sound)
    }

    pub fn note_off(&mut self, midi: u8) -> bool {
        self.release(self.range.pitch_for_midi(i32::from(midi)))
    }

    pub fn held_keys(&self) -> &HeldKeys {
        &self.held
    }

    // ── Melody ────────────────────────────────────────────────────

    pub fn load_melody(&mut self, melody: MelodyStore) {
        self.transport.load(Arc::new(melody));
    }

    /// Parse and load a JSON melody. On error the current melody stays.
    pub fn import_melody(&mut self, json: &str) -> Result<usize, MelodyError> {
        let melody = MelodyStore::from_json(json, self.range)?;
        let count = melody.len();
        self.load_melody(melody);
        Ok(count)
    }

    pub fn melody(&self) -> &MelodyStore {
        self.transport.melody()
    }

    // ── Transport ─────────────────────────────────────────────────

    pub fn play(&mut self, now: Instant) -> bool {
        self.transport.play(now)
    }

    pub fn pause(&mut self) {
        self.transport.pause();
    }

    pub fn stop(&mut self) {
        self.transport.stop();
    }

    pub fn seek(&mut self, t: f64) {
        self.transport.seek(t);
    }

    pub fn set_tempo(&mut self, multiplier: f64) {
        self.transport.set_tempo(multiplier);
    }

    /// Transpose shared by melody playback and the arpeggiator.
    pub fn set_transpose(&mut self, semitones: i32) {
        self.transport.set_transpose(semitones);
    }

    pub fn transport(&self) -> &TransportScheduler {
        &self.transport
    }

    // ── Arpeggiator ───────────────────────────────────────────────

    /// Reconfigure the arpeggiator. An explicit choice cancels any preview,
    /// putting the held keys back but keeping the new enabled flag.
    pub fn set_arp_config(&mut self, config: ArpeggiatorConfig, now: Instant) {
        self.cancel_preview();
        self.arp.set_config(config, now);
    }

    pub fn arpeggiator(&self) -> &ArpeggiatorScheduler {
        &self.arp
    }

    /// Arpeggiate `pitches` for `duration`, independent of the keys actually
    /// held. Afterwards the arpeggiator's enabled flag and the held keys are
    /// put back exactly as they were. A preview started during another keeps
    /// the first restore point.
    pub fn preview_arpeggio(&mut self, pitches: &[PitchIndex], duration: Duration, now: Instant) {
        let ends_at = now + duration;
        let preview_keys: BTreeSet<PitchIndex> = pitches.iter().copied().collect();
        let previous = self.held.replace(preview_keys);

        match self.preview.as_mut() {
            Some(preview) => preview.ends_at = ends_at,
            None => {
                self.preview = Some(ArpPreview {
                    ends_at,
                    restore_enabled: self.arp.config().enabled,
                    restore_held: previous,
                });
            }
        }

        log::debug!(target: "session", "previewing {:?} for {:?}", pitches, duration);
        let config = ArpeggiatorConfig {
            enabled: true,
            ..self.arp.config()
        };
        self.arp.set_config(config, now);
    }

    fn cancel_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            log::debug!(target: "session", "preview cancelled");
            self.held.replace(preview.restore_held);
        }
    }

    pub fn is_previewing(&self) -> bool {
        self.preview.is_some()
    }

    fn end_preview(&mut self, now: Instant) {
        let Some(preview) = self.preview.take() else {
            return;
        };
        log::debug!(target: "session", "preview finished");
        self.held.replace(preview.restore_held);
        let config = ArpeggiatorConfig {
            enabled: preview.restore_enabled,
            ..self.arp.config()
        };
        self.arp.set_config(config, now);
    }

    // ── Voice and theory ──────────────────────────────────────────

    pub fn voice(&self) -> Voice {
        self.voice
    }

    pub fn set_voice(&mut self, voice: Voice) {
        self.voice = voice.clamped();
    }

    pub fn theory(&self) -> TheorySettings {
        self.theory
    }

    pub fn set_theory(&mut self, theory: TheorySettings) {
        log::debug!(
            target: "session",
            "theory: {} {} (root {}, scale {})",
            theory.root.name(),
            theory.scale.name(),
            theory.show_root,
            theory.show_scale
        );
        self.theory = theory;
    }

    pub fn range(&self) -> PitchRange {
        self.range
    }

    // ── Clocks ────────────────────────────────────────────────────

    /// Advance every clock to `now`. Called once per frame by the host.
    pub fn tick(&mut self, now: Instant, sound: &mut dyn SoundTrigger) {
        if self.preview.as_ref().is_some_and(|p| now >= p.ends_at) {
            self.end_preview(now);
        }

        let mut out = SoundOut::new(sound, &self.voice, self.range);
        self.transport.tick(now, &mut out);
        self.arp
            .tick(now, self.held.keys(), self.transport.transpose(), &mut out);
    }

    /// Earliest instant something other than the frame clock needs attention.
    pub fn next_wake(&self) -> Option<Instant> {
        let arp = self.arp.next_wake().map(|w| w.at);
        let preview = self.preview.as_ref().map(|p| p.ends_at);
        match (arp, preview) {
            (Some(a), Some(p)) => Some(a.min(p)),
            (a, p) => a.or(p),
        }
    }

    // ── Projection ────────────────────────────────────────────────

    /// Per-key render state. Held keys count as sounding only while they
    /// play through directly; with the arpeggiator on they are just its input.
    pub fn highlights(&self) -> Vec<KeyHighlight> {
        let empty = BTreeSet::new();
        let pressed = if self.arp.config().enabled {
            &empty
        } else {
            self.held.keys()
        };
        let sources = HighlightSources {
            pressed,
            transport: self.transport.active(),
            arpeggiator: self.arp.active(),
            theory: &self.theory,
        };
        highlight::project(&sources, self.range)
    }

    // ── Persisted record ──────────────────────────────────────────

    /// Snapshot of the user-facing settings. A running preview reports the
    /// enabled state it will restore.
    pub fn config(&self) -> PlayerConfig {
        let mut arpeggiator = self.arp.config();
        if let Some(preview) = &self.preview {
            arpeggiator.enabled = preview.restore_enabled;
        }
        PlayerConfig {
            tempo: self.transport.tempo(),
            transpose: self.transport.transpose(),
            arpeggiator,
            voice: self.voice,
            theory: self.theory,
        }
    }

    /// Apply a stored record. Cancels any preview first.
    pub fn apply_config(&mut self, config: PlayerConfig, now: Instant) {
        self.cancel_preview();
        self.transport.set_tempo(config.tempo);
        self.transport.set_transpose(config.transpose);
        self.arp.set_config(config.arpeggiator, now);
        self.set_voice(config.voice);
        self.theory = config.theory;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::RecordingTrigger;
    use keyglow_types::{ArpPattern, Instrument, Key, Note, Scale};

    fn session() -> Session {
        Session::with_parts(
            PitchRange::default(),
            TransportScheduler::new(),
            ArpeggiatorScheduler::with_seed(7),
        )
    }

    fn arp_on(pattern: ArpPattern) -> ArpeggiatorConfig {
        ArpeggiatorConfig {
            enabled: true,
            step_period_ms: 100,
            pattern,
            octave_span: 1,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn press_plays_through_when_arp_is_off() {
        let mut session = session();
        let mut recorder = RecordingTrigger::new();
        assert!(session.press(4, &mut recorder));
        assert_eq!(recorder.pitches(), vec![4]);
        assert!(session.held_keys().contains(4));
        assert_eq!(session.highlights()[4], KeyHighlight::Active);
    }

    #[test]
    fn press_only_feeds_registry_when_arp_is_on() {
        let t0 = Instant::now();
        let mut session = session();
        session.set_arp_config(arp_on(ArpPattern::Up), t0);
        let mut recorder = RecordingTrigger::new();
        session.press(4, &mut recorder);
        session.press(0, &mut recorder);
        assert!(recorder.pitches().is_empty());
        // Held keys are arpeggiator input, not lit on their own.
        assert_ne!(session.highlights()[4], KeyHighlight::Active);

        session.tick(t0 + ms(100), &mut recorder);
        assert_eq!(recorder.pitches(), vec![0]);
        assert_eq!(session.highlights()[0], KeyHighlight::Active);
    }

    #[test]
    fn release_never_triggers() {
        let mut session = session();
        let mut recorder = RecordingTrigger::new();
        session.press(4, &mut recorder);
        recorder.clear();
        assert!(session.release(4));
        assert!(!session.release(4));
        assert!(recorder.pitches().is_empty());
    }

    #[test]
    fn midi_notes_map_through_reference() {
        let mut session = session();
        let mut recorder = RecordingTrigger::new();
        assert!(session.note_on(60, 100, &mut recorder));
        assert_eq!(recorder.pitches(), vec![24]);
        assert!(session.held_keys().contains(24));
        assert!(session.note_on(60, 0, &mut recorder));
        assert!(!session.held_keys().contains(24));
        // Below C2 is outside the keyboard.
        assert!(!session.note_on(30, 90, &mut recorder));
        assert_eq!(recorder.pitches(), vec![24]);
    }

    #[test]
    fn voice_travels_with_triggers() {
        let mut session = session();
        session.set_voice(Voice {
            instrument: Instrument::Organ,
            vibrato: true,
            vibrato_depth: 1.5,
        });
        let mut recorder = RecordingTrigger::new();
        session.press(0, &mut recorder);
        let record = recorder.records()[0];
        assert_eq!(record.voice.instrument, Instrument::Organ);
        assert!(record.voice.vibrato);
        assert_eq!(record.voice.vibrato_depth, 1.0);
    }

    #[test]
    fn loading_a_melody_stops_playback() {
        let t0 = Instant::now();
        let mut session = session();
        session.load_melody(MelodyStore::new(vec![Note::new(0, 0.0, 5.0)]).unwrap());
        assert!(session.play(t0));
        let mut recorder = RecordingTrigger::new();
        session.tick(t0 + ms(500), &mut recorder);
        session.load_melody(MelodyStore::new(vec![Note::new(2, 0.0, 1.0)]).unwrap());
        assert!(!session.transport().is_playing());
        assert_eq!(session.transport().position(), 0.0);
    }

    #[test]
    fn bad_import_keeps_current_melody() {
        let mut session = session();
        assert_eq!(
            session
                .import_melody(r#"[{"noteName": "C2", "duration": 1.0}]"#)
                .unwrap(),
            1
        );
        assert!(session.import_melody(r#"[{"noteName": "C2", "duration": -1.0}]"#).is_err());
        assert_eq!(session.melody().len(), 1);
        assert_eq!(session.melody().notes()[0].pitch, 0);
    }

    #[test]
    fn preview_restores_state_exactly() {
        let t0 = Instant::now();
        let mut session = session();
        session.set_arp_config(
            ArpeggiatorConfig {
                enabled: false,
                ..arp_on(ArpPattern::Up)
            },
            t0,
        );
        let mut recorder = RecordingTrigger::new();
        session.press(2, &mut recorder);
        session.press(9, &mut recorder);
        recorder.clear();

        session.preview_arpeggio(&[0, 4, 7], ms(350), t0);
        assert!(session.is_previewing());
        assert!(session.arpeggiator().is_running());
        assert!(!session.config().arpeggiator.enabled);

        for n in 1..=3 {
            session.tick(t0 + ms(100 * n), &mut recorder);
        }
        assert_eq!(recorder.pitches(), vec![0, 4, 7]);

        session.tick(t0 + ms(400), &mut recorder);
        assert!(!session.is_previewing());
        assert!(!session.arpeggiator().is_running());
        assert_eq!(session.held_keys().snapshot(), [2, 9].into_iter().collect());
        assert_eq!(recorder.pitches(), vec![0, 4, 7]);
    }

    #[test]
    fn preview_restores_enabled_arp() {
        let t0 = Instant::now();
        let mut session = session();
        session.set_arp_config(arp_on(ArpPattern::Down), t0);
        session.preview_arpeggio(&[0, 12], ms(200), t0);
        session.preview_arpeggio(&[5], ms(200), t0 + ms(100));
        let mut recorder = RecordingTrigger::new();
        session.tick(t0 + ms(300), &mut recorder);
        assert!(!session.is_previewing());
        assert!(session.arpeggiator().is_running());
        assert!(session.held_keys().is_empty());
    }

    #[test]
    fn reconfiguring_during_preview_keeps_the_new_choice() {
        let t0 = Instant::now();
        let mut session = session();
        let mut recorder = RecordingTrigger::new();
        session.press(2, &mut recorder);
        session.preview_arpeggio(&[0, 4, 7], ms(500), t0);

        session.set_arp_config(arp_on(ArpPattern::Up), t0 + ms(100));
        assert!(!session.is_previewing());
        assert!(session.config().arpeggiator.enabled);
        assert_eq!(session.held_keys().snapshot(), [2].into_iter().collect());

        // The old deadline passing must not flip the arpeggiator back off.
        session.tick(t0 + ms(600), &mut recorder);
        assert!(session.arpeggiator().is_running());
        assert!(session.config().arpeggiator.enabled);
    }

    #[test]
    fn config_round_trips() {
        let t0 = Instant::now();
        let mut session = session();
        let config = PlayerConfig {
            tempo: 1.5,
            transpose: -3,
            arpeggiator: arp_on(ArpPattern::UpDown),
            voice: Voice {
                instrument: Instrument::Synth,
                vibrato: true,
                vibrato_depth: 0.5,
            },
            theory: TheorySettings {
                root: Key::A,
                scale: Scale::Minor,
                show_root: true,
                show_scale: true,
            },
        };
        session.apply_config(config, t0);
        assert_eq!(session.config(), config);
        assert!(session.arpeggiator().is_running());
    }

    #[test]
    fn next_wake_tracks_arp_and_preview() {
        let t0 = Instant::now();
        let mut session = session();
        assert_eq!(session.next_wake(), None);
        session.preview_arpeggio(&[0], ms(50), t0);
        assert_eq!(session.next_wake(), Some(t0 + ms(50)));
    }
}
