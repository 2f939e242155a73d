//! Melody transport: a frame-driven playback clock over a [`MelodyStore`].
//!
//! Position advances by the wall time measured between frames, scaled by the
//! tempo multiplier. Each frame drains every note whose start time has been
//! passed, so a slow frame triggers late notes instead of losing them.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use keyglow_types::PitchIndex;

use crate::clock::{ClockToken, FrameClock, TokenSource};
use crate::melody::MelodyStore;
use crate::sound::SoundOut;

/// Notes that ended longer ago than this stop the backward highlight scan.
pub const DEFAULT_STALENESS_WINDOW_SECS: f64 = 4.0;

pub const MIN_TEMPO: f64 = 0.25;
pub const MAX_TEMPO: f64 = 4.0;

/// Transpose is limited to the span of MIDI note numbers.
pub const MAX_TRANSPOSE: i32 = 127;

pub struct TransportScheduler {
    melody: Arc<MelodyStore>,
    position: f64,
    tempo: f64,
    transpose: i32,
    /// First note not yet triggered at the current position
    cursor: usize,
    clock: Option<FrameClock>,
    tokens: TokenSource,
    active: BTreeSet<PitchIndex>,
    staleness_window: f64,
}

impl Default for TransportScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportScheduler {
    pub fn new() -> Self {
        Self {
            melody: Arc::new(MelodyStore::empty()),
            position: 0.0,
            tempo: 1.0,
            transpose: 0,
            cursor: 0,
            clock: None,
            tokens: TokenSource::default(),
            active: BTreeSet::new(),
            staleness_window: DEFAULT_STALENESS_WINDOW_SECS,
        }
    }

    pub fn with_staleness_window(mut self, secs: f64) -> Self {
        if secs.is_finite() && secs >= 0.0 {
            self.staleness_window = secs;
        }
        self
    }

    /// Replace the melody. Always stops first; the old cursor means nothing
    /// against a new store.
    pub fn load(&mut self, melody: Arc<MelodyStore>) {
        self.stop();
        log::info!(
            target: "transport",
            "loaded melody: {} notes, {:.2}s",
            melody.len(),
            melody.total_duration()
        );
        self.melody = melody;
    }

    pub fn melody(&self) -> &Arc<MelodyStore> {
        &self.melody
    }

    /// Start advancing from the current position. Returns false if already
    /// playing or there is nothing to play.
    pub fn play(&mut self, now: Instant) -> bool {
        if self.clock.is_some() {
            return false;
        }
        if self.melody.is_empty() {
            log::debug!(target: "transport", "play ignored: empty melody");
            return false;
        }
        let token = self.tokens.issue();
        log::debug!(target: "transport", "play from {:.3}s (clock {})", self.position, token);
        self.clock = Some(FrameClock::start(token, now));
        true
    }

    /// Freeze the position. The cursor stays where it is.
    pub fn pause(&mut self) {
        if let Some(clock) = self.clock.take() {
            log::debug!(target: "transport", "pause at {:.3}s (clock {})", self.position, clock.token());
        }
    }

    pub fn stop(&mut self) {
        self.clock = None;
        self.position = 0.0;
        self.cursor = 0;
        self.active.clear();
    }

    /// Jump to `t` (clamped to the melody) and rebuild cursor and highlights
    /// from scratch.
    pub fn seek(&mut self, t: f64) {
        let t = if t.is_finite() { t } else { 0.0 };
        self.position = t.clamp(0.0, self.melody.total_duration());
        self.cursor = self.melody.first_starting_at_or_after(self.position);
        self.active = self.projection_at(self.position);
    }

    pub fn set_tempo(&mut self, multiplier: f64) {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            log::warn!(target: "transport", "ignoring invalid tempo {}", multiplier);
            return;
        }
        self.tempo = multiplier.clamp(MIN_TEMPO, MAX_TEMPO);
    }

    pub fn set_transpose(&mut self, semitones: i32) {
        self.transpose = semitones.clamp(-MAX_TRANSPOSE, MAX_TRANSPOSE);
        self.active = self.projection_at(self.position);
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_some()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn transpose(&self) -> i32 {
        self.transpose
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn duration(&self) -> f64 {
        self.melody.total_duration()
    }

    /// Transport-active projection at the current position.
    pub fn active(&self) -> &BTreeSet<PitchIndex> {
        &self.active
    }

    pub fn clock_token(&self) -> Option<ClockToken> {
        self.clock.as_ref().map(FrameClock::token)
    }

    /// Deliver a frame armed under `token`. Frames from a stopped or
    /// replaced clock are not delivered.
    pub fn fire(&mut self, token: ClockToken, now: Instant, out: &mut SoundOut<'_>) -> bool {
        if self.clock_token() != Some(token) {
            return false;
        }
        self.tick(now, out);
        true
    }

    /// Per-frame callback.
    pub fn tick(&mut self, now: Instant, out: &mut SoundOut<'_>) {
        let Some(clock) = self.clock.as_mut() else {
            return;
        };
        let elapsed = clock.frame(now);
        self.advance(elapsed, out);
    }

    fn advance(&mut self, elapsed: Duration, out: &mut SoundOut<'_>) {
        self.position += elapsed.as_secs_f64() * self.tempo;

        while let Some(note) = self.melody.notes().get(self.cursor) {
            if note.start_time > self.position {
                break;
            }
            out.fire(note.pitch.saturating_add(self.transpose));
            self.cursor += 1;
        }

        if self.position >= self.melody.total_duration() {
            log::debug!(target: "transport", "reached end at {:.3}s", self.position);
            self.stop();
            return;
        }
        self.active = self.projection_at(self.position);
    }

    /// Pitches sounding at `t`: a backward scan from the last note started by
    /// `t`, cut off once notes ended more than the staleness window ago.
    /// Depends only on `t`, the melody and the transpose.
    pub fn projection_at(&self, t: f64) -> BTreeSet<PitchIndex> {
        let notes = self.melody.notes();
        let upper = self.melody.started_by(t);
        let horizon = t - self.staleness_window;

        let mut active = BTreeSet::new();
        for note in notes[..upper].iter().rev() {
            if note.end_time() < horizon {
                break;
            }
            if note.sounds_at(t) {
                active.insert(note.pitch.saturating_add(self.transpose));
            }
        }
        active
    }
}
