//! Arpeggiator: a fixed-period step clock over the held-key registry.
//!
//! Each step rebuilds the note sequence from whatever is held at that moment,
//! so the pattern follows chord changes without restarting. Only
//! reconfiguration resets the step index.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use keyglow_types::{ArpPattern, ArpeggiatorConfig, PitchIndex};

use crate::clock::{ClockToken, IntervalClock, TokenSource, Wake};
use crate::sound::SoundOut;

const OCTAVE: PitchIndex = 12;

/// Expand held pitches across `octave_span` octaves and apply the pattern's
/// ordering. `Random` keeps the ascending order; selection happens per step.
pub fn expand_sequence(
    held: &BTreeSet<PitchIndex>,
    octave_span: u8,
    pattern: ArpPattern,
) -> Vec<PitchIndex> {
    let octaves = PitchIndex::from(octave_span.max(1));
    let mut sequence: Vec<PitchIndex> = (0..octaves)
        .flat_map(|octave| held.iter().map(move |&pitch| pitch.saturating_add(octave * OCTAVE)))
        .collect();

    match pattern {
        ArpPattern::Down => sequence.reverse(),
        ArpPattern::UpDown => {
            // Come back down without repeating either endpoint.
            if sequence.len() > 2 {
                let descent: Vec<PitchIndex> =
                    sequence[1..sequence.len() - 1].iter().rev().copied().collect();
                sequence.extend(descent);
            }
        }
        ArpPattern::Up | ArpPattern::Random => {}
    }
    sequence
}

pub struct ArpeggiatorScheduler {
    config: ArpeggiatorConfig,
    clock: Option<IntervalClock>,
    tokens: TokenSource,
    step_index: usize,
    /// Pitch triggered by the most recent step
    active: Option<PitchIndex>,
    rng: StdRng,
}

impl Default for ArpeggiatorScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ArpeggiatorScheduler {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic random pattern, for tests and reproducible previews.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            config: ArpeggiatorConfig::default(),
            clock: None,
            tokens: TokenSource::default(),
            step_index: 0,
            active: None,
            rng,
        }
    }

    pub fn config(&self) -> ArpeggiatorConfig {
        self.config
    }

    /// Replace the whole configuration. The running clock (if any) is torn
    /// down and, when enabled, a fresh one starts at step 0.
    pub fn set_config(&mut self, config: ArpeggiatorConfig, now: Instant) {
        let config = config.clamped();
        self.stop();
        self.config = config;
        log::debug!(
            target: "arp",
            "config: enabled={} pattern={} period={}ms octaves={}",
            config.enabled,
            config.pattern.name(),
            config.step_period_ms,
            config.octave_span
        );
        if config.enabled {
            self.start(now);
        }
    }

    /// Arm a new clock. First step fires one period after `now`.
    pub fn start(&mut self, now: Instant) {
        if self.clock.is_some() {
            return;
        }
        let period = Duration::from_millis(u64::from(self.config.step_period_ms));
        let token = self.tokens.issue();
        log::debug!(target: "arp", "start clock {} every {:?}", token, period);
        self.clock = Some(IntervalClock::start(token, period, now));
        self.step_index = 0;
    }

    pub fn stop(&mut self) {
        if let Some(clock) = self.clock.take() {
            log::debug!(target: "arp", "stop clock {}", clock.token());
        }
        self.step_index = 0;
        self.active = None;
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_some()
    }

    pub fn active(&self) -> Option<PitchIndex> {
        self.active
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn clock_token(&self) -> Option<ClockToken> {
        self.clock.as_ref().map(IntervalClock::token)
    }

    /// When the host should wake us next.
    pub fn next_wake(&self) -> Option<Wake> {
        self.clock.as_ref().map(IntervalClock::wake)
    }

    /// Deliver a wake-up armed under `token`. Returns false, doing nothing,
    /// when that clock has since been stopped or replaced.
    pub fn fire(
        &mut self,
        token: ClockToken,
        now: Instant,
        held: &BTreeSet<PitchIndex>,
        transpose: i32,
        out: &mut SoundOut<'_>,
    ) -> bool {
        if self.clock_token() != Some(token) {
            return false;
        }
        self.tick(now, held, transpose, out);
        true
    }

    /// Poll the step clock and run a step if one is due.
    pub fn tick(
        &mut self,
        now: Instant,
        held: &BTreeSet<PitchIndex>,
        transpose: i32,
        out: &mut SoundOut<'_>,
    ) {
        let due = match self.clock.as_mut() {
            Some(clock) => clock.poll(now),
            None => false,
        };
        if due {
            self.step(held, transpose, out);
        }
    }

    fn step(&mut self, held: &BTreeSet<PitchIndex>, transpose: i32, out: &mut SoundOut<'_>) {
        if held.is_empty() {
            self.active = None;
            return;
        }

        let sequence = expand_sequence(held, self.config.octave_span, self.config.pattern);
        let index = match self.config.pattern {
            ArpPattern::Random => self.rng.gen_range(0..sequence.len()),
            _ => self.step_index % sequence.len(),
        };
        self.step_index = self.step_index.wrapping_add(1);

        let pitch = sequence[index].saturating_add(transpose);
        self.active = if out.fire(pitch) { Some(pitch) } else { None };
    }
}
