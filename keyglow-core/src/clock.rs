//! Scheduler clocks and their cancellation tokens.
//!
//! A running scheduler owns `Option<Clock>`. Stopping takes the clock out, so
//! there is no tick path left that could run with pre-stop state. Every clock
//! carries a [`ClockToken`]; hosts that arm external timers hand the token
//! back on wake-up, and a token from a dead clock never matches a live one.

use std::time::{Duration, Instant};

/// Identity of one clock lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockToken(u64);

impl ClockToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues strictly increasing tokens.
#[derive(Debug, Default)]
pub struct TokenSource {
    generation: u64,
}

impl TokenSource {
    pub fn issue(&mut self) -> ClockToken {
        self.generation += 1;
        ClockToken(self.generation)
    }
}

/// A scheduled host wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    pub token: ClockToken,
    pub at: Instant,
}

/// Variable-period clock driven by rendered frames.
#[derive(Debug)]
pub struct FrameClock {
    token: ClockToken,
    last_frame: Instant,
}

impl FrameClock {
    pub fn start(token: ClockToken, now: Instant) -> Self {
        Self {
            token,
            last_frame: now,
        }
    }

    pub fn token(&self) -> ClockToken {
        self.token
    }

    /// Wall time since the previous frame. Out-of-order instants count as zero.
    pub fn frame(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_frame);
        if now > self.last_frame {
            self.last_frame = now;
        }
        elapsed
    }
}

/// Fixed-period clock.
///
/// Fires at most once per poll. After a stall the missed periods are dropped
/// rather than replayed as a burst.
#[derive(Debug)]
pub struct IntervalClock {
    token: ClockToken,
    period: Duration,
    next_due: Instant,
}

impl IntervalClock {
    pub fn start(token: ClockToken, period: Duration, now: Instant) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            token,
            period,
            next_due: now + period,
        }
    }

    pub fn token(&self) -> ClockToken {
        self.token
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn wake(&self) -> Wake {
        Wake {
            token: self.token,
            at: self.next_due,
        }
    }

    /// Returns true when a step is due at `now`, re-arming strictly after `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.period;
        if self.next_due <= now {
            let behind = now.duration_since(self.next_due).as_nanos();
            let skipped = behind / self.period.as_nanos() + 1;
            self.next_due += self.period * skipped.min(u32::MAX as u128) as u32;
        }
        true
    }
}
