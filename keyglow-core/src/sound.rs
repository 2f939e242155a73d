//! The sound-producing seam shared by every scheduler.
//!
//! Schedulers never talk to a synthesizer directly. They hand pitches to a
//! [`SoundOut`], which range-checks them and forwards to whatever
//! [`SoundTrigger`] the host plugged in.

use std::sync::{Arc, Mutex};

use keyglow_types::{PitchIndex, PitchRange, Voice};

/// Fire-and-forget note trigger. Implementations own envelope and decay.
pub trait SoundTrigger {
    fn trigger(&mut self, pitch: PitchIndex, voice: &Voice);
}

impl<F> SoundTrigger for F
where
    F: FnMut(PitchIndex, &Voice),
{
    fn trigger(&mut self, pitch: PitchIndex, voice: &Voice) {
        self(pitch, voice)
    }
}

/// Per-tick view of the sound surface: trigger, voice and playable range.
pub struct SoundOut<'a> {
    sound: &'a mut dyn SoundTrigger,
    voice: &'a Voice,
    range: PitchRange,
}

impl<'a> SoundOut<'a> {
    pub fn new(sound: &'a mut dyn SoundTrigger, voice: &'a Voice, range: PitchRange) -> Self {
        Self {
            sound,
            voice,
            range,
        }
    }

    /// Trigger `pitch` if the instrument can represent it. Returns whether it sounded.
    pub fn fire(&mut self, pitch: PitchIndex) -> bool {
        if !self.range.contains(pitch) {
            log::trace!(target: "sound", "skipping out-of-range pitch {}", pitch);
            return false;
        }
        self.sound.trigger(pitch, self.voice);
        true
    }

    pub fn range(&self) -> PitchRange {
        self.range
    }
}

/// One recorded call to [`SoundTrigger::trigger`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerRecord {
    pub pitch: PitchIndex,
    pub voice: Voice,
}

/// Trigger that remembers every call. Clones share the same log, so a copy
/// can be handed to the player thread while the test keeps the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingTrigger {
    records: Arc<Mutex<Vec<TriggerRecord>>>,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TriggerRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn pitches(&self) -> Vec<PitchIndex> {
        self.records().iter().map(|r| r.pitch).collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl SoundTrigger for RecordingTrigger {
    fn trigger(&mut self, pitch: PitchIndex, voice: &Voice) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(TriggerRecord {
                pitch,
                voice: *voice,
            });
    }
}
