use std::sync::mpsc::Sender;
use std::time::Duration;

use keyglow_types::{
    ArpeggiatorConfig, KeyHighlight, PitchIndex, PlayerConfig, TheorySettings, Voice,
};

use crate::melody::MelodyStore;

/// Commands sent from the caller's thread to the player thread.
#[derive(Debug)]
pub enum PlayerCmd {
    // ── Input ─────────────────────────────────────────────────────
    Press(PitchIndex),
    Release(PitchIndex),
    NoteOn { midi: u8, velocity: u8 },
    NoteOff { midi: u8 },

    // ── Transport ─────────────────────────────────────────────────
    LoadMelody(MelodyStore),
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetTempo(f64),
    SetTranspose(i32),

    // ── Arpeggiator ───────────────────────────────────────────────
    SetArpConfig(ArpeggiatorConfig),
    PreviewArpeggio {
        pitches: Vec<PitchIndex>,
        duration: Duration,
    },

    // ── Settings ──────────────────────────────────────────────────
    SetVoice(Voice),
    SetTheory(TheorySettings),
    ApplyConfig(PlayerConfig),
    GetConfig {
        reply: Sender<PlayerConfig>,
    },

    Shutdown,
}

/// What the display needs from one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    pub position: f64,
    pub duration: f64,
    pub playing: bool,
    pub arp_running: bool,
    pub highlights: Vec<KeyHighlight>,
}

/// Feedback sent from the player thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerFeedback {
    /// Visible state changed since the last frame that was sent
    Frame(FrameState),
    /// Playback ran off the end of the melody
    PlaybackFinished,
}
