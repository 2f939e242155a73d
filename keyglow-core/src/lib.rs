//! # keyglow-core
//!
//! Playback and arpeggiation scheduling for the keyglow keyboard visualizer.
//! Turns a time-stamped melody, or the set of keys currently held, into
//! correctly ordered sound triggers and per-key highlight state.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Instant;
//! use keyglow_core::config::Config;
//! use keyglow_core::session::Session;
//! use keyglow_core::sound::RecordingTrigger;
//!
//! let config = Config::load();
//! let mut session = Session::from_config(&config, Instant::now());
//! let mut sound = RecordingTrigger::new();
//!
//! session.import_melody(r#"[{"noteName": "C4", "duration": 0.5}]"#)?;
//! session.play(Instant::now());
//! // once per frame:
//! session.tick(Instant::now(), &mut sound);
//! let keys = session.highlights();
//! ```
//!
//! ## Module Overview
//!
//! - [`session`] — `Session`, the composition root every input goes through
//! - [`transport`] — frame-driven melody playback with seek, tempo and transpose
//! - [`arpeggiator`] — fixed-period pattern stepping over the held keys
//! - [`held_keys`] — which keys are down
//! - [`melody`] — the sorted melody store and JSON import
//! - [`highlight`] — pure per-key render-state projection
//! - [`clock`] — frame and interval clocks with cancellation tokens
//! - [`sound`] — the `SoundTrigger` seam
//! - [`player`] — `PlayerHandle`, running a session on its own thread
//! - [`midi`] — hardware MIDI note input
//! - [`config`] — TOML defaults (embedded + user override)

pub mod arpeggiator;
pub mod clock;
pub mod config;
pub mod held_keys;
pub mod highlight;
pub mod melody;
pub mod midi;
pub mod player;
pub mod session;
pub mod sound;
pub mod transport;

pub use keyglow_types as types;
