//! # keyglow-types
//!
//! Shared type definitions for keyglow: notes, pitch indices, arpeggiator and
//! voice settings, and the flat player configuration record.
//! This crate holds plain data only; scheduling lives in keyglow-core.

pub mod pitch;
pub mod state;

pub use pitch::{midi_to_name, parse_note_name, PitchIndex, PitchRange, MIDI_MAX};
pub use state::*;
