//! Pitch indices and scientific pitch notation.
//!
//! A pitch index counts semitones up from the instrument's lowest key. The
//! mapping to MIDI note numbers goes through [`PitchRange::reference_midi`].

use serde::{Deserialize, Serialize};

/// Semitone offset from the instrument's low reference key.
pub type PitchIndex = i32;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The span of keys the instrument can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchRange {
    /// MIDI note number of pitch index 0
    pub reference_midi: i32,
    pub key_count: i32,
}

impl Default for PitchRange {
    fn default() -> Self {
        // C2..C7
        Self {
            reference_midi: 36,
            key_count: 61,
        }
    }
}

impl PitchRange {
    pub fn new(reference_midi: i32, key_count: i32) -> Self {
        Self {
            reference_midi,
            key_count: key_count.max(1),
        }
    }

    pub fn contains(&self, pitch: PitchIndex) -> bool {
        (0..self.key_count).contains(&pitch)
    }

    pub fn pitch_for_midi(&self, midi: i32) -> PitchIndex {
        midi.saturating_sub(self.reference_midi)
    }

    pub fn midi_for_pitch(&self, pitch: PitchIndex) -> i32 {
        pitch.saturating_add(self.reference_midi)
    }

    /// Resolve a scientific pitch name ("C4", "F#3", "Bb2") to a pitch index.
    /// The result may fall outside the range; callers decide what to do with it.
    pub fn pitch_for_name(&self, name: &str) -> Option<PitchIndex> {
        parse_note_name(name).map(|midi| self.pitch_for_midi(midi))
    }

    pub fn name_for_pitch(&self, pitch: PitchIndex) -> String {
        midi_to_name(self.midi_for_pitch(pitch))
    }

    /// Pitch class (0 = C) of a pitch index.
    pub fn pitch_class(&self, pitch: PitchIndex) -> i32 {
        self.midi_for_pitch(pitch).rem_euclid(12)
    }
}

/// Highest MIDI note number.
pub const MIDI_MAX: i32 = 127;

/// Parse scientific pitch notation into a MIDI note number (C4 = 60).
///
/// Accepts a letter A-G, any run of `#`/`b` accidentals, then a signed octave.
/// Names that land outside MIDI 0..=127 do not resolve.
pub fn parse_note_name(name: &str) -> Option<i32> {
    let name = name.trim();
    let mut chars = name.chars();
    let letter = chars.next()?;
    let base = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let octave_start = rest
        .find(|c: char| c != '#' && c != 'b')
        .unwrap_or(rest.len());
    let (accidentals, octave) = rest.split_at(octave_start);
    if octave.is_empty() || accidentals.len() > 2 {
        return None;
    }
    let shift: i32 = accidentals
        .chars()
        .map(|c| if c == '#' { 1 } else { -1 })
        .sum();

    let octave: i32 = octave.parse().ok()?;
    let midi = octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(base + shift)?;
    (0..=MIDI_MAX).contains(&midi).then_some(midi)
}

/// Name a MIDI note number using sharps ("C#4").
pub fn midi_to_name(midi: i32) -> String {
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", SHARP_NAMES[midi.rem_euclid(12) as usize], octave)
}
