//! Melody store and melody import.
//!
//! A [`MelodyStore`] is an immutable, start-time-sorted note sequence. The
//! transport's forward cursor depends on that ordering, so every constructor
//! sorts. Import accepts two JSON shapes:
//!
//! - sequential: `[{"noteName": "C4", "duration": 0.5}, ...]`, start times are
//!   the running sum of durations in input order
//! - timed: `[{"midi": 60, "startTime": 0.0, "duration": 0.5, "velocity": 0.8}, ...]`
//!
//! Either shape may be wrapped as `{"notes": [...]}`. A document that fails
//! validation is rejected as a whole; a note whose pitch cannot be resolved is
//! dropped on its own.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use keyglow_types::{Note, PitchIndex, PitchRange, MIDI_MAX};

/// Silence appended after the last note ends.
pub const TAIL_PADDING_SECS: f64 = 0.5;

#[derive(Error, Debug)]
pub enum MelodyError {
    #[error("Could not read melody file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed melody document: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Note {index}: start time {value} must be a finite, non-negative number of seconds")]
    InvalidStartTime { index: usize, value: f64 },

    #[error("Note {index}: duration {value} must be a finite, positive number of seconds")]
    InvalidDuration { index: usize, value: f64 },

    #[error("Note {index}: velocity {value} must lie between 0.0 and 1.0")]
    InvalidVelocity { index: usize, value: f32 },

    #[error("Note {index}: timed melodies need a startTime on every note")]
    MissingStartTime { index: usize },
}

/// Immutable, sorted note sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MelodyStore {
    notes: Vec<Note>,
    total_duration: f64,
}

impl MelodyStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and sort `notes` by start time (stable for equal starts).
    pub fn new(mut notes: Vec<Note>) -> Result<Self, MelodyError> {
        for (index, note) in notes.iter().enumerate() {
            validate(index, note)?;
        }
        notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let total_duration = notes
            .iter()
            .map(Note::end_time)
            .reduce(f64::max)
            .map_or(0.0, |end| end + TAIL_PADDING_SECS);

        Ok(Self {
            notes,
            total_duration,
        })
    }

    /// Build from `(pitch, duration)` pairs played back to back.
    pub fn sequential(steps: &[(PitchIndex, f64)]) -> Result<Self, MelodyError> {
        let mut clock = 0.0;
        let notes = steps
            .iter()
            .map(|&(pitch, duration)| {
                let note = Note::new(pitch, clock, duration);
                clock += duration;
                note
            })
            .collect();
        Self::new(notes)
    }

    pub fn from_json(json: &str, range: PitchRange) -> Result<Self, MelodyError> {
        let document: MelodyDocument = serde_json::from_str(json)?;
        let entries = document.into_entries();
        if entries.iter().any(|e| e.start_time.is_some()) {
            Self::new(timed_notes(entries, range)?)
        } else {
            Self::new(sequential_notes(entries, range)?)
        }
    }

    pub fn load_file(path: &Path, range: PitchRange) -> Result<Self, MelodyError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents, range)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// End of the last sounding note plus tail padding; 0 when empty.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Index of the first note starting at or after `t`.
    pub fn first_starting_at_or_after(&self, t: f64) -> usize {
        self.notes.partition_point(|n| n.start_time < t)
    }

    /// Number of notes starting at or before `t`.
    pub fn started_by(&self, t: f64) -> usize {
        self.notes.partition_point(|n| n.start_time <= t)
    }
}

fn validate(index: usize, note: &Note) -> Result<(), MelodyError> {
    if !note.start_time.is_finite() || note.start_time < 0.0 {
        return Err(MelodyError::InvalidStartTime {
            index,
            value: note.start_time,
        });
    }
    if !note.duration.is_finite() || note.duration <= 0.0 {
        return Err(MelodyError::InvalidDuration {
            index,
            value: note.duration,
        });
    }
    if let Some(velocity) = note.velocity {
        if !(0.0..=1.0).contains(&velocity) {
            return Err(MelodyError::InvalidVelocity {
                index,
                value: velocity,
            });
        }
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MelodyDocument {
    Bare(Vec<RawNote>),
    Wrapped { notes: Vec<RawNote> },
}

impl MelodyDocument {
    fn into_entries(self) -> Vec<RawNote> {
        match self {
            MelodyDocument::Bare(notes) | MelodyDocument::Wrapped { notes } => notes,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNote {
    note_name: Option<String>,
    midi: Option<i32>,
    start_time: Option<f64>,
    duration: f64,
    velocity: Option<f32>,
}

impl RawNote {
    fn pitch(&self, range: PitchRange) -> Option<PitchIndex> {
        match (&self.note_name, self.midi) {
            (_, Some(midi)) => (0..=MIDI_MAX)
                .contains(&midi)
                .then(|| range.pitch_for_midi(midi)),
            (Some(name), None) => range.pitch_for_name(name),
            (None, None) => None,
        }
    }
}

fn sequential_notes(entries: Vec<RawNote>, range: PitchRange) -> Result<Vec<Note>, MelodyError> {
    let mut clock = 0.0;
    let mut notes = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if !entry.duration.is_finite() || entry.duration <= 0.0 {
            return Err(MelodyError::InvalidDuration {
                index,
                value: entry.duration,
            });
        }
        let start_time = clock;
        clock += entry.duration;

        // Unresolvable names leave a rest of the same length.
        let Some(pitch) = entry.pitch(range) else {
            log::debug!(target: "melody", "dropping note {}: unresolvable pitch {:?}", index, entry.note_name);
            continue;
        };
        let note = Note {
            pitch,
            start_time,
            duration: entry.duration,
            velocity: entry.velocity,
        };
        validate(index, &note)?;
        notes.push(note);
    }
    Ok(notes)
}

fn timed_notes(entries: Vec<RawNote>, range: PitchRange) -> Result<Vec<Note>, MelodyError> {
    let mut notes = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let start_time = entry
            .start_time
            .ok_or(MelodyError::MissingStartTime { index })?;
        let Some(pitch) = entry.pitch(range) else {
            log::debug!(target: "melody", "dropping note {}: unresolvable pitch {:?}", index, entry.note_name);
            continue;
        };
        let note = Note {
            pitch,
            start_time,
            duration: entry.duration,
            velocity: entry.velocity,
        };
        validate(index, &note)?;
        notes.push(note);
    }
    Ok(notes)
}
