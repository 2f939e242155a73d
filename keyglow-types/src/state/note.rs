use serde::{Deserialize, Serialize};

use crate::PitchIndex;

/// A single time-stamped note. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub pitch: PitchIndex,
    pub start_time: f64,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f32>,
}

impl Note {
    pub fn new(pitch: PitchIndex, start_time: f64, duration: f64) -> Self {
        Self {
            pitch,
            start_time,
            duration,
            velocity: None,
        }
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Whether `t` falls inside `[start_time, start_time + duration)`.
    pub fn sounds_at(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time()
    }
}
