use serde::{Deserialize, Serialize};

use super::arpeggiator::ArpeggiatorConfig;
use super::music::{Key, Scale};
use super::voice::Voice;

/// Which theory overlay the keyboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TheorySettings {
    pub root: Key,
    pub scale: Scale,
    pub show_root: bool,
    pub show_scale: bool,
}

impl Default for TheorySettings {
    fn default() -> Self {
        Self {
            root: Key::C,
            scale: Scale::Major,
            show_root: true,
            show_scale: false,
        }
    }
}

/// Flat record of everything a user preset captures.
///
/// Storage is somebody else's problem; the session only produces and
/// consumes this record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerConfig {
    pub tempo: f64,
    pub transpose: i32,
    pub arpeggiator: ArpeggiatorConfig,
    pub voice: Voice,
    pub theory: TheorySettings,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tempo: 1.0,
            transpose: 0,
            arpeggiator: ArpeggiatorConfig::default(),
            voice: Voice::default(),
            theory: TheorySettings::default(),
        }
    }
}
