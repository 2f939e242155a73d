//! Terminal stand-ins for the sound back end and the keyboard view.

use keyglow_core::sound::SoundTrigger;
use keyglow_types::{KeyHighlight, PitchIndex, PitchRange, Voice};

/// Prints each trigger instead of synthesizing it.
pub struct ConsoleTrigger {
    range: PitchRange,
}

impl ConsoleTrigger {
    pub fn new(range: PitchRange) -> Self {
        Self { range }
    }
}

impl SoundTrigger for ConsoleTrigger {
    fn trigger(&mut self, pitch: PitchIndex, voice: &Voice) {
        let vibrato = if voice.vibrato {
            format!(" ~{:.2}", voice.vibrato_depth)
        } else {
            String::new()
        };
        println!(
            "  note {:<4} {}{}",
            self.range.name_for_pitch(pitch),
            voice.instrument.name(),
            vibrato
        );
        log::trace!(target: "sound", "trigger {}", pitch);
    }
}

/// One character per key: `#` sounding, `R` root, `-` in scale, `.` idle.
pub fn render_keys(highlights: &[KeyHighlight]) -> String {
    highlights
        .iter()
        .map(|h| match h {
            KeyHighlight::Active => '#',
            KeyHighlight::Root => 'R',
            KeyHighlight::Scale => '-',
            KeyHighlight::Idle => '.',
        })
        .collect()
}
