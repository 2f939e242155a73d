//! Key-highlight projection.
//!
//! A pure merge of every live source into one render state per key. Nothing
//! here is stored between calls and nothing feeds back into scheduling.

use std::collections::BTreeSet;

use keyglow_types::{KeyHighlight, PitchIndex, PitchRange, TheorySettings};

/// Everything the projector looks at.
#[derive(Debug, Clone, Copy)]
pub struct HighlightSources<'a> {
    /// Keys held by manual or MIDI input that are sounding directly
    pub pressed: &'a BTreeSet<PitchIndex>,
    /// Notes the transport is playing back at its position
    pub transport: &'a BTreeSet<PitchIndex>,
    /// Pitch of the latest arpeggiator step
    pub arpeggiator: Option<PitchIndex>,
    pub theory: &'a TheorySettings,
}

/// Render state of one key.
pub fn highlight_for(pitch: PitchIndex, sources: &HighlightSources<'_>, range: PitchRange) -> KeyHighlight {
    if sources.arpeggiator == Some(pitch)
        || sources.pressed.contains(&pitch)
        || sources.transport.contains(&pitch)
    {
        return KeyHighlight::Active;
    }

    let theory = sources.theory;
    let pitch_class = range.pitch_class(pitch);
    if theory.show_root && pitch_class == theory.root.semitone() {
        KeyHighlight::Root
    } else if theory.show_scale && theory.scale.contains(theory.root, pitch_class) {
        KeyHighlight::Scale
    } else {
        KeyHighlight::Idle
    }
}

/// Render state for every key in `range`, lowest first.
pub fn project(sources: &HighlightSources<'_>, range: PitchRange) -> Vec<KeyHighlight> {
    (0..range.key_count)
        .map(|pitch| highlight_for(pitch, sources, range))
        .collect()
}
