//! Registry of pitches currently held down by any input source.

use std::collections::BTreeSet;

use keyglow_types::PitchIndex;

/// Which pitches are down right now. Iteration order is ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldKeys {
    keys: BTreeSet<PitchIndex>,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the key was not already held.
    pub fn press(&mut self, pitch: PitchIndex) -> bool {
        self.keys.insert(pitch)
    }

    /// Returns true if the key was held.
    pub fn release(&mut self, pitch: PitchIndex) -> bool {
        self.keys.remove(&pitch)
    }

    pub fn snapshot(&self) -> BTreeSet<PitchIndex> {
        self.keys.clone()
    }

    pub fn keys(&self) -> &BTreeSet<PitchIndex> {
        &self.keys
    }

    pub fn contains(&self, pitch: PitchIndex) -> bool {
        self.keys.contains(&pitch)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Swap in a whole new set, returning the old one.
    pub fn replace(&mut self, keys: BTreeSet<PitchIndex>) -> BTreeSet<PitchIndex> {
        std::mem::replace(&mut self.keys, keys)
    }
}
