use serde::{Deserialize, Serialize};

/// Render state of a single key, ordered by priority (highest last).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyHighlight {
    #[default]
    Idle,
    /// Member of the selected scale
    Scale,
    /// Root of the selected key
    Root,
    /// Sounding now: pressed, arpeggiated or played back
    Active,
}

impl KeyHighlight {
    pub fn is_active(&self) -> bool {
        matches!(self, KeyHighlight::Active)
    }
}
