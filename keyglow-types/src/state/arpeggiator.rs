use serde::{Deserialize, Serialize};

/// Arpeggiator configuration. Any change restarts the step clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArpeggiatorConfig {
    pub enabled: bool,
    pub step_period_ms: u32,
    pub pattern: ArpPattern,
    pub octave_span: u8,
}

impl Default for ArpeggiatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            step_period_ms: 150,
            pattern: ArpPattern::Up,
            octave_span: 1,
        }
    }
}

impl ArpeggiatorConfig {
    pub const MIN_STEP_PERIOD_MS: u32 = 20;
    pub const MAX_STEP_PERIOD_MS: u32 = 2000;
    pub const MAX_OCTAVE_SPAN: u8 = 4;

    /// Clamp period and octave span into their supported ranges.
    pub fn clamped(self) -> Self {
        Self {
            step_period_ms: self
                .step_period_ms
                .clamp(Self::MIN_STEP_PERIOD_MS, Self::MAX_STEP_PERIOD_MS),
            octave_span: self.octave_span.clamp(1, Self::MAX_OCTAVE_SPAN),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArpPattern {
    #[default]
    Up,
    Down,
    UpDown,
    Random,
}

impl ArpPattern {
    pub const ALL: [ArpPattern; 4] = [
        ArpPattern::Up,
        ArpPattern::Down,
        ArpPattern::UpDown,
        ArpPattern::Random,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArpPattern::Up => "up",
            ArpPattern::Down => "down",
            ArpPattern::UpDown => "up-down",
            ArpPattern::Random => "random",
        }
    }

    pub fn from_name(name: &str) -> Option<ArpPattern> {
        match name.to_lowercase().as_str() {
            "up" => Some(ArpPattern::Up),
            "down" => Some(ArpPattern::Down),
            "up-down" | "updown" | "up_down" => Some(ArpPattern::UpDown),
            "random" => Some(ArpPattern::Random),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_names_round_trip() {
        for pattern in ArpPattern::ALL {
            assert_eq!(ArpPattern::from_name(pattern.name()), Some(pattern));
        }
        assert_eq!(ArpPattern::from_name("sideways"), None);
    }

    #[test]
    fn clamped_fixes_zero_period_and_span() {
        let config = ArpeggiatorConfig {
            step_period_ms: 0,
            octave_span: 0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(config.step_period_ms, ArpeggiatorConfig::MIN_STEP_PERIOD_MS);
        assert_eq!(config.octave_span, 1);
    }

    #[test]
    fn serializes_pattern_in_kebab_case() {
        let json = serde_json::to_string(&ArpPattern::UpDown).unwrap();
        assert_eq!(json, "\"up-down\"");
    }
}
