use serde::{Deserialize, Serialize};

/// Instrument timbre requested from the sound back end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    #[default]
    Piano,
    ElectricPiano,
    Organ,
    Synth,
}

impl Instrument {
    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::ElectricPiano => "electric-piano",
            Instrument::Organ => "organ",
            Instrument::Synth => "synth",
        }
    }

    pub fn from_name(name: &str) -> Option<Instrument> {
        match name.to_lowercase().as_str() {
            "piano" => Some(Instrument::Piano),
            "electric-piano" | "epiano" => Some(Instrument::ElectricPiano),
            "organ" => Some(Instrument::Organ),
            "synth" => Some(Instrument::Synth),
            _ => None,
        }
    }
}

/// Performance parameters passed along with every trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    pub instrument: Instrument,
    pub vibrato: bool,
    /// 0.0-1.0
    pub vibrato_depth: f32,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            instrument: Instrument::Piano,
            vibrato: false,
            vibrato_depth: 0.3,
        }
    }
}

impl Voice {
    pub fn clamped(self) -> Self {
        Self {
            vibrato_depth: self.vibrato_depth.clamp(0.0, 1.0),
            ..self
        }
    }
}
