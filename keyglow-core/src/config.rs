use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use keyglow_types::{
    ArpPattern, ArpeggiatorConfig, Instrument, Key, PitchRange, PlayerConfig, Scale,
    TheorySettings, Voice,
};

use crate::transport::{DEFAULT_STALENESS_WINDOW_SECS, MAX_TEMPO, MIN_TEMPO};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    instrument: InstrumentConfig,
    #[serde(default)]
    transport: TransportConfig,
    #[serde(default)]
    arpeggiator: ArpConfig,
    #[serde(default)]
    voice: VoiceConfig,
    #[serde(default)]
    theory: TheoryConfig,
}

#[derive(Deserialize, Default)]
struct InstrumentConfig {
    reference_midi: Option<i32>,
    key_count: Option<i32>,
}

#[derive(Deserialize, Default)]
struct TransportConfig {
    tempo: Option<f64>,
    frame_interval_ms: Option<u64>,
    staleness_window_secs: Option<f64>,
}

#[derive(Deserialize, Default)]
struct ArpConfig {
    step_period_ms: Option<u32>,
    pattern: Option<String>,
    octave_span: Option<u8>,
}

#[derive(Deserialize, Default)]
struct VoiceConfig {
    instrument: Option<String>,
    vibrato: Option<bool>,
    vibrato_depth: Option<f32>,
}

#[derive(Deserialize, Default)]
struct TheoryConfig {
    root: Option<String>,
    scale: Option<String>,
    show_root: Option<bool>,
    show_scale: Option<bool>,
}

/// Startup defaults: embedded `config.toml` overlaid with the user's file.
pub struct Config {
    instrument: InstrumentConfig,
    transport: TransportConfig,
    arpeggiator: ArpConfig,
    voice: VoiceConfig,
    theory: TheoryConfig,
}

impl Config {
    /// Embedded defaults plus `<config_dir>/keyglow/config.toml` if present.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::embedded(),
        }
    }

    /// Embedded defaults overlaid with the file at `path`. A missing,
    /// unreadable or malformed file leaves the defaults untouched.
    pub fn load_from(path: &Path) -> Self {
        let mut base = Self::embedded_file();

        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => merge(&mut base, user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }

        Self::from_file(base)
    }

    pub fn embedded() -> Self {
        Self::from_file(Self::embedded_file())
    }

    fn embedded_file() -> ConfigFile {
        toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml")
    }

    fn from_file(file: ConfigFile) -> Self {
        Config {
            instrument: file.instrument,
            transport: file.transport,
            arpeggiator: file.arpeggiator,
            voice: file.voice,
            theory: file.theory,
        }
    }

    pub fn pitch_range(&self) -> PitchRange {
        let fallback = PitchRange::default();
        PitchRange::new(
            self.instrument
                .reference_midi
                .unwrap_or(fallback.reference_midi)
                .clamp(0, 127),
            self.instrument
                .key_count
                .unwrap_or(fallback.key_count)
                .clamp(1, 128),
        )
    }

    /// Frame period the player thread ticks the transport at (clamped to 1..100 ms).
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.transport.frame_interval_ms.unwrap_or(16).clamp(1, 100))
    }

    pub fn staleness_window_secs(&self) -> f64 {
        self.transport
            .staleness_window_secs
            .filter(|s| s.is_finite() && *s >= 0.0)
            .unwrap_or(DEFAULT_STALENESS_WINDOW_SECS)
    }

    /// The player record a fresh session starts with. The arpeggiator starts disabled.
    pub fn player_defaults(&self) -> PlayerConfig {
        let fallback = PlayerConfig::default();
        let arp_fallback = ArpeggiatorConfig::default();
        let voice_fallback = Voice::default();
        let theory_fallback = TheorySettings::default();

        PlayerConfig {
            tempo: self
                .transport
                .tempo
                .filter(|t| t.is_finite() && *t > 0.0)
                .map_or(fallback.tempo, |t| t.clamp(MIN_TEMPO, MAX_TEMPO)),
            arpeggiator: ArpeggiatorConfig {
                enabled: false,
                step_period_ms: self
                    .arpeggiator
                    .step_period_ms
                    .unwrap_or(arp_fallback.step_period_ms),
                pattern: self
                    .arpeggiator
                    .pattern
                    .as_deref()
                    .and_then(ArpPattern::from_name)
                    .unwrap_or(arp_fallback.pattern),
                octave_span: self
                    .arpeggiator
                    .octave_span
                    .unwrap_or(arp_fallback.octave_span),
            }
            .clamped(),
            voice: Voice {
                instrument: self
                    .voice
                    .instrument
                    .as_deref()
                    .and_then(Instrument::from_name)
                    .unwrap_or(voice_fallback.instrument),
                vibrato: self.voice.vibrato.unwrap_or(voice_fallback.vibrato),
                vibrato_depth: self
                    .voice
                    .vibrato_depth
                    .unwrap_or(voice_fallback.vibrato_depth),
            }
            .clamped(),
            theory: TheorySettings {
                root: self
                    .theory
                    .root
                    .as_deref()
                    .and_then(Key::from_name)
                    .unwrap_or(theory_fallback.root),
                scale: self
                    .theory
                    .scale
                    .as_deref()
                    .and_then(Scale::from_name)
                    .unwrap_or(theory_fallback.scale),
                show_root: self.theory.show_root.unwrap_or(theory_fallback.show_root),
                show_scale: self.theory.show_scale.unwrap_or(theory_fallback.show_scale),
            },
            ..fallback
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("keyglow").join("config.toml"))
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    if user.instrument.reference_midi.is_some() {
        base.instrument.reference_midi = user.instrument.reference_midi;
    }
    if user.instrument.key_count.is_some() {
        base.instrument.key_count = user.instrument.key_count;
    }
    if user.transport.tempo.is_some() {
        base.transport.tempo = user.transport.tempo;
    }
    if user.transport.frame_interval_ms.is_some() {
        base.transport.frame_interval_ms = user.transport.frame_interval_ms;
    }
    if user.transport.staleness_window_secs.is_some() {
        base.transport.staleness_window_secs = user.transport.staleness_window_secs;
    }
    if user.arpeggiator.step_period_ms.is_some() {
        base.arpeggiator.step_period_ms = user.arpeggiator.step_period_ms;
    }
    if user.arpeggiator.pattern.is_some() {
        base.arpeggiator.pattern = user.arpeggiator.pattern;
    }
    if user.arpeggiator.octave_span.is_some() {
        base.arpeggiator.octave_span = user.arpeggiator.octave_span;
    }
    if user.voice.instrument.is_some() {
        base.voice.instrument = user.voice.instrument;
    }
    if user.voice.vibrato.is_some() {
        base.voice.vibrato = user.voice.vibrato;
    }
    if user.voice.vibrato_depth.is_some() {
        base.voice.vibrato_depth = user.voice.vibrato_depth;
    }
    if user.theory.root.is_some() {
        base.theory.root = user.theory.root;
    }
    if user.theory.scale.is_some() {
        base.theory.scale = user.theory.scale;
    }
    if user.theory.show_root.is_some() {
        base.theory.show_root = user.theory.show_root;
    }
    if user.theory.show_scale.is_some() {
        base.theory.show_scale = user.theory.show_scale;
    }
}
