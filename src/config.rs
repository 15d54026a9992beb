//! Engine configuration loaded from ~/.cadenza/config.yaml.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::event::{is_valid_bpm, DEFAULT_BPM};

/// MIDI output defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiSettings {
    /// Output to open at startup (id or name substring). None = no MIDI.
    #[serde(default)]
    pub device_name: Option<String>,
    /// Channel used for the default instrument (0-15).
    #[serde(default)]
    pub channel: u8,
}

/// Engine-wide settings. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial tempo in BPM.
    #[serde(default = "EngineConfig::default_tempo")]
    pub tempo: f64,
    /// How often the scheduler ticks.
    #[serde(default = "EngineConfig::default_interval_ms")]
    pub scheduler_interval_ms: u64,
    /// How far ahead of the clock notes are dispatched.
    #[serde(default = "EngineConfig::default_lookahead_ms")]
    pub lookahead_ms: u64,
    /// Seed for `rand()`. None = seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Registry name used by `play <pitch>` and step sequences.
    #[serde(default = "EngineConfig::default_instrument")]
    pub default_instrument: String,
    #[serde(default)]
    pub midi: MidiSettings,
}

/// Failure to read or parse a config file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {e}"),
            ConfigError::Parse(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl EngineConfig {
    /// The standard config path, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::home_dir()?.join(".cadenza").join("config.yaml"))
    }

    /// Load from the standard path.
    /// Returns None if the file is missing or malformed.
    pub fn load() -> Option<Self> {
        Self::load_from(Self::default_path()?).ok()
    }

    /// Read and parse `path`. Out-of-range values fall back to their defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config.validated())
    }

    fn validated(mut self) -> Self {
        if !is_valid_bpm(self.tempo) {
            warn!(tempo = self.tempo, "invalid tempo in config, using {DEFAULT_BPM}");
            self.tempo = DEFAULT_BPM;
        }
        self
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler_interval_ms.max(1))
    }

    /// Lookahead window in seconds.
    pub fn lookahead_seconds(&self) -> f64 {
        self.lookahead_ms as f64 / 1000.0
    }

    fn default_tempo() -> f64 {
        DEFAULT_BPM
    }

    fn default_interval_ms() -> u64 {
        25
    }

    fn default_lookahead_ms() -> u64 {
        100
    }

    fn default_instrument() -> String {
        "default".to_string()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tempo: Self::default_tempo(),
            scheduler_interval_ms: Self::default_interval_ms(),
            lookahead_ms: Self::default_lookahead_ms(),
            seed: None,
            default_instrument: Self::default_instrument(),
            midi: MidiSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_approx_eq!(config.tempo, 120.0);
        assert_eq!(config.scheduler_interval(), Duration::from_millis(25));
        assert_approx_eq!(config.lookahead_seconds(), 0.1);
        assert!(config.seed.is_none());
        assert_eq!(config.default_instrument, "default");
        assert_eq!(config.midi, MidiSettings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tempo: 90\nseed: 42\nmidi:\n  device_name: \"IAC\"\n  channel: 9").unwrap();

        let config = EngineConfig::load_from(file.path()).unwrap();
        assert_approx_eq!(config.tempo, 90.0);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.midi.device_name.as_deref(), Some("IAC"));
        assert_eq!(config.midi.channel, 9);
        assert_eq!(config.lookahead_ms, 100);
    }

    #[test]
    fn invalid_tempo_falls_back_to_default() {
        for tempo in ["0", "-120", ".nan"] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "tempo: {tempo}\nseed: 3").unwrap();
            let config = EngineConfig::load_from(file.path()).unwrap();
            assert_approx_eq!(config.tempo, 120.0);
            assert_eq!(config.seed, Some(3));
        }
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tempo: [fast").unwrap();
        assert!(matches!(
            EngineConfig::load_from(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load_from(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
        assert!(err.to_string().starts_with("cannot read config"));
    }

    #[test]
    fn serialize_roundtrip() {
        let config = EngineConfig {
            seed: Some(7),
            ..EngineConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
