use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable configuration snapshot, loaded once at startup.
///
/// Components receive this by reference in their constructors; changes to the
/// file on disk take effect on the next launch, never mid-session.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub hotkey: HotkeyConfig,
    pub audio: AudioConfig,
    pub recording: RecordingConfig,
    pub model: ModelConfig,
    pub overlay: OverlayConfig,
    pub context: ContextConfig,
    pub telemetry: TelemetryConfig,
}

/// Which key starts and stops a dictation hold.
#[derive(Debug, Deserialize, Clone)]
pub struct HotkeyConfig {
    /// "toggle" (CapsLock-style key, key-down edges only) or "momentary"
    /// (modifier+key combination with real press/release)
    pub mode: HotkeyMode,
    /// Key observed in toggle mode
    pub toggle_key: String,
    /// Modifiers for the momentary fallback combination
    pub modifiers: Vec<String>,
    /// Key for the momentary fallback combination
    pub key: String,
    /// Key-downs within this window after a logical press are key repeat
    pub debounce_ms: u64,
}

/// Hotkey interpretation mode.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyMode {
    Toggle,
    Momentary,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    /// Hard cap on a single hold; recording is force-stopped past this
    pub max_session_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecordingConfig {
    /// Holds shorter than this are discarded without transcription
    pub min_duration_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub name: String,
    pub path: String,
    pub preload: bool,
    pub threads: usize,
    pub beam_size: usize,
    /// Language code, None = auto-detect
    pub language: Option<String>,
    /// Wall-clock budget for one transcription
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    pub enabled: bool,
    /// Amplitude repaint interval
    pub refresh_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// Capture the frontmost application as a transcription hint
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub log_path: String,
}

impl Config {
    /// Load config from ~/.voicemode.toml, writing the defaults first if the
    /// file does not exist yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        let contents = fs::read_to_string(&config_path).context("failed to read config file")?;

        let config: Self = toml::from_str(&contents).context("failed to parse config TOML")?;

        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".voicemode.toml"))
    }

    fn create_default(path: &PathBuf) -> Result<()> {
        let default_config = r#"[hotkey]
mode = "toggle"
toggle_key = "CapsLock"
modifiers = ["Control", "Option"]
key = "D"
debounce_ms = 150

[audio]
max_session_secs = 30

[recording]
min_duration_ms = 500

[model]
name = "small"
path = "~/.voicemode/models/ggml-small.bin"
preload = true
threads = 4
beam_size = 5
timeout_secs = 30

[overlay]
enabled = true
refresh_ms = 80

[context]
enabled = false

[telemetry]
enabled = true
log_path = "~/.voicemode/voicemode.log"
"#;
        fs::write(path, default_config).context("failed to write default config")?;
        Ok(())
    }

    /// Expand ~ in paths to home directory
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}

impl HotkeyConfig {
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl AudioConfig {
    #[must_use]
    pub const fn max_session(&self) -> Duration {
        Duration::from_secs(self.max_session_secs)
    }
}

impl RecordingConfig {
    #[must_use]
    pub const fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms)
    }
}

impl ModelConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl OverlayConfig {
    #[must_use]
    pub const fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}
