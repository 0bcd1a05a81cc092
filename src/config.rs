use crate::error::{EchoError, EchoResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub voice: VoiceSettings,
    pub timing: TimingConfig,
    pub vision: VisionConfig,
    pub ambient: AmbientConfig,
    pub recognition: RecognitionConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub name: String,
    pub greeting: String,
}

/// Speech synthesis parameters. These tune the voice only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Substring matched against available voice names; empty means engine default
    pub voice: String,
    /// Speaking rate in (0, 2], 1.0 is normal speed
    pub rate: f32,
    /// Pitch in (0, 2], 1.0 is the voice's natural pitch
    pub pitch: f32,
    /// Backend name ("system" or "none")
    pub engine: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub thinking_delay_ms: u64,
    pub one_shot_delay_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VisionPolicyKind {
    #[default]
    OneShot,
    Continuous,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub policy: VisionPolicyKind,
    /// Simulate the user refusing camera access
    pub deny_access: bool,
}

/// One looping background layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRef {
    pub path: PathBuf,
    #[serde(default = "default_layer_volume")]
    pub volume: f32,
}

/// A named set of layers played together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrackSet {
    pub name: String,
    pub layers: Vec<TrackRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub story: TrackSet,
    pub music: TrackSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub enabled: bool,
    pub wyoming_host: String,
    pub wyoming_port: u16,
    pub language: String,
    /// Give up when nothing louder than the threshold arrives for this long
    pub silence_timeout_ms: u64,
    /// Trailing silence that ends an utterance once speech has started
    pub end_of_speech_ms: u64,
    pub max_utterance_ms: u64,
    pub energy_threshold: f32,
}

fn default_layer_volume() -> f32 {
    0.3
}

fn audio_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_default()
        .join("echo-assistant/audio")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant: AssistantConfig::default(),
            voice: VoiceSettings::default(),
            timing: TimingConfig::default(),
            vision: VisionConfig::default(),
            ambient: AmbientConfig::default(),
            recognition: RecognitionConfig::default(),
            log_level: "INFO".to_string(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Echo".to_string(),
            greeting: "System online. I am {name}. How can I assist your neural pathways today?"
                .to_string(),
        }
    }
}

impl AssistantConfig {
    /// Greeting with the assistant name filled in
    pub fn greeting_text(&self) -> String {
        self.greeting.replace("{name}", &self.name)
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: "female".to_string(),
            rate: 0.95,
            pitch: 1.05,
            engine: "system".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            thinking_delay_ms: 1200,
            one_shot_delay_ms: 3000,
            poll_interval_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn thinking_delay(&self) -> Duration {
        Duration::from_millis(self.thinking_delay_ms)
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            policy: VisionPolicyKind::OneShot,
            deny_access: false,
        }
    }
}

impl Default for AmbientConfig {
    fn default() -> Self {
        let dir = audio_dir();
        Self {
            story: TrackSet {
                name: "story".to_string(),
                layers: vec![
                    TrackRef {
                        path: dir.join("rain.ogg"),
                        volume: 0.25,
                    },
                    TrackRef {
                        path: dir.join("night_forest.ogg"),
                        volume: 0.15,
                    },
                ],
            },
            music: TrackSet {
                name: "music".to_string(),
                layers: vec![TrackRef {
                    path: dir.join("lofi_pulse.ogg"),
                    volume: 0.3,
                }],
            },
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wyoming_host: "localhost".to_string(),
            wyoming_port: 10300,
            language: "en-US".to_string(),
            silence_timeout_ms: 5000,
            end_of_speech_ms: 900,
            max_utterance_ms: 15000,
            energy_threshold: 500.0,
        }
    }
}

/// Where a loaded config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Defaults,
    /// The file failed to parse and was moved to `backup`
    Recovered { backup: PathBuf, reason: String },
}

impl Config {
    /// Load config from a specific file.
    ///
    /// A missing file yields defaults. A file that fails to parse is moved
    /// aside to `*.json.corrupt` and defaults are used instead. Nothing is
    /// logged here since this runs before logging is set up; callers report
    /// the returned [`ConfigSource`].
    pub fn load_from(path: &Path) -> EchoResult<(Self, ConfigSource)> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults));
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Config>(&content) {
            Ok(config) => {
                config.validate()?;
                Ok((config, ConfigSource::File))
            }
            Err(e) => {
                let backup = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup);
                Ok((
                    Self::default(),
                    ConfigSource::Recovered {
                        backup,
                        reason: e.to_string(),
                    },
                ))
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> EchoResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values outside the ranges the engines accept
    pub fn validate(&self) -> EchoResult<()> {
        if !(self.voice.rate > 0.0 && self.voice.rate <= 2.0) {
            return Err(EchoError::Config(format!(
                "voice.rate must be in (0, 2], got {}",
                self.voice.rate
            )));
        }
        if !(self.voice.pitch > 0.0 && self.voice.pitch <= 2.0) {
            return Err(EchoError::Config(format!(
                "voice.pitch must be in (0, 2], got {}",
                self.voice.pitch
            )));
        }
        if self.timing.poll_interval_ms == 0 {
            return Err(EchoError::Config(
                "timing.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        for set in [&self.ambient.story, &self.ambient.music] {
            for layer in &set.layers {
                if !(0.0..=1.0).contains(&layer.volume) {
                    return Err(EchoError::Config(format!(
                        "ambient layer {} volume must be in [0, 1], got {}",
                        layer.path.display(),
                        layer.volume
                    )));
                }
            }
        }
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("echo-assistant")
        .join("config.json")
}
