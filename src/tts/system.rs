//! System TTS engine driving espeak-ng or speech-dispatcher

use super::TtsEngine;
use crate::config::VoiceSettings;
use crate::error::{EchoError, EchoResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// espeak-ng's default speed in words per minute
const ESPEAK_BASE_WPM: f32 = 175.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTool {
    EspeakNg,
    SpdSay,
}

impl SystemTool {
    fn binary(self) -> &'static str {
        match self {
            SystemTool::EspeakNg => "espeak-ng",
            SystemTool::SpdSay => "spd-say",
        }
    }

    /// Command-line flags for the voice settings
    pub fn voice_args(self, voice: &VoiceSettings) -> Vec<String> {
        let wants_female = voice.voice.to_lowercase().contains("female");
        match self {
            SystemTool::EspeakNg => {
                let wpm = (ESPEAK_BASE_WPM * voice.rate).round() as i32;
                let pitch = ((50.0 * voice.pitch).round() as i32).clamp(0, 99);
                let mut args = vec![
                    "-s".to_string(),
                    wpm.to_string(),
                    "-p".to_string(),
                    pitch.to_string(),
                ];
                if wants_female {
                    args.extend(["-v".to_string(), "en-us+f3".to_string()]);
                } else if !voice.voice.is_empty() {
                    args.extend(["-v".to_string(), voice.voice.clone()]);
                }
                args
            }
            SystemTool::SpdSay => {
                let rate = (((voice.rate - 1.0) * 100.0).round() as i32).clamp(-100, 100);
                let pitch = (((voice.pitch - 1.0) * 100.0).round() as i32).clamp(-100, 100);
                let mut args = vec![
                    // Block until the message has been spoken
                    "-w".to_string(),
                    "-r".to_string(),
                    rate.to_string(),
                    "-p".to_string(),
                    pitch.to_string(),
                ];
                if wants_female {
                    args.extend(["-t".to_string(), "female1".to_string()]);
                }
                args
            }
        }
    }
}

#[derive(Debug)]
pub struct SystemEngine {
    tool: SystemTool,
}

impl SystemEngine {
    pub fn new(tool: SystemTool) -> Self {
        Self { tool }
    }

    /// Pick the first speech tool found on PATH
    pub fn detect() -> Option<Self> {
        for tool in [SystemTool::EspeakNg, SystemTool::SpdSay] {
            if let Some(path) = find_in_path(tool.binary()) {
                info!("  - Using system TTS: {}", path.display());
                return Some(Self::new(tool));
            }
        }
        warn!("🔇 No system TTS command found (tried espeak-ng, spd-say)");
        None
    }
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Keep text from being read as a flag
fn sanitize(text: &str) -> &str {
    text.trim_start_matches(|c: char| c == '-' || c.is_whitespace())
}

#[async_trait]
impl TtsEngine for SystemEngine {
    async fn speak(&self, text: &str, voice: &VoiceSettings) -> EchoResult<()> {
        debug!("System speaking: {}", text);

        let mut child = Command::new(self.tool.binary())
            .args(self.tool.voice_args(voice))
            .arg(sanitize(text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EchoError::Tts(format!("failed to spawn {}: {}", self.tool.binary(), e))
            })?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(EchoError::Tts(format!(
                "{} exited with {}",
                self.tool.binary(),
                status
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.tool.binary()
    }
}
