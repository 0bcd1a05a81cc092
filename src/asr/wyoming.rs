//! Wyoming Protocol Client
//!
//! Implements the Wyoming protocol for external ASR services.
//! Wyoming is a simple protocol where events are JSON lines over TCP.
//!
//! Reference: https://github.com/rhasspy/wyoming

use super::AsrEngine;
use crate::audio::capture::{self, SAMPLE_RATE};
use crate::config::RecognitionConfig;
use crate::error::{EchoError, EchoResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Wyoming event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WyomingEvent {
    /// Describe request (handshake)
    #[serde(rename = "describe")]
    Describe,

    /// Ask the server to transcribe the audio that follows
    #[serde(rename = "transcribe")]
    Transcribe(TranscribeData),

    /// Start of audio stream
    #[serde(rename = "audio-start")]
    AudioStart(AudioFormat),

    /// Audio chunk
    #[serde(rename = "audio-chunk")]
    AudioChunk(AudioChunkData),

    /// End of audio stream
    #[serde(rename = "audio-stop")]
    AudioStop,

    /// Transcript result
    #[serde(rename = "transcript")]
    Transcript(TranscriptData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeData {
    pub language: String,
}

/// Audio stream format
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioFormat {
    pub rate: u32,
    pub width: u8,
    pub channels: u8,
}

/// Audio chunk data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioChunkData {
    pub rate: u32,
    pub width: u8,
    pub channels: u8,
    #[serde(with = "base64_bytes")]
    pub audio: Vec<u8>,
    #[serde(default)]
    pub timestamp: u64,
}

/// Transcript result data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptData {
    pub text: String,
}

/// Base64 serialization for audio bytes
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Wyoming client for ASR services
pub struct WyomingClient {
    host: String,
    port: u16,
    language: String,
    format: AudioFormat,
}

impl WyomingClient {
    /// Create a new Wyoming client
    pub fn new(host: &str, port: u16, language: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            language: language.to_string(),
            format: AudioFormat {
                rate: SAMPLE_RATE,
                width: 2,
                channels: 1,
            },
        }
    }

    /// Check if the server is available
    pub async fn health_check(&self) -> bool {
        match TcpStream::connect((&*self.host, self.port)).await {
            Ok(_) => {
                debug!("Wyoming server available at {}:{}", self.host, self.port);
                true
            }
            Err(e) => {
                warn!("Wyoming server not available: {}", e);
                false
            }
        }
    }

    /// Events sent for one utterance, in wire order
    pub fn request_events(&self, audio_data: &[u8]) -> Vec<WyomingEvent> {
        vec![
            WyomingEvent::Transcribe(TranscribeData {
                language: self.language.clone(),
            }),
            WyomingEvent::AudioStart(self.format),
            WyomingEvent::AudioChunk(AudioChunkData {
                rate: self.format.rate,
                width: self.format.width,
                channels: self.format.channels,
                audio: audio_data.to_vec(),
                timestamp: 0,
            }),
            WyomingEvent::AudioStop,
        ]
    }

    /// Transcribe audio data
    ///
    /// Sends 16-bit little-endian mono PCM and returns the transcript
    pub async fn transcribe(&self, audio_data: &[u8]) -> Result<String> {
        let stream = TcpStream::connect((&*self.host, self.port))
            .await
            .context("Failed to connect to Wyoming server")?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        for event in self.request_events(audio_data) {
            let line = serde_json::to_string(&event)?;
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        writer.flush().await?;

        debug!(
            "Sent audio ({} bytes), waiting for transcript...",
            audio_data.len()
        );

        // Read Transcript response (with timeout)
        let timeout = Duration::from_secs(30);
        let transcript = tokio::time::timeout(timeout, async {
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await? == 0 {
                    break;
                }

                if let Some(text) = parse_transcript(&line) {
                    return Ok::<_, anyhow::Error>(text);
                }
            }
            Ok(String::new())
        })
        .await
        .context("Timeout waiting for transcript")??;

        info!("📝 Wyoming transcript: '{}'", transcript);
        Ok(transcript)
    }
}

/// Extract the text from a `transcript` event line, ignoring anything else
fn parse_transcript(line: &str) -> Option<String> {
    match serde_json::from_str::<WyomingEvent>(line.trim()) {
        Ok(WyomingEvent::Transcript(data)) => Some(data.text),
        _ => None,
    }
}

/// Raises the cancel flag when the listening future is dropped
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Microphone capture feeding a Wyoming server
pub struct WyomingRecognizer {
    client: WyomingClient,
    config: RecognitionConfig,
    available: bool,
}

impl WyomingRecognizer {
    /// Probe the configured server. `None` when recognition is disabled.
    pub async fn connect(config: &RecognitionConfig) -> Option<Self> {
        if !config.enabled {
            info!("Speech recognition disabled in config");
            return None;
        }
        let client = WyomingClient::new(&config.wyoming_host, config.wyoming_port, &config.language);
        let available = client.health_check().await;
        Some(Self {
            client,
            config: config.clone(),
            available,
        })
    }
}

#[async_trait]
impl AsrEngine for WyomingRecognizer {
    async fn listen_once(&self) -> EchoResult<Option<String>> {
        let cancel = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(Arc::clone(&cancel));
        let config = self.config.clone();

        let recorded = tokio::task::spawn_blocking(move || capture::record_utterance(&config, &cancel))
            .await
            .map_err(|e| EchoError::Audio(format!("capture task failed: {}", e)))?;

        let samples = match recorded {
            Ok(samples) => samples,
            Err(EchoError::NoSpeech) => return Ok(None),
            Err(e) => return Err(e),
        };

        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let text = self
            .client
            .transcribe(&bytes)
            .await
            .map_err(|e| EchoError::Recognition(e.to_string()))?;

        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        "wyoming"
    }
}
