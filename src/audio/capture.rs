//! Microphone capture using cpal
//!
//! Records a single utterance: waits for speech, then stops after a stretch
//! of trailing silence. Energy thresholding is the only voice detection.

use crate::config::RecognitionConfig;
use crate::error::{Device, EchoError, EchoResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const SAMPLE_RATE: u32 = 16000;
const CHUNK_SIZE: usize = 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Calculate audio energy (RMS) for voice detection
pub fn calculate_energy(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: i64 = samples.iter().map(|&s| (s as i64).pow(2)).sum();
    (sum as f32 / samples.len() as f32).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// No speech yet
    Waiting,
    /// Speech in progress
    Speaking,
    /// Utterance ended (trailing silence or length cap)
    Complete,
    /// Nothing was said before the silence timeout
    Silent,
}

/// Decides when an utterance starts and ends from chunk energies
#[derive(Debug, Clone)]
pub struct UtteranceDetector {
    threshold: f32,
    silence_timeout_ms: u64,
    end_of_speech_ms: u64,
    max_utterance_ms: u64,
    elapsed_ms: u64,
    speech_started_ms: Option<u64>,
    last_voice_ms: u64,
}

impl UtteranceDetector {
    pub fn new(config: &RecognitionConfig) -> Self {
        Self {
            threshold: config.energy_threshold,
            silence_timeout_ms: config.silence_timeout_ms,
            end_of_speech_ms: config.end_of_speech_ms,
            max_utterance_ms: config.max_utterance_ms,
            elapsed_ms: 0,
            speech_started_ms: None,
            last_voice_ms: 0,
        }
    }

    pub fn has_speech(&self) -> bool {
        self.speech_started_ms.is_some()
    }

    /// Account for a chunk of samples at [`SAMPLE_RATE`]
    pub fn feed(&mut self, samples: &[i16]) -> CaptureStatus {
        let chunk_ms = samples.len() as u64 * 1000 / SAMPLE_RATE as u64;
        self.elapsed_ms += chunk_ms;

        if calculate_energy(samples) >= self.threshold {
            if self.speech_started_ms.is_none() {
                debug!(at_ms = self.elapsed_ms, "speech started");
                self.speech_started_ms = Some(self.elapsed_ms);
            }
            self.last_voice_ms = self.elapsed_ms;
        }

        self.status()
    }

    /// Account for time passing with no audio delivered
    pub fn tick(&mut self, elapsed: Duration) -> CaptureStatus {
        self.elapsed_ms += elapsed.as_millis() as u64;
        self.status()
    }

    fn status(&self) -> CaptureStatus {
        match self.speech_started_ms {
            None if self.elapsed_ms >= self.silence_timeout_ms => CaptureStatus::Silent,
            None => CaptureStatus::Waiting,
            Some(started) => {
                if self.elapsed_ms - self.last_voice_ms >= self.end_of_speech_ms
                    || self.elapsed_ms - started >= self.max_utterance_ms
                {
                    CaptureStatus::Complete
                } else {
                    CaptureStatus::Speaking
                }
            }
        }
    }
}

/// Record one utterance from the default input device.
///
/// Blocking; run it off the async scheduler. Returns `EchoError::NoSpeech`
/// on silence and a `Recognition` error when `cancel` is raised.
pub fn record_utterance(config: &RecognitionConfig, cancel: &AtomicBool) -> EchoResult<Vec<i16>> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(EchoError::Permission {
        device: Device::Microphone,
        reason: "no input device available".to_string(),
    })?;

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio device: {}", device_name);

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Fixed(CHUNK_SIZE as u32),
    };

    let (tx, rx) = mpsc::channel::<Vec<i16>>();

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let _ = tx.send(data.to_vec());
            },
            |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| EchoError::Permission {
            device: Device::Microphone,
            reason: e.to_string(),
        })?;

    stream
        .play()
        .map_err(|e| EchoError::Audio(format!("failed to start capture: {}", e)))?;

    let mut detector = UtteranceDetector::new(config);
    let mut recorded: Vec<i16> = Vec::new();

    loop {
        if cancel.load(Ordering::SeqCst) {
            return Err(EchoError::Recognition("capture aborted".to_string()));
        }

        let status = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(chunk) => {
                let status = detector.feed(&chunk);
                if detector.has_speech() {
                    recorded.extend_from_slice(&chunk);
                }
                status
            }
            Err(mpsc::RecvTimeoutError::Timeout) => detector.tick(POLL_INTERVAL),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(EchoError::Audio("input stream closed".to_string()));
            }
        };

        match status {
            CaptureStatus::Waiting | CaptureStatus::Speaking => continue,
            CaptureStatus::Silent => return Err(EchoError::NoSpeech),
            CaptureStatus::Complete => break,
        }
    }

    debug!(samples = recorded.len(), "utterance captured");
    Ok(recorded)
}
