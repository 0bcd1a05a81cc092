//! Mock TTS Engine for Testing
//!
//! Records all spoken text for verification.

use async_trait::async_trait;
use echo::config::VoiceSettings;
use echo::error::{EchoError, EchoResult};
use echo::tts::TtsEngine;
use std::sync::{Arc, Mutex};

/// Mock TTS engine that records spoken text
#[derive(Debug, Default)]
pub struct MockTts {
    /// All text that was "spoken"
    pub spoken: Arc<Mutex<Vec<String>>>,
    /// Simulate failure on every speak
    pub should_fail: bool,
    /// Never finish an utterance, like a very long reply
    pub hold: bool,
}

impl MockTts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding() -> Self {
        Self {
            hold: true,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Get all spoken phrases
    pub fn get_spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    /// Check if a phrase was spoken
    pub fn was_spoken(&self, text: &str) -> bool {
        self.spoken.lock().unwrap().iter().any(|s| s.contains(text))
    }
}

#[async_trait]
impl TtsEngine for MockTts {
    async fn speak(&self, text: &str, _voice: &VoiceSettings) -> EchoResult<()> {
        if self.should_fail {
            return Err(EchoError::Tts("Mock TTS failure".to_string()));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        if self.hold {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
