//! TTS (Text-to-Speech) Module
//!
//! A unified engine trait plus [`SpeechOutput`], which keeps at most one
//! utterance alive: every new `speak` cancels the previous one.

use crate::config::{Config, VoiceSettings};
use crate::error::EchoResult;
use crate::events::AdapterEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub mod system;

/// Trait for TTS engines
#[async_trait]
pub trait TtsEngine: Send + Sync + std::fmt::Debug {
    /// Speak the given text, resolving when playback ends.
    ///
    /// Dropping the future must stop playback.
    async fn speak(&self, text: &str, voice: &VoiceSettings) -> EchoResult<()>;

    /// Whether the backend can produce audio in this environment
    fn is_available(&self) -> bool {
        true
    }

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Factory to create the configured TTS engine
pub fn create_engine(config: &Config) -> Option<Arc<dyn TtsEngine>> {
    info!("🛠️ Creating TTS engine: {}", config.voice.engine);
    let engine: Arc<dyn TtsEngine> = match config.voice.engine.as_str() {
        "none" | "off" => {
            info!("  - Speech output disabled");
            return None;
        }
        "system" => Arc::new(system::SystemEngine::detect()?),
        other => {
            warn!("  - Unknown engine '{}', falling back to System", other);
            Arc::new(system::SystemEngine::detect()?)
        }
    };
    info!("✅ TTS engine '{}' initialized", engine.name());
    Some(engine)
}

struct ActiveUtterance {
    id: u64,
    task: JoinHandle<()>,
}

/// The speech output adapter
pub struct SpeechOutput {
    engine: Option<Arc<dyn TtsEngine>>,
    voice: VoiceSettings,
    events: mpsc::UnboundedSender<AdapterEvent>,
    active: Option<ActiveUtterance>,
    next_id: u64,
}

impl SpeechOutput {
    pub fn new(
        engine: Option<Arc<dyn TtsEngine>>,
        voice: VoiceSettings,
        events: mpsc::UnboundedSender<AdapterEvent>,
    ) -> Self {
        Self {
            engine,
            voice,
            events,
            active: None,
            next_id: 0,
        }
    }

    /// Utterance currently owning the engine
    pub fn current(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Cancel whatever is playing and start `text`.
    ///
    /// Returns the utterance id, or `None` when no engine is available (the
    /// call is then a no-op).
    pub fn speak(&mut self, text: &str) -> Option<u64> {
        self.stop();

        let engine = match &self.engine {
            Some(engine) if engine.is_available() => Arc::clone(engine),
            _ => {
                debug!("speech synthesis unavailable, not speaking");
                return None;
            }
        };

        self.next_id += 1;
        let id = self.next_id;
        let text = text.to_string();
        let voice = self.voice.clone();
        let events = self.events.clone();

        debug!(utterance = id, engine = engine.name(), "📢 Speaking");
        let task = tokio::spawn(async move {
            let _ = events.send(AdapterEvent::SpeechStarted { utterance: id });
            let result = engine.speak(&text, &voice).await;
            let _ = events.send(AdapterEvent::SpeechFinished {
                utterance: id,
                result,
            });
        });

        self.active = Some(ActiveUtterance { id, task });
        Some(id)
    }

    /// Cancel the active utterance, if any
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                debug!(utterance = active.id, "🛑 Cancelling utterance");
                active.task.abort();
                true
            }
            None => false,
        }
    }

    /// Mark `utterance` as done. False when it was already superseded.
    pub fn finish(&mut self, utterance: u64) -> bool {
        if self.current() == Some(utterance) {
            self.active = None;
            true
        } else {
            false
        }
    }
}

impl Drop for SpeechOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records text and then never finishes, like a very long utterance
    #[derive(Debug, Default)]
    struct EndlessEngine {
        spoken: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TtsEngine for EndlessEngine {
        async fn speak(&self, text: &str, _voice: &VoiceSettings) -> EchoResult<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            std::future::pending::<()>().await;
            Ok(())
        }

        fn name(&self) -> &str {
            "endless"
        }
    }

    #[derive(Debug)]
    struct QuickEngine;

    #[async_trait]
    impl TtsEngine for QuickEngine {
        async fn speak(&self, _text: &str, _voice: &VoiceSettings) -> EchoResult<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "quick"
        }
    }

    #[tokio::test]
    async fn test_speak_reports_start_and_finish() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = SpeechOutput::new(Some(Arc::new(QuickEngine)), VoiceSettings::default(), tx);

        let id = output.speak("hello").unwrap();
        assert!(matches!(rx.recv().await, Some(AdapterEvent::SpeechStarted { utterance }) if utterance == id));
        match rx.recv().await {
            Some(AdapterEvent::SpeechFinished { utterance, result }) => {
                assert_eq!(utterance, id);
                assert!(result.is_ok());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(output.finish(id));
        assert_eq!(output.current(), None);
    }

    #[tokio::test]
    async fn test_new_utterance_cancels_previous() {
        let engine = Arc::new(EndlessEngine::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = SpeechOutput::new(Some(engine.clone()), VoiceSettings::default(), tx);

        let first = output.speak("first").unwrap();
        tokio::task::yield_now().await;
        let second = output.speak("second").unwrap();
        assert_ne!(first, second);
        assert_eq!(output.current(), Some(second));
        assert!(!output.finish(first), "superseded utterance cannot finish");

        // Only start events arrive; the aborted one never reports completion
        let mut started = Vec::new();
        while let Ok(Some(event)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), rx.recv()).await
        {
            match event {
                AdapterEvent::SpeechStarted { utterance } => started.push(utterance),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(started.last(), Some(&second));
    }

    #[tokio::test]
    async fn test_no_engine_is_noop() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut output = SpeechOutput::new(None, VoiceSettings::default(), tx);
        assert_eq!(output.speak("anything"), None);
        assert!(!output.stop());
    }

    #[test]
    fn test_factory_can_disable_output() {
        let mut config = Config::default();
        config.voice.engine = "none".to_string();
        assert!(create_engine(&config).is_none());
    }
}
