//! ASR (Automatic Speech Recognition) Module
//!
//! Single-shot recognition: each capture yields exactly one final
//! transcript or one error. [`SpeechInput`] wraps an engine and reports the
//! outcome to the orchestrator.

pub mod wyoming;

use crate::error::{Capability, EchoError, EchoResult};
use crate::events::AdapterEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use wyoming::{WyomingClient, WyomingRecognizer};

/// Trait for ASR engines
#[async_trait]
pub trait AsrEngine: Send + Sync {
    /// Capture and recognize one utterance.
    ///
    /// `Ok(None)` means the session ended without a result (silence or
    /// timeout). Dropping the future must stop capture.
    async fn listen_once(&self) -> EchoResult<Option<String>>;

    /// Whether recognition can run in this environment
    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

struct ActiveCapture {
    id: u64,
    task: JoinHandle<()>,
}

/// The speech input adapter
pub struct SpeechInput {
    engine: Option<Arc<dyn AsrEngine>>,
    events: mpsc::UnboundedSender<AdapterEvent>,
    active: Option<ActiveCapture>,
    next_id: u64,
}

impl SpeechInput {
    pub fn new(engine: Option<Arc<dyn AsrEngine>>, events: mpsc::UnboundedSender<AdapterEvent>) -> Self {
        Self {
            engine,
            events,
            active: None,
            next_id: 0,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Begin a capture.
    ///
    /// Returns `Ok(None)` if one is already running, and
    /// `EchoError::Unsupported` when no engine is available.
    pub fn start(&mut self) -> EchoResult<Option<u64>> {
        if self.active.is_some() {
            debug!("capture already running, ignoring start");
            return Ok(None);
        }

        let engine = match &self.engine {
            Some(engine) if engine.is_available() => Arc::clone(engine),
            _ => return Err(EchoError::Unsupported(Capability::SpeechRecognition)),
        };

        self.next_id += 1;
        let id = self.next_id;
        let events = self.events.clone();

        info!(capture = id, engine = engine.name(), "🎙️ Listening");
        let task = tokio::spawn(async move {
            let outcome = match engine.listen_once().await {
                Ok(Some(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
                Ok(_) => Err(EchoError::NoSpeech),
                Err(e) => Err(e),
            };
            let _ = events.send(AdapterEvent::Recognition {
                capture: id,
                outcome,
            });
        });

        self.active = Some(ActiveCapture { id, task });
        Ok(Some(id))
    }

    /// Cancel the running capture, if any
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                info!(capture = active.id, "🛑 Capture stopped");
                active.task.abort();
                true
            }
            None => false,
        }
    }

    /// Mark `capture` as delivered. False for a capture that was stopped.
    pub fn finish(&mut self, capture: u64) -> bool {
        if self.active.as_ref().map(|a| a.id) == Some(capture) {
            self.active = None;
            true
        } else {
            false
        }
    }
}

impl Drop for SpeechInput {
    fn drop(&mut self) {
        self.stop();
    }
}
