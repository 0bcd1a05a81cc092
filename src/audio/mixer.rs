//! Sound Engine for ambient layers
//!
//! Uses a channel-based architecture to handle rodio's non-Send stream.
//! The engine spawns a dedicated audio thread that owns the playback
//! infrastructure; each layer plays on its own sink so volumes stay
//! independent.

use super::AmbientMixer;
use crate::config::{TrackRef, TrackSet};
use crate::error::{EchoError, EchoResult};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info, warn};

/// One playing layer as the mixer sees it
pub trait LayerSink {
    fn stop(&self);
}

impl LayerSink for rodio::Sink {
    fn stop(&self) {
        rodio::Sink::stop(self)
    }
}

/// The layers of the active track set.
///
/// `replace` stops every current layer before starting the new ones, so
/// at most one set ever plays.
#[derive(Debug)]
pub struct Layers<S> {
    sinks: Vec<S>,
}

impl<S> Default for Layers<S> {
    fn default() -> Self {
        Self { sinks: Vec::new() }
    }
}

impl<S: LayerSink> Layers<S> {
    /// Stop the current layers and start one per track in `set`.
    /// Layers that fail to start are logged and skipped.
    pub fn replace<F>(&mut self, set: &TrackSet, mut start: F)
    where
        F: FnMut(&TrackRef) -> anyhow::Result<S>,
    {
        self.clear();
        info!("🔊 Playing '{}' ({} layers)", set.name, set.layers.len());
        for layer in &set.layers {
            match start(layer) {
                Ok(sink) => self.sinks.push(sink),
                Err(e) => error!("❌ Layer {:?} failed: {}", layer.path, e),
            }
        }
    }

    pub fn clear(&mut self) {
        for sink in self.sinks.drain(..) {
            sink.stop();
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

/// Commands sent to the audio thread
enum AudioCommand {
    Play(TrackSet),
    StopAll,
}

/// Thread-safe handle to the sound engine
#[derive(Clone)]
pub struct SoundEngine {
    sender: mpsc::Sender<AudioCommand>,
}

impl std::fmt::Debug for SoundEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundEngine").finish()
    }
}

impl SoundEngine {
    pub fn new() -> EchoResult<Self> {
        let (sender, receiver) = mpsc::channel::<AudioCommand>();

        // Spawn dedicated audio thread
        thread::Builder::new()
            .name("ambient-audio".to_string())
            .spawn(move || {
                Self::audio_thread(receiver);
            })?;

        Ok(Self { sender })
    }

    fn audio_thread(receiver: mpsc::Receiver<AudioCommand>) {
        use rodio::OutputStream;

        // Initialize audio output on this thread
        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok(s) => s,
            Err(e) => {
                warn!("🔇 Failed to initialize audio output: {}", e);
                return;
            }
        };

        // Keep stream alive
        let _stream = stream;
        let mut layers: Layers<rodio::Sink> = Layers::default();

        info!("🔊 Audio thread started");

        while let Ok(cmd) = receiver.recv() {
            match cmd {
                AudioCommand::Play(set) => {
                    layers.replace(&set, |layer| Self::start_layer(&stream_handle, layer));
                }
                AudioCommand::StopAll => {
                    info!("🛑 Stopping all layers");
                    layers.clear();
                }
            }
        }

        layers.clear();
        info!("🔇 Audio thread stopped");
    }

    fn start_layer(
        stream_handle: &rodio::OutputStreamHandle,
        layer: &TrackRef,
    ) -> anyhow::Result<rodio::Sink> {
        use rodio::{Decoder, Source};
        use std::fs::File;
        use std::io::BufReader;

        if !layer.path.exists() {
            anyhow::bail!("Audio file not found: {:?}", layer.path);
        }

        let file = File::open(&layer.path)?;
        let source = Decoder::new(BufReader::new(file))?.repeat_infinite();

        let sink = rodio::Sink::try_new(stream_handle)?;
        sink.set_volume(layer.volume);
        sink.append(source);

        debug!(
            "🔊 Looping {:?} at volume {:.2}",
            layer.path.file_name().unwrap_or_default(),
            layer.volume
        );
        Ok(sink)
    }

    fn send(&self, cmd: AudioCommand) -> EchoResult<()> {
        self.sender
            .send(cmd)
            .map_err(|e| EchoError::Audio(format!("Audio thread disconnected: {}", e)))
    }
}

impl AmbientMixer for SoundEngine {
    fn play(&self, set: &TrackSet) -> EchoResult<()> {
        self.send(AudioCommand::Play(set.clone()))
    }

    fn stop_all(&self) -> EchoResult<()> {
        self.send(AudioCommand::StopAll)
    }
}
