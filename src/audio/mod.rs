//! Audio Module
//!
//! Microphone capture for recognition and looping ambient layers.

pub mod capture;
pub mod mixer;

use crate::config::TrackSet;
use crate::error::EchoResult;

pub use mixer::SoundEngine;

/// Looping background layers tied to the current scene.
///
/// `play` replaces whatever set is active; there is never more than one.
pub trait AmbientMixer: Send + Sync {
    fn play(&self, set: &TrackSet) -> EchoResult<()>;

    /// Halt every layer and release its resources
    fn stop_all(&self) -> EchoResult<()>;
}

/// Mixer used when no audio output exists
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentMixer;

impl AmbientMixer for SilentMixer {
    fn play(&self, set: &TrackSet) -> EchoResult<()> {
        tracing::debug!("no audio output, skipping '{}'", set.name);
        Ok(())
    }

    fn stop_all(&self) -> EchoResult<()> {
        Ok(())
    }
}
