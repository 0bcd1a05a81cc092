//! Echo Error Types
//!
//! Centralized error handling. Every adapter reports through [`EchoError`];
//! the orchestrator decides which failures become user notices.

use std::fmt;
use thiserror::Error;

/// A physical device the assistant may need permission to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Camera,
    Microphone,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Camera => write!(f, "camera"),
            Device::Microphone => write!(f, "microphone"),
        }
    }
}

/// An environment capability that may be absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    SpeechSynthesis,
    SpeechRecognition,
    Camera,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::SpeechSynthesis => write!(f, "Speech synthesis"),
            Capability::SpeechRecognition => write!(f, "Speech recognition"),
            Capability::Camera => write!(f, "Camera capture"),
        }
    }
}

/// Central error type for Echo
#[derive(Error, Debug)]
pub enum EchoError {
    #[error("{device} access denied: {reason}")]
    Permission { device: Device, reason: String },

    #[error("Speech recognition failed: {0}")]
    Recognition(String),

    #[error("No speech detected")]
    NoSpeech,

    #[error("{0} is not supported on this device")]
    Unsupported(Capability),

    #[error("TTS engine error: {0}")]
    Tts(String),

    #[error("Vision error: {0}")]
    Vision(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Orchestrator is no longer running")]
    Stopped,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EchoError {
    /// Whether this failure came from a denied device permission
    pub fn is_permission(&self) -> bool {
        matches!(self, EchoError::Permission { .. })
    }

    /// Recognition ended without anything usable (silence, timeout, abort)
    pub fn is_recognition_miss(&self) -> bool {
        matches!(self, EchoError::NoSpeech | EchoError::Recognition(_))
    }
}

/// Result type alias for Echo operations
pub type EchoResult<T> = Result<T, EchoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_message_names_device() {
        let err = EchoError::Permission {
            device: Device::Camera,
            reason: "denied by user".into(),
        };
        assert_eq!(err.to_string(), "camera access denied: denied by user");
        assert!(err.is_permission());
        assert!(!err.is_recognition_miss());
    }

    #[test]
    fn test_unsupported_message() {
        let err = EchoError::Unsupported(Capability::SpeechRecognition);
        assert_eq!(
            err.to_string(),
            "Speech recognition is not supported on this device"
        );
    }
}
