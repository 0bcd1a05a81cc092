//! Completion events posted by adapter tasks
//!
//! Every asynchronous adapter operation reports back to the orchestrator
//! through one of these, tagged with the id it was started under. The
//! orchestrator drops events whose id no longer matches the live operation.

use crate::error::EchoResult;
use crate::vision::{CameraLease, Detection};
use std::fmt;

#[derive(Debug)]
pub enum AdapterEvent {
    /// The TTS engine began an utterance
    SpeechStarted { utterance: u64 },

    /// An utterance ran to completion or failed
    SpeechFinished {
        utterance: u64,
        result: EchoResult<()>,
    },

    /// A single-shot recognition session ended
    Recognition {
        capture: u64,
        outcome: EchoResult<String>,
    },

    /// The simulated thinking pause for a turn is over
    ThinkingElapsed { turn: u64 },

    /// Camera acquisition finished. A successful result carries the lease.
    CameraOpened {
        session: u64,
        result: EchoResult<CameraLease>,
    },

    /// One frame was analyzed
    Detections {
        session: u64,
        result: EchoResult<Vec<Detection>>,
    },
}

impl fmt::Display for AdapterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterEvent::SpeechStarted { utterance } => {
                write!(f, "SPEECH_STARTED (#{})", utterance)
            }
            AdapterEvent::SpeechFinished { utterance, result } => {
                write!(f, "SPEECH_FINISHED (#{}, ok={})", utterance, result.is_ok())
            }
            AdapterEvent::Recognition { capture, outcome } => {
                write!(f, "RECOGNITION (#{}, ok={})", capture, outcome.is_ok())
            }
            AdapterEvent::ThinkingElapsed { turn } => write!(f, "THINKING_ELAPSED (#{})", turn),
            AdapterEvent::CameraOpened { session, result } => {
                write!(f, "CAMERA_OPENED (#{}, ok={})", session, result.is_ok())
            }
            AdapterEvent::Detections { session, result } => match result {
                Ok(d) => write!(f, "DETECTIONS (#{}, {} found)", session, d.len()),
                Err(_) => write!(f, "DETECTIONS (#{}, failed)", session),
            },
        }
    }
}
