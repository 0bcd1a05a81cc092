//! Echo Library
//!
//! Session orchestration for a multi-modal assistant: typed and spoken
//! input, spoken replies, ambient audio and camera analysis, arbitrated by a
//! single mode state machine.

pub mod asr;
pub mod audio;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod presenter;
pub mod responses;
pub mod session;
pub mod timer;
pub mod tts;
pub mod vision;
