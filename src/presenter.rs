//! Presentation callbacks
//!
//! The orchestrator renders nothing itself. It reports transcript growth,
//! mode changes and user-facing notices through a [`Presenter`].

use crate::session::{Mode, TranscriptEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message the user should see outside the transcript (permission
/// refusals, missing capabilities)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Presenter: Send {
    fn transcript_appended(&self, entry: &TranscriptEntry);

    fn mode_changed(&self, mode: Mode);

    fn notify(&self, _notice: &Notice) {}
}

/// Presenter that drops everything, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn transcript_appended(&self, _entry: &TranscriptEntry) {}

    fn mode_changed(&self, _mode: Mode) {}
}
