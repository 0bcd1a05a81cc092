//! Session state owned by the orchestrator
//!
//! Holds the visible [`Mode`], the append-only transcript and the set of
//! in-flight activities the mode is derived from.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What the assistant is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
    Analyzing,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "Idle"),
            Mode::Listening => write!(f, "Listening"),
            Mode::Thinking => write!(f, "Thinking"),
            Mode::Speaking => write!(f, "Speaking"),
            Mode::Analyzing => write!(f, "Analyzing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One line of the conversation. Never edited after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

/// Append-only conversation log
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> &TranscriptEntry {
        self.entries.push(TranscriptEntry {
            speaker,
            text: text.into(),
            timestamp: Local::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }
}

/// An adapter operation currently in flight.
///
/// Ordered by display priority: when several overlap the highest one names
/// the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Activity {
    Speaking,
    Thinking,
    Listening,
    Analyzing,
}

impl Activity {
    fn mode(self) -> Mode {
        match self {
            Activity::Speaking => Mode::Speaking,
            Activity::Thinking => Mode::Thinking,
            Activity::Listening => Mode::Listening,
            Activity::Analyzing => Mode::Analyzing,
        }
    }
}

/// The orchestrator's own state
#[derive(Debug, Default)]
pub struct Session {
    mode: Mode,
    transcript: Transcript,
    muted: bool,
    active: BTreeSet<Activity>,
}

impl Session {
    /// Fresh session seeded with the assistant greeting
    pub fn new(greeting: impl Into<String>) -> Self {
        let mut transcript = Transcript::default();
        transcript.append(Speaker::Assistant, greeting);
        Self {
            mode: Mode::Idle,
            transcript,
            muted: false,
            active: BTreeSet::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> TranscriptEntry {
        self.transcript.append(speaker, text).clone()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn activate(&mut self, activity: Activity) {
        self.active.insert(activity);
    }

    pub fn deactivate(&mut self, activity: Activity) {
        self.active.remove(&activity);
    }

    pub fn clear_activities(&mut self) {
        self.active.clear();
    }

    /// Mode implied by the in-flight activities
    pub fn derived_mode(&self) -> Mode {
        self.active
            .iter()
            .next_back()
            .map(|a| a.mode())
            .unwrap_or(Mode::Idle)
    }

    /// Recompute the mode. Returns the previous mode if it changed.
    pub fn sync_mode(&mut self) -> Option<Mode> {
        let next = self.derived_mode();
        if next == self.mode {
            return None;
        }
        let previous = self.mode;
        self.mode = next;
        Some(previous)
    }
}
