//! Text Classifier
//!
//! Maps free text to an [`Intent`] with an ordered list of substring rules.
//! The first rule that matches wins, so keyword collisions resolve by rule
//! order rather than by position in the sentence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The purpose of a user utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Story,
    VisionRequest,
    AmbientRequest,
    HelpRequest,
    TimeRequest,
    Greeting,
    Fallback,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::Story => "story",
            Intent::VisionRequest => "vision_request",
            Intent::AmbientRequest => "ambient_request",
            Intent::HelpRequest => "help_request",
            Intent::TimeRequest => "time_request",
            Intent::Greeting => "greeting",
            Intent::Fallback => "fallback",
        };
        write!(f, "{}", name)
    }
}

/// Keyword rules in priority order
const RULES: &[(Intent, &[&str])] = &[
    (Intent::Story, &["story", "bedtime"]),
    (Intent::VisionRequest, &["analyze", "see", "camera"]),
    (Intent::AmbientRequest, &["music", "ambient"]),
    (Intent::HelpRequest, &["help", "what can you do"]),
    (Intent::TimeRequest, &["time"]),
    (Intent::Greeting, &["hello", "hi"]),
];

/// Deterministic keyword classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct TextClassifier;

impl TextClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify `text`, case-insensitively. Callers reject blank input first.
    pub fn classify(&self, text: &str) -> Intent {
        let text_lower = text.to_lowercase();

        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| text_lower.contains(kw)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        TextClassifier::new().classify(text)
    }

    #[test]
    fn test_each_rule() {
        assert_eq!(classify("Tell me a bedtime story"), Intent::Story);
        assert_eq!(classify("can you analyze this"), Intent::VisionRequest);
        assert_eq!(classify("open the camera"), Intent::VisionRequest);
        assert_eq!(classify("play some music"), Intent::AmbientRequest);
        assert_eq!(classify("ambient please"), Intent::AmbientRequest);
        assert_eq!(classify("help"), Intent::HelpRequest);
        assert_eq!(classify("What can you do?"), Intent::HelpRequest);
        assert_eq!(classify("What time is it?"), Intent::TimeRequest);
        assert_eq!(classify("hello"), Intent::Greeting);
        assert_eq!(classify("Hi"), Intent::Greeting);
        assert_eq!(classify("the weather is grey"), Intent::Fallback);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("BEDTIME"), Intent::Story);
        assert_eq!(classify("MuSiC"), Intent::AmbientRequest);
    }

    #[test]
    fn test_first_rule_wins_over_position() {
        // "hello" appears first in the sentence but Story outranks Greeting
        assert_eq!(classify("hello, tell me a story"), Intent::Story);
        // Vision outranks Ambient and Time
        assert_eq!(classify("what time is the music, can you see"), Intent::VisionRequest);
        // Help outranks Time
        assert_eq!(classify("time to help"), Intent::HelpRequest);
    }

    #[test]
    fn test_plain_substring_matching() {
        // Keywords match inside words, as the rules are substring rules
        assert_eq!(classify("this"), Intent::Greeting);
        assert_eq!(classify("sometimes"), Intent::TimeRequest);
        assert_eq!(classify("overseen"), Intent::VisionRequest);
    }
}
