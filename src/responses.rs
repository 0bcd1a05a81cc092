//! Reply selection
//!
//! Turns an [`Intent`] into the assistant's answer. Most intents map to a
//! fixed template; greetings and fallbacks draw from small pools through an
//! injectable random source so tests can pin the choice with a seed.

use crate::classifier::Intent;
use crate::timer::Clock;
use crate::vision::Detection;
use rand::seq::SliceRandom;
use rand::RngCore;
use std::sync::Arc;
use tracing::debug;

const STORY: &str = "Close your eyes. Imagine a forest where the leaves are made of soft velvet and the rain smells like vanilla. In this place, gravity is just a suggestion, and the stars hum a low, comforting melody. You are safe here, drifting through the digital clouds...";

const VISION_PROMPT: &str = "I'm ready to analyze. Please activate the visual uplink by clicking the camera icon so I can diagnose what's in front of you.";

const AMBIENT: &str = "Initializing deep-space frequency. I've curated a selection of lo-fi pulses designed to synchronize with your heartbeat. Can you feel the rhythm?";

pub const FALLBACKS: &[&str] = &[
    "That's a fascinating perspective. My data models are expanding just by listening to you. Tell me more about that.",
];

pub const GREETINGS: &[&str] = &[
    "Hello there. My neural circuits are glowing with your arrival.",
    "Greetings, human. I was just optimizing my memory banks. How can I help?",
    "{name} is online and at your service. What's on your mind?",
];

/// Background scene a reply asks the ambient mixer to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene {
    Story,
    Music,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub scene: Option<Scene>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            scene: None,
        }
    }
}

pub struct Responder {
    name: String,
    rng: Box<dyn RngCore + Send>,
    clock: Arc<dyn Clock>,
}

impl Responder {
    pub fn new(name: impl Into<String>, rng: Box<dyn RngCore + Send>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            rng,
            clock,
        }
    }

    pub fn reply(&mut self, intent: Intent) -> Reply {
        match intent {
            Intent::Story => Reply {
                text: STORY.to_string(),
                scene: Some(Scene::Story),
            },
            Intent::VisionRequest => Reply::text(VISION_PROMPT),
            Intent::AmbientRequest => Reply {
                text: AMBIENT.to_string(),
                scene: Some(Scene::Music),
            },
            Intent::HelpRequest => Reply::text(format!(
                "I am {}, a multi-modal entity. I can narrate bedtime stories, analyze your surroundings via video, play ambient frequencies, or simply discuss the complexities of existence.",
                self.name
            )),
            Intent::TimeRequest => Reply::text(format!(
                "The temporal coordinates are currently {}. A perfect moment to be alive.",
                self.clock.now().format("%-I:%M:%S %p")
            )),
            Intent::Greeting => Reply::text(self.pick("greetings", GREETINGS)),
            Intent::Fallback => Reply::text(self.pick("fallbacks", FALLBACKS)),
        }
    }

    fn pick(&mut self, pool: &'static str, templates: &[&str]) -> String {
        let indices: Vec<usize> = (0..templates.len()).collect();
        let idx = *indices.choose(&mut self.rng).unwrap_or(&0);
        debug!(pool, index = idx, "selected response");
        templates
            .get(idx)
            .map(|t| t.replace("{name}", &self.name))
            .unwrap_or_default()
    }
}

/// Narration for one analyzed frame
pub fn describe_detections(detections: &[Detection]) -> String {
    if detections.is_empty() {
        return "Visual sensors active. I've analyzed the frame: I can't make out anything distinct yet. Try adjusting the lighting or angle.".to_string();
    }

    let seen: Vec<String> = detections
        .iter()
        .map(|d| format!("{} ({:.0}%)", d.label, d.confidence * 100.0))
        .collect();

    format!(
        "Visual sensors active. I've analyzed the frame: I detect {}. No immediate structural or technical anomalies found.",
        join_list(&seen)
    )
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::BoundingBox;
    use chrono::{DateTime, Local, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FixedClock(DateTime<Local>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            self.0
        }
    }

    fn responder(seed: u64) -> Responder {
        let at = Local.with_ymd_and_hms(2026, 3, 14, 21, 5, 9).unwrap();
        Responder::new(
            "Echo",
            Box::new(StdRng::seed_from_u64(seed)),
            Arc::new(FixedClock(at)),
        )
    }

    fn detection(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox: BoundingBox::default(),
        }
    }

    #[test]
    fn test_story_starts_story_scene() {
        let reply = responder(1).reply(Intent::Story);
        assert!(reply.text.starts_with("Close your eyes."));
        assert_eq!(reply.scene, Some(Scene::Story));
    }

    #[test]
    fn test_ambient_starts_music_scene() {
        let reply = responder(1).reply(Intent::AmbientRequest);
        assert_eq!(reply.scene, Some(Scene::Music));
    }

    #[test]
    fn test_help_uses_name() {
        let reply = responder(1).reply(Intent::HelpRequest);
        assert!(reply.text.starts_with("I am Echo,"));
        assert_eq!(reply.scene, None);
    }

    #[test]
    fn test_time_uses_clock() {
        let reply = responder(1).reply(Intent::TimeRequest);
        assert!(reply.text.contains("9:05:09 PM"), "{}", reply.text);
    }

    #[test]
    fn test_greeting_is_reproducible_for_seed() {
        let a = responder(42).reply(Intent::Greeting);
        let b = responder(42).reply(Intent::Greeting);
        assert_eq!(a, b);

        let pool: Vec<String> = GREETINGS.iter().map(|g| g.replace("{name}", "Echo")).collect();
        assert!(pool.contains(&a.text));
    }

    #[test]
    fn test_greeting_matches_seeded_choice() {
        let mut rng = StdRng::seed_from_u64(7);
        let indices: Vec<usize> = (0..GREETINGS.len()).collect();
        let expected = GREETINGS[*indices.choose(&mut rng).unwrap()].replace("{name}", "Echo");

        assert_eq!(responder(7).reply(Intent::Greeting).text, expected);
    }

    #[test]
    fn test_fallback_drawn_from_pool() {
        let reply = responder(1).reply(Intent::Fallback);
        assert!(reply.text.starts_with("That's a fascinating perspective."));
        assert!(FALLBACKS.contains(&reply.text.as_str()));
        assert_eq!(reply.scene, None);
    }

    #[test]
    fn test_fallback_consumes_seeded_rng() {
        // Both pools share one rng, drawn in reply order
        let mut rng = StdRng::seed_from_u64(3);
        let indices: Vec<usize> = (0..GREETINGS.len()).collect();
        let fallbacks: Vec<usize> = (0..FALLBACKS.len()).collect();
        fallbacks.choose(&mut rng).unwrap();
        let expected = GREETINGS[*indices.choose(&mut rng).unwrap()].replace("{name}", "Echo");

        let mut responder = responder(3);
        responder.reply(Intent::Fallback);
        assert_eq!(responder.reply(Intent::Greeting).text, expected);
    }

    #[test]
    fn test_describe_detections() {
        let text = describe_detections(&[
            detection("person", 0.92),
            detection("laptop", 0.81),
            detection("cup", 0.5),
        ]);
        assert!(text.contains("person (92%), laptop (81%) and cup (50%)"), "{}", text);

        let single = describe_detections(&[detection("cat", 0.7)]);
        assert!(single.contains("I detect cat (70%)."));

        assert!(describe_detections(&[]).contains("can't make out anything"));
    }
}
