//! Mock ASR Engine for Testing
//!
//! Returns scripted outcomes, one per capture. Once the script runs out a
//! capture never resolves, like a user who has not started talking yet.

use async_trait::async_trait;
use echo::asr::AsrEngine;
use echo::error::EchoResult;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockAsr {
    outcomes: Mutex<VecDeque<EchoResult<Option<String>>>>,
    /// Captures actually started
    pub listens: AtomicUsize,
}

impl MockAsr {
    pub fn new(outcomes: Vec<EchoResult<Option<String>>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            listens: AtomicUsize::new(0),
        }
    }

    /// Create a mock that hears a single phrase
    pub fn with_phrase(text: &str) -> Self {
        Self::new(vec![Ok(Some(text.to_string()))])
    }

    pub fn listens(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AsrEngine for MockAsr {
    async fn listen_once(&self) -> EchoResult<Option<String>> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
