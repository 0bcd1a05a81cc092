//! Mock camera and analyzer
//!
//! The camera counts acquisitions and releases so tests can check that every
//! successful open is paired with exactly one close.

use async_trait::async_trait;
use echo::error::{Device, EchoError, EchoResult};
use echo::vision::{BoundingBox, CameraDevice, Detection, Frame, FrameAnalyzer};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockCamera {
    deny: bool,
    pub open_calls: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub fail_capture: AtomicBool,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Device handles currently held
    pub fn open_handles(&self) -> isize {
        self.opens.load(Ordering::SeqCst) as isize - self.closes.load(Ordering::SeqCst) as isize
    }
}

#[async_trait]
impl CameraDevice for MockCamera {
    async fn open(&self) -> EchoResult<()> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(EchoError::Permission {
                device: Device::Camera,
                reason: "user dismissed the prompt".to_string(),
            });
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn capture(&self) -> EchoResult<Frame> {
        if self.fail_capture.load(Ordering::SeqCst) {
            return Err(EchoError::Vision("sensor unplugged".to_string()));
        }
        Ok(Frame {
            sequence: 0,
            width: 2,
            height: 2,
            pixels: vec![128; 4],
        })
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn detection(label: &str, confidence: f32) -> Detection {
    Detection {
        label: label.to_string(),
        confidence,
        bbox: BoundingBox::default(),
    }
}

/// Plays back a list of scenes, then keeps repeating the last one
#[derive(Default)]
pub struct MockAnalyzer {
    scenes: Mutex<VecDeque<Vec<Detection>>>,
    last: Mutex<Vec<Detection>>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new(scenes: Vec<Vec<Detection>>) -> Self {
        Self {
            scenes: Mutex::new(scenes.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameAnalyzer for MockAnalyzer {
    async fn analyze(&self, _frame: &Frame) -> EchoResult<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::task::yield_now().await;

        let next = self.scenes.lock().unwrap().pop_front();
        let scene = match next {
            Some(scene) => {
                *self.last.lock().unwrap() = scene.clone();
                scene
            }
            None => self.last.lock().unwrap().clone(),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(scene)
    }
}
