//! Synthetic camera and canned scene analysis
//!
//! Stands in for real capture hardware and a detection model. Frames are a
//! slowly shifting gradient; the analyzer reports a fixed scene, scaled by
//! how bright the frame is.

use super::{BoundingBox, CameraDevice, Detection, Frame, FrameAnalyzer};
use crate::error::{Device, EchoError, EchoResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 48;

#[derive(Debug, Default)]
pub struct SimulatedCamera {
    deny_access: bool,
    open: AtomicBool,
    sequence: AtomicU64,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera whose access request is always refused
    pub fn denying() -> Self {
        Self {
            deny_access: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CameraDevice for SimulatedCamera {
    async fn open(&self) -> EchoResult<()> {
        if self.deny_access {
            return Err(EchoError::Permission {
                device: Device::Camera,
                reason: "camera access was refused".to_string(),
            });
        }
        if self.open.swap(true, Ordering::SeqCst) {
            return Err(EchoError::Vision("camera is already in use".to_string()));
        }
        info!("📷 Simulated camera acquired");
        Ok(())
    }

    async fn capture(&self) -> EchoResult<Frame> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(EchoError::Vision("camera is not open".to_string()));
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let shift = (sequence % 32) as u32;
        let pixels = (0..FRAME_WIDTH * FRAME_HEIGHT)
            .map(|i| (((i % FRAME_WIDTH) * 2 + shift + 96) % 256) as u8)
            .collect();

        Ok(Frame {
            sequence,
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            pixels,
        })
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            info!("📷 Simulated camera released");
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Reports the same scene for every frame
#[derive(Debug, Default, Clone, Copy)]
pub struct SceneAnalyzer;

impl SceneAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

fn mean_brightness(frame: &Frame) -> f32 {
    if frame.pixels.is_empty() {
        return 0.0;
    }
    let sum: u64 = frame.pixels.iter().map(|&p| p as u64).sum();
    sum as f32 / frame.pixels.len() as f32 / 255.0
}

#[async_trait]
impl FrameAnalyzer for SceneAnalyzer {
    async fn analyze(&self, frame: &Frame) -> EchoResult<Vec<Detection>> {
        let brightness = mean_brightness(frame);
        debug!(sequence = frame.sequence, brightness, "scene analysis");

        let lighting = (0.5 + brightness / 2.0).min(0.99);
        Ok(vec![
            Detection {
                label: "human-centric environment".to_string(),
                confidence: 0.88,
                bbox: BoundingBox {
                    x: 0.0,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0,
                },
            },
            Detection {
                label: "optimal lighting".to_string(),
                confidence: lighting,
                bbox: BoundingBox {
                    x: 0.25,
                    y: 0.0,
                    width: 0.5,
                    height: 0.4,
                },
            },
        ])
    }
}
