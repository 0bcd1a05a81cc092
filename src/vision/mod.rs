//! Vision Module
//!
//! Camera acquisition plus frame analysis behind two traits, and the
//! [`VisionAdapter`] that pairs every successful open with exactly one close
//! through a [`CameraLease`].

pub mod simulated;

use crate::config::{TimingConfig, VisionPolicyKind};
use crate::error::{EchoError, EchoResult};
use crate::events::AdapterEvent;
use crate::timer::Timer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use simulated::{SceneAnalyzer, SimulatedCamera};

/// A captured video frame (8-bit grayscale, row-major)
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Normalized box, all values in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Camera hardware. Implementations must refuse a second `open` while open.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Acquire the device. Fails with `EchoError::Permission` when refused.
    async fn open(&self) -> EchoResult<()>;

    async fn capture(&self) -> EchoResult<Frame>;

    /// Release the device
    fn close(&self);

    fn name(&self) -> &str;
}

/// Object detection over a single frame
#[async_trait]
pub trait FrameAnalyzer: Send + Sync {
    async fn analyze(&self, frame: &Frame) -> EchoResult<Vec<Detection>>;
}

/// When frames are analyzed once the camera is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionPolicy {
    /// Analyze one frame after a fixed delay, narrate, go back to Idle
    OneShot { delay: Duration },
    /// Analyze frame after frame until the camera closes, one at a time
    Continuous { interval: Duration },
}

impl VisionPolicy {
    pub fn from_config(kind: VisionPolicyKind, timing: &TimingConfig) -> Self {
        match kind {
            VisionPolicyKind::OneShot => VisionPolicy::OneShot {
                delay: Duration::from_millis(timing.one_shot_delay_ms),
            },
            VisionPolicyKind::Continuous => VisionPolicy::Continuous {
                interval: Duration::from_millis(timing.poll_interval_ms),
            },
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, VisionPolicy::Continuous { .. })
    }
}

/// Proof of one successful `open`. Dropping it closes the device, so a grant
/// that is never delivered (or delivered after the session was closed) still
/// releases the camera exactly once.
pub struct CameraLease {
    camera: Arc<dyn CameraDevice>,
    session: u64,
}

impl CameraLease {
    fn new(camera: Arc<dyn CameraDevice>, session: u64) -> Self {
        Self { camera, session }
    }

    pub fn session(&self) -> u64 {
        self.session
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        debug!(session = self.session, camera = self.camera.name(), "releasing camera");
        self.camera.close();
    }
}

impl fmt::Debug for CameraLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraLease")
            .field("session", &self.session)
            .finish()
    }
}

#[derive(Debug)]
enum CameraState {
    Closed,
    Opening { session: u64 },
    Open { lease: CameraLease },
}

/// What an open completion meant for the adapter
#[derive(Debug)]
pub enum OpenOutcome {
    /// Camera is live and analysis has been scheduled
    Ready,
    /// Acquisition failed; nothing is held
    Failed(EchoError),
    /// Result belonged to a session that was closed meanwhile
    Stale,
}

pub struct VisionAdapter {
    camera: Arc<dyn CameraDevice>,
    analyzer: Arc<dyn FrameAnalyzer>,
    policy: VisionPolicy,
    timer: Arc<dyn Timer>,
    events: mpsc::UnboundedSender<AdapterEvent>,
    state: CameraState,
    /// Open request whose session was closed before it resolved
    orphaned: Option<u64>,
    analysis: Option<JoinHandle<()>>,
    next_session: u64,
}

impl VisionAdapter {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        analyzer: Arc<dyn FrameAnalyzer>,
        policy: VisionPolicy,
        timer: Arc<dyn Timer>,
        events: mpsc::UnboundedSender<AdapterEvent>,
    ) -> Self {
        Self {
            camera,
            analyzer,
            policy,
            timer,
            events,
            state: CameraState::Closed,
            orphaned: None,
            analysis: None,
            next_session: 0,
        }
    }

    pub fn policy(&self) -> VisionPolicy {
        self.policy
    }

    /// Opening or open
    pub fn is_active(&self) -> bool {
        !matches!(self.state, CameraState::Closed)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, CameraState::Open { .. })
    }

    pub fn is_current(&self, session: u64) -> bool {
        match &self.state {
            CameraState::Opening { session: s } => *s == session,
            CameraState::Open { lease } => lease.session() == session,
            CameraState::Closed => false,
        }
    }

    /// Request camera access. Returns the session id, or `None` when a
    /// session is already active.
    pub fn open(&mut self) -> Option<u64> {
        if self.is_active() {
            debug!("camera already active, ignoring open");
            return None;
        }

        // A closed-but-unresolved request still owns the device: adopt it
        // rather than acquiring twice.
        if let Some(session) = self.orphaned.take() {
            info!(session, "📷 Re-adopting pending camera request");
            self.state = CameraState::Opening { session };
            return Some(session);
        }

        self.next_session += 1;
        let session = self.next_session;
        self.state = CameraState::Opening { session };
        info!(session, camera = self.camera.name(), "📷 Requesting camera access");

        let camera = Arc::clone(&self.camera);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = camera
                .open()
                .await
                .map(|()| CameraLease::new(Arc::clone(&camera), session));
            // An undeliverable grant is dropped here, which releases it
            let _ = events.send(AdapterEvent::CameraOpened { session, result });
        });

        Some(session)
    }

    /// Apply the result of an open request
    pub fn opened(&mut self, session: u64, result: EchoResult<CameraLease>) -> OpenOutcome {
        if self.orphaned == Some(session) {
            self.orphaned = None;
            if result.is_ok() {
                info!(session, "📷 Releasing camera acquired after close");
            }
            return OpenOutcome::Stale;
        }

        if !matches!(self.state, CameraState::Opening { session: s } if s == session) {
            warn!(session, "open result for unknown camera session");
            return OpenOutcome::Stale;
        }

        match result {
            Ok(lease) => {
                info!(session, policy = ?self.policy, "📷 Camera open");
                self.state = CameraState::Open { lease };
                self.spawn_analysis(session);
                OpenOutcome::Ready
            }
            Err(e) => {
                warn!(session, "❌ Camera open failed: {}", e);
                self.state = CameraState::Closed;
                OpenOutcome::Failed(e)
            }
        }
    }

    /// Stop analysis and release the device. Safe to call in any state.
    pub fn close(&mut self) -> bool {
        if let Some(task) = self.analysis.take() {
            task.abort();
        }

        match std::mem::replace(&mut self.state, CameraState::Closed) {
            CameraState::Closed => false,
            CameraState::Opening { session } => {
                debug!(session, "closing camera before access resolved");
                self.orphaned = Some(session);
                true
            }
            CameraState::Open { lease } => {
                info!(session = lease.session(), "📷 Closing camera");
                drop(lease);
                true
            }
        }
    }

    /// One-shot analysis delivered its result
    pub fn analysis_finished(&mut self) {
        self.analysis = None;
    }

    fn spawn_analysis(&mut self, session: u64) {
        let camera = Arc::clone(&self.camera);
        let analyzer = Arc::clone(&self.analyzer);
        let timer = Arc::clone(&self.timer);
        let events = self.events.clone();
        let policy = self.policy;

        let task = tokio::spawn(async move {
            match policy {
                VisionPolicy::OneShot { delay } => {
                    timer.sleep(delay).await;
                    let result = capture_and_analyze(camera.as_ref(), analyzer.as_ref()).await;
                    let _ = events.send(AdapterEvent::Detections { session, result });
                }
                VisionPolicy::Continuous { interval } => loop {
                    let result = capture_and_analyze(camera.as_ref(), analyzer.as_ref()).await;
                    let failed = result.is_err();
                    if events
                        .send(AdapterEvent::Detections { session, result })
                        .is_err()
                        || failed
                    {
                        break;
                    }
                    timer.sleep(interval).await;
                },
            }
        });

        self.analysis = Some(task);
    }
}

async fn capture_and_analyze(
    camera: &dyn CameraDevice,
    analyzer: &dyn FrameAnalyzer,
) -> EchoResult<Vec<Detection>> {
    let frame = camera.capture().await?;
    debug!(sequence = frame.sequence, "analyzing frame");
    analyzer.analyze(&frame).await
}

impl Drop for VisionAdapter {
    fn drop(&mut self) {
        self.close();
    }
}
