#![allow(dead_code)]

pub mod mock_asr;
pub mod mock_tts;
pub mod mock_vision;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use echo::asr::AsrEngine;
use echo::audio::AmbientMixer;
use echo::config::{Config, TrackSet, VisionPolicyKind};
use echo::error::EchoResult;
use echo::orchestrator::Orchestrator;
use echo::presenter::{Notice, Presenter};
use echo::session::{Mode, Speaker, TranscriptEntry};
use echo::timer::{Clock, Timer};
use echo::tts::TtsEngine;
use echo::vision::{CameraDevice, FrameAnalyzer};
use mock_asr::MockAsr;
use mock_tts::MockTts;
use mock_vision::{MockAnalyzer, MockCamera};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Timer that only yields, so delays cost nothing in tests
pub struct ImmediateTimer;

#[async_trait]
impl Timer for ImmediateTimer {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// 9:05:09 PM local time
pub fn evening() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 3, 14, 21, 5, 9).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixerCall {
    Play(String),
    StopAll,
}

#[derive(Default)]
pub struct RecordingMixer {
    pub calls: Mutex<Vec<MixerCall>>,
}

impl RecordingMixer {
    pub fn calls(&self) -> Vec<MixerCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl AmbientMixer for RecordingMixer {
    fn play(&self, set: &TrackSet) -> EchoResult<()> {
        self.calls.lock().unwrap().push(MixerCall::Play(set.name.clone()));
        Ok(())
    }

    fn stop_all(&self) -> EchoResult<()> {
        self.calls.lock().unwrap().push(MixerCall::StopAll);
        Ok(())
    }
}

/// Everything the orchestrator told the presentation layer
#[derive(Default)]
pub struct PresenterLog {
    pub modes: Mutex<Vec<Mode>>,
    pub entries: Mutex<Vec<TranscriptEntry>>,
    pub notices: Mutex<Vec<Notice>>,
}

impl PresenterLog {
    pub fn modes(&self) -> Vec<Mode> {
        self.modes.lock().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn assistant_lines(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.speaker == Speaker::Assistant)
            .map(|e| e.text)
            .collect()
    }
}

pub struct RecordingPresenter(pub Arc<PresenterLog>);

impl Presenter for RecordingPresenter {
    fn transcript_appended(&self, entry: &TranscriptEntry) {
        self.0.entries.lock().unwrap().push(entry.clone());
    }

    fn mode_changed(&self, mode: Mode) {
        self.0.modes.lock().unwrap().push(mode);
    }

    fn notify(&self, notice: &Notice) {
        self.0.notices.lock().unwrap().push(notice.clone());
    }
}

/// An orchestrator wired to mocks, with handles on each of them
pub struct Rig {
    pub orchestrator: Orchestrator,
    pub tts: Arc<MockTts>,
    pub asr: Arc<MockAsr>,
    pub camera: Arc<MockCamera>,
    pub analyzer: Arc<MockAnalyzer>,
    pub mixer: Arc<RecordingMixer>,
    pub log: Arc<PresenterLog>,
}

impl Rig {
    pub fn builder() -> RigBuilder {
        RigBuilder::default()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Apply events until the session is Idle again
    pub async fn settle(&mut self) {
        tokio::time::timeout(Duration::from_secs(5), self.orchestrator.settle())
            .await
            .expect("session never returned to Idle");
    }

    /// Apply events until `done` holds
    pub async fn pump_until(&mut self, mut done: impl FnMut(&Self) -> bool) {
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while !done(self) {
                self.orchestrator.pump().await;
            }
        })
        .await;
        assert!(result.is_ok(), "condition never reached");
    }
}

pub struct RigBuilder {
    config: Config,
    tts: Option<MockTts>,
    asr: Option<MockAsr>,
    camera: Option<MockCamera>,
    analyzer: MockAnalyzer,
    seed: u64,
}

impl Default for RigBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            tts: Some(MockTts::new()),
            asr: Some(MockAsr::default()),
            camera: Some(MockCamera::new()),
            analyzer: MockAnalyzer::new(vec![vec![mock_vision::detection("person", 0.9)]]),
            seed: 7,
        }
    }
}

impl RigBuilder {
    pub fn tts(mut self, tts: MockTts) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn without_tts(mut self) -> Self {
        self.tts = None;
        self
    }

    pub fn asr(mut self, asr: MockAsr) -> Self {
        self.asr = Some(asr);
        self
    }

    pub fn without_asr(mut self) -> Self {
        self.asr = None;
        self
    }

    pub fn camera(mut self, camera: MockCamera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn without_camera(mut self) -> Self {
        self.camera = None;
        self
    }

    pub fn analyzer(mut self, analyzer: MockAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn continuous(mut self) -> Self {
        self.config.vision.policy = VisionPolicyKind::Continuous;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Rig {
        let log = Arc::new(PresenterLog::default());
        let mixer = Arc::new(RecordingMixer::default());

        let tts_present = self.tts.is_some();
        let asr_present = self.asr.is_some();
        let camera_present = self.camera.is_some();
        let tts = Arc::new(self.tts.unwrap_or_default());
        let asr = Arc::new(self.asr.unwrap_or_default());
        let camera = Arc::new(self.camera.unwrap_or_default());
        let analyzer = Arc::new(self.analyzer);

        let mut builder = Orchestrator::builder(self.config)
            .with_tts(tts_present.then(|| Arc::clone(&tts) as Arc<dyn TtsEngine>))
            .with_asr(asr_present.then(|| Arc::clone(&asr) as Arc<dyn AsrEngine>))
            .with_mixer(Arc::clone(&mixer) as Arc<dyn AmbientMixer>)
            .with_presenter(Box::new(RecordingPresenter(Arc::clone(&log))))
            .with_rng(Box::new(StdRng::seed_from_u64(self.seed)))
            .with_clock(Arc::new(FixedClock(evening())))
            .with_timer(Arc::new(ImmediateTimer));

        if camera_present {
            builder = builder.with_vision(
                Arc::clone(&camera) as Arc<dyn CameraDevice>,
                Arc::clone(&analyzer) as Arc<dyn FrameAnalyzer>,
            );
        }

        Rig {
            orchestrator: builder.build(),
            tts,
            asr,
            camera,
            analyzer,
            mixer,
            log,
        }
    }
}
