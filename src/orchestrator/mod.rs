//! Session Orchestrator
//!
//! Owns the [`Session`] and is the only place the mode changes. Public
//! operations are synchronous and never block: adapter work runs on spawned
//! tasks that report back as [`AdapterEvent`]s, and events are handled one
//! at a time, to completion, in arrival order.
//!
//! The mode is never assigned directly. Each operation marks the activity it
//! started or finished on the session and the mode is re-derived from what is
//! still in flight, so an idle session is exactly one with nothing running.

mod handle;

pub use handle::{Command, OrchestratorHandle};

use crate::asr::{AsrEngine, SpeechInput};
use crate::audio::{AmbientMixer, SilentMixer};
use crate::classifier::{Intent, TextClassifier};
use crate::config::{AmbientConfig, Config};
use crate::error::{Capability, Device, EchoError, EchoResult};
use crate::events::AdapterEvent;
use crate::presenter::{Notice, NullPresenter, Presenter};
use crate::responses::{self, Responder, Scene};
use crate::session::{Activity, Mode, Session, Speaker, Transcript};
use crate::timer::{Clock, SystemClock, Timer, TokioTimer};
use crate::tts::{SpeechOutput, TtsEngine};
use crate::vision::{
    CameraDevice, Detection, FrameAnalyzer, OpenOutcome, VisionAdapter, VisionPolicy,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Text submitted by the bedtime story quick action
pub const STORY_PROMPT: &str = "Tell me a bedtime story";
/// Text submitted by the ambient music quick action
pub const MUSIC_PROMPT: &str = "Play ambient music";

/// A user turn waiting out its thinking pause
struct PendingTurn {
    turn: u64,
    intent: Intent,
    task: JoinHandle<()>,
}

pub struct OrchestratorBuilder {
    config: Config,
    tts: Option<Arc<dyn TtsEngine>>,
    asr: Option<Arc<dyn AsrEngine>>,
    vision: Option<(Arc<dyn CameraDevice>, Arc<dyn FrameAnalyzer>)>,
    mixer: Arc<dyn AmbientMixer>,
    presenter: Box<dyn Presenter>,
    rng: Option<Box<dyn RngCore + Send>>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
}

impl OrchestratorBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tts: None,
            asr: None,
            vision: None,
            mixer: Arc::new(SilentMixer),
            presenter: Box::new(NullPresenter),
            rng: None,
            clock: Arc::new(SystemClock),
            timer: Arc::new(TokioTimer),
        }
    }

    pub fn with_tts(mut self, engine: Option<Arc<dyn TtsEngine>>) -> Self {
        self.tts = engine;
        self
    }

    pub fn with_asr(mut self, engine: Option<Arc<dyn AsrEngine>>) -> Self {
        self.asr = engine;
        self
    }

    pub fn with_vision(
        mut self,
        camera: Arc<dyn CameraDevice>,
        analyzer: Arc<dyn FrameAnalyzer>,
    ) -> Self {
        self.vision = Some((camera, analyzer));
        self
    }

    pub fn with_mixer(mut self, mixer: Arc<dyn AmbientMixer>) -> Self {
        self.mixer = mixer;
        self
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn build(self) -> Orchestrator {
        let config = self.config;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        if self.tts.is_none() {
            let missing = EchoError::Unsupported(Capability::SpeechSynthesis);
            warn!("🔇 {}, replies will be text only", missing);
            self.presenter.notify(&Notice::info(missing.to_string()));
        }

        let vision = self.vision.map(|(camera, analyzer)| {
            let policy = VisionPolicy::from_config(config.vision.policy, &config.timing);
            VisionAdapter::new(
                camera,
                analyzer,
                policy,
                Arc::clone(&self.timer),
                events_tx.clone(),
            )
        });

        let rng = self
            .rng
            .unwrap_or_else(|| Box::new(StdRng::from_entropy()));

        let session = Session::new(config.assistant.greeting_text());
        if let Some(greeting) = session.transcript().last() {
            self.presenter.transcript_appended(greeting);
        }

        Orchestrator {
            session,
            classifier: TextClassifier::new(),
            responder: Responder::new(config.assistant.name.clone(), rng, self.clock),
            speech: SpeechOutput::new(self.tts, config.voice.clone(), events_tx.clone()),
            input: SpeechInput::new(self.asr, events_tx.clone()),
            vision,
            mixer: self.mixer,
            ambient: config.ambient,
            timer: self.timer,
            thinking_delay: config.timing.thinking_delay(),
            presenter: self.presenter,
            events_tx,
            events_rx,
            pending: None,
            next_turn: 0,
            last_narrated: None,
        }
    }
}

pub struct Orchestrator {
    session: Session,
    classifier: TextClassifier,
    responder: Responder,
    speech: SpeechOutput,
    input: SpeechInput,
    vision: Option<VisionAdapter>,
    mixer: Arc<dyn AmbientMixer>,
    ambient: AmbientConfig,
    timer: Arc<dyn Timer>,
    thinking_delay: Duration,
    presenter: Box<dyn Presenter>,
    events_tx: mpsc::UnboundedSender<AdapterEvent>,
    events_rx: mpsc::UnboundedReceiver<AdapterEvent>,
    pending: Option<PendingTurn>,
    next_turn: u64,
    /// Labels of the last narrated scene in continuous vision
    last_narrated: Option<BTreeSet<String>>,
}

impl Orchestrator {
    pub fn builder(config: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    pub fn transcript(&self) -> &Transcript {
        self.session.transcript()
    }

    pub fn is_muted(&self) -> bool {
        self.session.is_muted()
    }

    /// Camera opening or open
    pub fn is_camera_active(&self) -> bool {
        self.vision.as_ref().is_some_and(|v| v.is_active())
    }

    /// Start a turn from typed (or recognized) text.
    ///
    /// Only accepted while Idle; blank text is ignored. Returns whether a
    /// turn was started.
    pub fn submit_text(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            debug!("ignoring blank input");
            return false;
        }
        if self.session.mode() != Mode::Idle {
            debug!(mode = %self.session.mode(), "busy, ignoring input");
            return false;
        }
        self.begin_turn(text);
        self.sync_mode();
        true
    }

    /// Quick action: bedtime story
    pub fn story(&mut self) -> bool {
        self.submit_text(STORY_PROMPT)
    }

    /// Quick action: ambient music
    pub fn music(&mut self) -> bool {
        self.submit_text(MUSIC_PROMPT)
    }

    pub fn start_listening(&mut self) -> bool {
        if self.session.mode() != Mode::Idle {
            debug!(mode = %self.session.mode(), "busy, not listening");
            return false;
        }

        match self.input.start() {
            Ok(Some(_)) => {
                self.session.activate(Activity::Listening);
                self.sync_mode();
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    pub fn stop_listening(&mut self) -> bool {
        if !self.input.stop() {
            return false;
        }
        self.session.deactivate(Activity::Listening);
        self.sync_mode();
        true
    }

    /// Open the camera, or close it if it is already opening or open.
    ///
    /// Closing is always allowed and cancels everything in flight, leaving
    /// the session Idle. Opening is allowed from Idle and from Speaking.
    pub fn toggle_camera(&mut self) -> bool {
        let active = match &self.vision {
            Some(vision) => vision.is_active(),
            None => {
                self.report(EchoError::Unsupported(Capability::Camera));
                return false;
            }
        };

        if active {
            info!("📷 Camera closed by user");
            self.close_camera();
            self.cancel_all();
            self.sync_mode();
            return true;
        }

        match self.session.mode() {
            Mode::Idle | Mode::Speaking => {}
            mode => {
                debug!(%mode, "busy, not opening camera");
                return false;
            }
        }

        if self.speech.stop() {
            self.session.deactivate(Activity::Speaking);
        }
        self.last_narrated = None;
        if let Some(vision) = self.vision.as_mut() {
            if vision.open().is_some() {
                self.session.activate(Activity::Analyzing);
            }
        }
        self.sync_mode();
        true
    }

    /// Muting suppresses speech only; replies are still transcribed.
    pub fn set_muted(&mut self, muted: bool) {
        if self.session.is_muted() == muted {
            return;
        }
        info!(muted, "🔈 Mute changed");
        self.session.set_muted(muted);

        if muted && self.speech.stop() {
            self.session.deactivate(Activity::Speaking);
            self.sync_mode();
        }
    }

    /// Cut the current utterance short
    pub fn stop_speaking(&mut self) -> bool {
        if !self.speech.stop() {
            return false;
        }
        self.session.deactivate(Activity::Speaking);
        self.sync_mode();
        true
    }

    pub fn stop_ambient(&mut self) {
        if let Err(e) = self.mixer.stop_all() {
            warn!("Failed to stop ambient layers: {}", e);
        }
    }

    /// Release every resource and return to Idle
    pub fn shutdown(&mut self) {
        info!("🛑 Shutting down session");
        self.close_camera();
        self.cancel_all();
        self.stop_ambient();
        self.sync_mode();
    }

    /// Apply one adapter completion
    pub fn handle_event(&mut self, event: AdapterEvent) {
        debug!(event = %event, "adapter event");

        match event {
            AdapterEvent::SpeechStarted { utterance } => {
                // Mode already moved to Speaking in `say`
                debug!(utterance, "utterance started");
            }
            AdapterEvent::SpeechFinished { utterance, result } => {
                if !self.speech.finish(utterance) {
                    debug!(utterance, "ignoring stale speech completion");
                    return;
                }
                if let Err(e) = result {
                    warn!(utterance, "❌ Speech failed: {}", e);
                }
                self.session.deactivate(Activity::Speaking);
            }
            AdapterEvent::Recognition { capture, outcome } => {
                if !self.input.finish(capture) {
                    debug!(capture, "ignoring stale recognition result");
                    return;
                }
                self.session.deactivate(Activity::Listening);
                match outcome {
                    Ok(text) => {
                        info!(capture, "🗣️ Heard: '{}'", text);
                        if self.session.derived_mode() == Mode::Idle && !text.trim().is_empty() {
                            self.begin_turn(&text);
                        } else {
                            warn!(capture, "dropping recognized text, session busy");
                        }
                    }
                    Err(e) => self.report(e),
                }
            }
            AdapterEvent::ThinkingElapsed { turn } => match self.pending.take() {
                Some(pending) if pending.turn == turn => self.respond(pending.intent),
                other => {
                    debug!(turn, "ignoring stale thinking timer");
                    self.pending = other;
                }
            },
            AdapterEvent::CameraOpened { session, result } => {
                let Some(vision) = self.vision.as_mut() else {
                    return;
                };
                match vision.opened(session, result) {
                    OpenOutcome::Ready | OpenOutcome::Stale => {}
                    OpenOutcome::Failed(e) => {
                        self.session.deactivate(Activity::Analyzing);
                        self.report(e);
                    }
                }
            }
            AdapterEvent::Detections { session, result } => self.on_detections(session, result),
        }

        self.sync_mode();
    }

    /// Wait for the next adapter event and apply it
    pub async fn pump(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply events until nothing is in flight.
    ///
    /// Never returns while continuous vision is running.
    pub async fn settle(&mut self) {
        while self.session.mode() != Mode::Idle {
            if !self.pump().await {
                break;
            }
        }
    }

    /// Serve commands and adapter events until shutdown.
    ///
    /// Exits on `Command::Shutdown` or when every handle is dropped, and
    /// releases all resources on the way out.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!("🚀 Orchestrator running");

        loop {
            tokio::select! {
                biased;

                maybe_command = commands.recv() => match maybe_command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },

                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        self.shutdown();
        info!("👋 Orchestrator stopped");
    }

    fn apply(&mut self, command: Command) {
        debug!(?command, "command");
        match command {
            Command::SubmitText(text) => {
                self.submit_text(&text);
            }
            Command::StartListening => {
                self.start_listening();
            }
            Command::StopListening => {
                self.stop_listening();
            }
            Command::ToggleCamera => {
                self.toggle_camera();
            }
            Command::SetMuted(muted) => self.set_muted(muted),
            Command::StopSpeaking => {
                self.stop_speaking();
            }
            Command::StopAmbient => self.stop_ambient(),
            Command::Story => {
                self.story();
            }
            Command::Music => {
                self.music();
            }
            Command::Transcript(reply) => {
                let _ = reply.send(self.session.transcript().entries().to_vec());
            }
            Command::Shutdown => self.shutdown(),
        }
    }

    fn begin_turn(&mut self, text: &str) {
        let intent = self.classifier.classify(text);
        self.append(Speaker::User, text);

        self.next_turn += 1;
        let turn = self.next_turn;
        info!(turn, %intent, "💭 Thinking");

        let timer = Arc::clone(&self.timer);
        let events = self.events_tx.clone();
        let delay = self.thinking_delay;
        let task = tokio::spawn(async move {
            timer.sleep(delay).await;
            let _ = events.send(AdapterEvent::ThinkingElapsed { turn });
        });

        self.pending = Some(PendingTurn { turn, intent, task });
        self.session.activate(Activity::Thinking);
    }

    fn respond(&mut self, intent: Intent) {
        self.session.deactivate(Activity::Thinking);

        let reply = self.responder.reply(intent);
        self.append(Speaker::Assistant, reply.text.as_str());
        if let Some(scene) = reply.scene {
            self.start_scene(scene);
        }
        self.say(&reply.text);
    }

    /// Speaking starts when the utterance is dispatched, not on the
    /// engine's `SpeechStarted`, so a turn never passes through Idle
    /// between Thinking and Speaking.
    fn say(&mut self, text: &str) {
        if self.session.is_muted() {
            debug!("muted, not speaking");
            return;
        }
        if self.speech.speak(text).is_some() {
            self.session.activate(Activity::Speaking);
        }
    }

    fn start_scene(&self, scene: Scene) {
        let set = match scene {
            Scene::Story => &self.ambient.story,
            Scene::Music => &self.ambient.music,
        };
        if let Err(e) = self.mixer.play(set) {
            warn!("Ambient '{}' failed: {}", set.name, e);
            self.notify(Notice::warning(format!("Ambient audio unavailable: {}", e)));
        }
    }

    fn on_detections(&mut self, session: u64, result: EchoResult<Vec<Detection>>) {
        let Some(vision) = self.vision.as_mut() else {
            return;
        };
        if !vision.is_current(session) || !vision.is_open() {
            debug!(session, "ignoring detections for closed camera");
            return;
        }

        let continuous = vision.policy().is_continuous();
        if !continuous {
            vision.analysis_finished();
            self.session.deactivate(Activity::Analyzing);
        }

        match result {
            Ok(detections) => {
                if continuous && !self.is_new_scene(&detections) {
                    debug!(session, "scene unchanged, not narrating");
                    return;
                }
                let text = responses::describe_detections(&detections);
                self.append(Speaker::Assistant, text.as_str());
                self.say(&text);
            }
            Err(e) => {
                warn!(session, "❌ Analysis failed: {}", e);
                self.close_camera();
                self.session.deactivate(Activity::Analyzing);
                self.notify(Notice::error(format!("Visual analysis stopped: {}", e)));
            }
        }
    }

    fn is_new_scene(&mut self, detections: &[Detection]) -> bool {
        let labels: BTreeSet<String> = detections.iter().map(|d| d.label.clone()).collect();
        if self.last_narrated.as_ref() == Some(&labels) {
            return false;
        }
        self.last_narrated = Some(labels);
        true
    }

    fn close_camera(&mut self) {
        if let Some(vision) = self.vision.as_mut() {
            vision.close();
        }
        self.last_narrated = None;
        self.session.deactivate(Activity::Analyzing);
    }

    /// Abort every in-flight adapter operation
    fn cancel_all(&mut self) {
        self.speech.stop();
        self.input.stop();
        if let Some(pending) = self.pending.take() {
            debug!(turn = pending.turn, "cancelling pending turn");
            pending.task.abort();
        }
        self.session.clear_activities();
    }

    fn append(&mut self, speaker: Speaker, text: &str) {
        let entry = self.session.append(speaker, text);
        self.presenter.transcript_appended(&entry);
    }

    fn sync_mode(&mut self) {
        if let Some(from) = self.session.sync_mode() {
            let to = self.session.mode();
            info!(from = %from, to = %to, "🔄 Mode transition");
            self.presenter.mode_changed(to);
        }
    }

    fn notify(&self, notice: Notice) {
        self.presenter.notify(&notice);
    }

    fn report(&self, error: EchoError) {
        match &error {
            EchoError::Permission { device, reason } => {
                warn!(%device, "🚫 Permission denied: {}", reason);
                let message = match device {
                    Device::Camera => "Camera access is required for Video Analysis.",
                    Device::Microphone => "Microphone access is required for voice input.",
                };
                self.notify(Notice::warning(message));
            }
            EchoError::Unsupported(_) => {
                warn!("⚠️ {}", error);
                self.notify(Notice::warning(error.to_string()));
            }
            e if e.is_recognition_miss() => info!("🎙️ {}", e),
            e => {
                error!("❌ {}", e);
                self.notify(Notice::error(e.to_string()));
            }
        }
    }
}
