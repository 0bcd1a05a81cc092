//! Command channel into a running orchestrator
//!
//! Input wiring (stdin, hotkeys, a GUI) lives on other tasks and talks to
//! [`Orchestrator::run`](super::Orchestrator::run) through a cloneable
//! [`OrchestratorHandle`]. Commands are applied in the order they were sent.

use crate::error::{EchoError, EchoResult};
use crate::session::TranscriptEntry;
use tokio::sync::{mpsc, oneshot};

/// The orchestrator's public operations, as messages
#[derive(Debug)]
pub enum Command {
    SubmitText(String),
    StartListening,
    StopListening,
    ToggleCamera,
    SetMuted(bool),
    StopSpeaking,
    StopAmbient,
    Story,
    Music,
    /// Reply with a copy of the transcript so far
    Transcript(oneshot::Sender<Vec<TranscriptEntry>>),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl OrchestratorHandle {
    /// Create a handle and the receiver to pass to `Orchestrator::run`
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (commands, rx) = mpsc::unbounded_channel();
        (Self { commands }, rx)
    }

    pub fn send(&self, command: Command) -> EchoResult<()> {
        self.commands.send(command).map_err(|_| EchoError::Stopped)
    }

    pub fn submit_text(&self, text: impl Into<String>) -> EchoResult<()> {
        self.send(Command::SubmitText(text.into()))
    }

    pub fn start_listening(&self) -> EchoResult<()> {
        self.send(Command::StartListening)
    }

    pub fn stop_listening(&self) -> EchoResult<()> {
        self.send(Command::StopListening)
    }

    pub fn toggle_camera(&self) -> EchoResult<()> {
        self.send(Command::ToggleCamera)
    }

    pub fn set_muted(&self, muted: bool) -> EchoResult<()> {
        self.send(Command::SetMuted(muted))
    }

    pub fn stop_speaking(&self) -> EchoResult<()> {
        self.send(Command::StopSpeaking)
    }

    pub fn stop_ambient(&self) -> EchoResult<()> {
        self.send(Command::StopAmbient)
    }

    pub fn story(&self) -> EchoResult<()> {
        self.send(Command::Story)
    }

    pub fn music(&self) -> EchoResult<()> {
        self.send(Command::Music)
    }

    pub fn shutdown(&self) -> EchoResult<()> {
        self.send(Command::Shutdown)
    }

    /// Snapshot of the transcript as the orchestrator currently holds it
    pub async fn transcript(&self) -> EchoResult<Vec<TranscriptEntry>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Transcript(tx))?;
        rx.await.map_err(|_| EchoError::Stopped)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_ok, task};

    #[test]
    fn test_commands_arrive_in_order() {
        let (handle, mut rx) = OrchestratorHandle::channel();
        handle.submit_text("hello").unwrap();
        handle.set_muted(true).unwrap();
        handle.toggle_camera().unwrap();

        assert!(matches!(rx.try_recv(), Ok(Command::SubmitText(t)) if t == "hello"));
        assert!(matches!(rx.try_recv(), Ok(Command::SetMuted(true))));
        assert!(matches!(rx.try_recv(), Ok(Command::ToggleCamera)));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_fails() {
        let (handle, rx) = OrchestratorHandle::channel();
        drop(rx);
        assert!(handle.is_closed());
        assert!(matches!(handle.story(), Err(EchoError::Stopped)));
        assert!(matches!(handle.transcript().await, Err(EchoError::Stopped)));
    }

    #[test]
    fn test_transcript_query_waits_for_reply() {
        let (handle, mut rx) = OrchestratorHandle::channel();
        let mut query = task::spawn(handle.transcript());
        assert_pending!(query.poll());

        let Ok(Command::Transcript(reply)) = rx.try_recv() else {
            panic!("expected a transcript query");
        };
        reply.send(Vec::new()).unwrap();

        assert!(query.is_woken());
        let entries = assert_ready_ok!(query.poll());
        assert!(entries.is_empty());
    }
}
