//! Voice capture
//!
//! `Idle -> Listening -> Idle` state machine over an optional speech
//! recognizer. Without a recognizer every toggle is inert. Each capture runs
//! as a task bound to a oneshot cancellation channel, so a capture that is
//! toggled off can never deliver a transcript afterwards.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::InputCaptureError;

/// Platform speech-to-text capability
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Check microphone access before a capture starts
    fn ensure_access(&self) -> Result<(), InputCaptureError> {
        Ok(())
    }

    /// Record one utterance and return its transcript
    async fn listen(&self) -> Result<String, InputCaptureError>;
}

/// Recognizer backed by an external command that prints a transcript
///
/// The command is expected to record a single utterance and write the text
/// to stdout. It is killed if the capture is cancelled.
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for CommandRecognizer {
    async fn listen(&self) -> Result<String, InputCaptureError> {
        debug!(program = %self.program, "CommandRecognizer::listen: called");
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => InputCaptureError::MicrophoneDenied(e.to_string()),
                std::io::ErrorKind::NotFound => InputCaptureError::SpeechUnavailable,
                _ => InputCaptureError::Recognition(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(status = ?output.status, %stderr, "CommandRecognizer::listen: command failed");
            return Err(InputCaptureError::Recognition(if stderr.is_empty() {
                format!("recognizer exited with {}", output.status)
            } else {
                stderr
            }));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            debug!("CommandRecognizer::listen: empty transcript");
            return Err(InputCaptureError::Recognition("no speech detected".to_string()));
        }
        Ok(transcript)
    }
}

/// Voice capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Listening,
}

/// Outcome of a capture, tagged with the session that produced it
#[derive(Debug)]
pub enum VoiceEvent {
    Transcript { session: u64, text: String },
    Failed { session: u64, error: InputCaptureError },
}

impl VoiceEvent {
    fn session(&self) -> u64 {
        match self {
            Self::Transcript { session, .. } | Self::Failed { session, .. } => *session,
        }
    }
}

/// What a toggle did
#[derive(Debug)]
pub enum ToggleResult {
    /// No speech capability; nothing happened
    Unsupported,
    /// A capture is now running
    Started,
    /// The running capture was cancelled
    Stopped,
    /// Access was denied; still idle
    Denied(InputCaptureError),
}

/// Join a transcript onto existing request text with `", "`
pub fn merge_transcript(existing: &str, transcript: &str) -> String {
    if existing.is_empty() {
        transcript.to_string()
    } else {
        format!("{}, {}", existing, transcript)
    }
}

/// Voice capture state machine
pub struct VoiceCapture {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    state: VoiceState,
    session: u64,
    cancel: Option<oneshot::Sender<()>>,
    events_tx: mpsc::Sender<VoiceEvent>,
    events_rx: mpsc::Receiver<VoiceEvent>,
}

impl VoiceCapture {
    pub fn new(recognizer: Option<Arc<dyn SpeechRecognizer>>) -> Self {
        debug!(supported = recognizer.is_some(), "VoiceCapture::new: called");
        let (events_tx, events_rx) = mpsc::channel(8);
        Self {
            recognizer,
            state: VoiceState::Idle,
            session: 0,
            cancel: None,
            events_tx,
            events_rx,
        }
    }

    /// Capture with no speech capability
    pub fn unsupported() -> Self {
        Self::new(None)
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Start a capture when idle, stop it when listening
    ///
    /// Must be called from within a tokio runtime.
    pub fn toggle(&mut self) -> ToggleResult {
        debug!(state = ?self.state, session = self.session, "VoiceCapture::toggle: called");
        let Some(recognizer) = self.recognizer.clone() else {
            debug!("VoiceCapture::toggle: no recognizer, staying idle");
            return ToggleResult::Unsupported;
        };

        match self.state {
            VoiceState::Listening => {
                self.stop();
                ToggleResult::Stopped
            }
            VoiceState::Idle => {
                if let Err(e) = recognizer.ensure_access() {
                    warn!(error = %e, "VoiceCapture::toggle: access denied");
                    return ToggleResult::Denied(e);
                }
                self.start(recognizer);
                ToggleResult::Started
            }
        }
    }

    fn start(&mut self, recognizer: Arc<dyn SpeechRecognizer>) {
        self.session += 1;
        let session = self.session;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                result = recognizer.listen() => {
                    let event = match result {
                        Ok(text) => VoiceEvent::Transcript { session, text },
                        Err(error) => VoiceEvent::Failed { session, error },
                    };
                    let _ = events_tx.send(event).await;
                }
                _ = cancel_rx => {
                    debug!(session, "voice capture cancelled");
                }
            }
        });

        self.cancel = Some(cancel_tx);
        self.state = VoiceState::Listening;
        info!(session, "Voice capture started");
    }

    /// Cancel the running capture, if any
    pub fn stop(&mut self) {
        debug!(session = self.session, "VoiceCapture::stop: called");
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.state = VoiceState::Idle;
    }

    /// Next pending event without waiting
    pub fn try_next_event(&mut self) -> Option<VoiceEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Apply a capture outcome to the request text
    ///
    /// Returns an advisory for recognition errors. Events from a session that
    /// is no longer current are ignored.
    pub fn apply(&mut self, event: VoiceEvent, text: &mut String) -> Option<String> {
        debug!(session = event.session(), current = self.session, "VoiceCapture::apply: called");
        if event.session() != self.session || self.state != VoiceState::Listening {
            debug!("VoiceCapture::apply: stale event ignored");
            return None;
        }

        self.cancel = None;
        self.state = VoiceState::Idle;

        match event {
            VoiceEvent::Transcript { text: transcript, .. } => {
                *text = merge_transcript(text.as_str(), &transcript);
                None
            }
            VoiceEvent::Failed { error, .. } => {
                warn!(error = %error, "Voice capture failed");
                Some(error.advisory())
            }
        }
    }
}

impl Drop for VoiceCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
