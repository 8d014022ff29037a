//! Session thread
//!
//! User intents (from the UI thread) and transport reports (from the
//! connection) are funnelled into a single queue and applied one at a time by
//! the coordinator, so no two transitions are ever applied out of arrival
//! order and the presentation layer never blocks the session.

use super::coordinator::{Intent, SessionCoordinator, SessionEvent, SessionObservers};
use super::transport::{SessionInput, Transport, TransportSink};
use crate::config::ClientConfig;
use crate::messages::TranscriptLog;
use crate::state::{AbortReason, DeviceState, Emotion};
use crate::utils::Observable;
use crate::{Result, VoicebotError};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Handle for driving a session from the UI or tests
#[derive(Clone)]
pub struct SessionHandle {
    input_tx: Sender<SessionInput>,
    event_rx: Receiver<SessionEvent>,
    observers: SessionObservers,
}

impl SessionHandle {
    fn send(&self, input: SessionInput) -> Result<()> {
        self.input_tx
            .send(input)
            .map_err(|e| VoicebotError::Channel(format!("Failed to send to session: {}", e)))
    }

    /// Request audio capture. Dropped unless the device is idle.
    pub fn start_listening(&self) -> Result<()> {
        self.send(SessionInput::StartListening)
    }

    /// Request end of capture. Dropped unless the device is listening.
    pub fn stop_listening(&self) -> Result<()> {
        self.send(SessionInput::StopListening)
    }

    /// Interrupt the reply. Dropped unless the device is speaking.
    pub fn abort_speaking(&self, reason: AbortReason) -> Result<()> {
        self.send(SessionInput::AbortSpeaking(reason))
    }

    /// Request shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionInput::Shutdown)
    }

    /// Sink a transport reports into
    pub fn transport_sink(&self) -> TransportSink {
        TransportSink::new(self.input_tx.clone())
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event, waiting up to `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    pub fn device_state(&self) -> Observable<DeviceState> {
        self.observers.device_state.clone()
    }

    pub fn emotion(&self) -> Observable<Emotion> {
        self.observers.emotion.clone()
    }

    pub fn transcript(&self) -> TranscriptLog {
        self.observers.transcript.clone()
    }

    pub fn current_state(&self) -> DeviceState {
        self.observers.device_state.get()
    }
}

/// Owns the session queue until `start` moves it onto a thread
pub struct SessionOrchestrator {
    input_rx: Receiver<SessionInput>,
    event_tx: Sender<SessionEvent>,
    observers: SessionObservers,
    ack_timeout: Duration,
}

impl SessionOrchestrator {
    /// Create a new orchestrator
    ///
    /// Returns the orchestrator and a handle for controlling it. Build the
    /// transport with `handle.transport_sink()`, then call `start`.
    pub fn new(config: &ClientConfig) -> (Self, SessionHandle) {
        // Unbounded: a transport may report from inside a call made on the
        // session thread, which must never block on its own queue.
        let (input_tx, input_rx) = unbounded();
        // a zero-capacity channel would make every try_send fail
        let (event_tx, event_rx) = bounded(config.channel_buffer_size.max(1));
        let observers = SessionObservers::new();

        let handle = SessionHandle {
            input_tx,
            event_rx,
            observers: observers.clone(),
        };
        let orchestrator = Self {
            input_rx,
            event_tx,
            observers,
            ack_timeout: Duration::from_millis(config.intent_ack_timeout_ms),
        };
        (orchestrator, handle)
    }

    /// Start the session thread with the given transport
    pub fn start(self, transport: Box<dyn Transport>) -> Result<JoinHandle<()>> {
        let coordinator = SessionCoordinator::new(transport, self.observers)
            .with_ack_timeout(self.ack_timeout);
        let input_rx = self.input_rx;
        let event_tx = self.event_tx;

        thread::Builder::new()
            .name("voicebot-session".into())
            .spawn(move || run_session_loop(coordinator, input_rx, event_tx))
            .map_err(|e| VoicebotError::IOError(format!("Failed to spawn session thread: {}", e)))
    }
}

fn run_session_loop(
    mut coordinator: SessionCoordinator,
    input_rx: Receiver<SessionInput>,
    event_tx: Sender<SessionEvent>,
) {
    info!("Session loop starting");

    let emit = |event: SessionEvent| match event_tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => debug!("Event listener lagging, dropped {:?}", event),
        Err(TrySendError::Disconnected(_)) => {}
    };

    for input in input_rx.iter() {
        let intent = match input {
            SessionInput::StartListening => Intent::StartListening,
            SessionInput::StopListening => Intent::StopListening,
            SessionInput::AbortSpeaking(reason) => Intent::AbortSpeaking(reason),
            SessionInput::Transport(event) => {
                if let Some(changed) = coordinator.apply(event) {
                    emit(changed);
                }
                continue;
            }
            SessionInput::Shutdown => {
                info!("Session shutdown requested");
                break;
            }
        };

        let outcome = coordinator.request(intent);
        emit(SessionEvent::IntentHandled(intent, outcome));
    }

    if input_rx.is_empty() {
        debug!("Session queue drained");
    } else {
        warn!("Session stopped with {} unprocessed inputs", input_rx.len());
    }

    coordinator.close();
    emit(SessionEvent::Shutdown);
    info!("Session loop stopped");
}
