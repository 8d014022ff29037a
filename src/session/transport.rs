use crate::messages::ChatMessage;
use crate::state::{AbortReason, DeviceState};
use crate::{Result, VoicebotError};
use crossbeam_channel::Sender;

/// Something the transport reports about the remote session
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// Authoritative device state pushed by the remote side
    StateChanged(DeviceState),
    /// Transcript line (user speech recognised, or assistant reply text)
    Message(ChatMessage),
    /// Emotion label attached to the reply
    Emotion(String),
    /// Irrecoverable condition; the session ends in `FatalError`
    Fatal(String),
}

/// Control surface of the live connection
///
/// Implementations must not call back into the session synchronously; report
/// state through the [`TransportSink`] instead.
///
/// Every accepted call is expected to be followed by a state report. Until
/// one arrives the same call is not repeated, up to the session's
/// acknowledgement timeout. Return an error instead of staying silent when a
/// call cannot be carried out.
pub trait Transport: Send {
    /// Begin audio capture
    fn start_listening(&mut self) -> Result<()>;

    /// End audio capture; the remote side decides the next state
    fn stop_listening(&mut self) -> Result<()>;

    /// Interrupt the reply being played back
    fn abort_speaking(&mut self, reason: AbortReason) -> Result<()>;

    /// Release the connection
    fn close(&mut self) {}
}

/// Everything the session thread consumes, in one arrival-ordered queue
#[derive(Clone, Debug)]
pub enum SessionInput {
    StartListening,
    StopListening,
    AbortSpeaking(AbortReason),
    Transport(TransportEvent),
    Shutdown,
}

/// Write end handed to a transport for its reports
#[derive(Clone)]
pub struct TransportSink {
    tx: Sender<SessionInput>,
}

impl TransportSink {
    pub(crate) fn new(tx: Sender<SessionInput>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: TransportEvent) -> Result<()> {
        self.tx
            .send(SessionInput::Transport(event))
            .map_err(|e| VoicebotError::Channel(format!("Session is gone: {}", e)))
    }

    pub fn state(&self, state: DeviceState) -> Result<()> {
        self.emit(TransportEvent::StateChanged(state))
    }
}
