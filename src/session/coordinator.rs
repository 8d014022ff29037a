//! Device state machine of a voice session
//!
//! The coordinator mirrors whatever state the transport reports and only
//! decides the three user-intent edges itself:
//!
//! | Intent | Honored only in |
//! |---|---|
//! | start listening | `Idle` |
//! | stop listening | `Listening` |
//! | abort speaking | `Speaking` |
//!
//! Anything else is dropped without error. Press/release/cancel gestures race
//! with server-initiated state changes, so late or duplicate requests are
//! expected and must be no-ops.
//!
//! An issued intent suppresses repeats of itself until the transport reports
//! a state or the acknowledgement timeout elapses, whichever comes first.

use super::transport::{Transport, TransportEvent};
use crate::messages::{ChatMessage, TranscriptLog};
use crate::state::{AbortReason, DeviceState, Emotion};
use crate::utils::Observable;
use crate::VoicebotError;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How long an issued intent waits for a state report before repeats are let
/// through again
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// A user request against the session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    StartListening,
    StopListening,
    AbortSpeaking(AbortReason),
}

impl Intent {
    /// The only state in which the intent is forwarded to the transport
    pub fn required_state(&self) -> DeviceState {
        match self {
            Intent::StartListening => DeviceState::Idle,
            Intent::StopListening => DeviceState::Listening,
            Intent::AbortSpeaking(_) => DeviceState::Speaking,
        }
    }

    fn same_kind(&self, other: &Intent) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentOutcome {
    /// Forwarded to the transport
    Issued,
    /// Dropped by the state guard or because the same intent is awaiting
    /// acknowledgement
    Ignored,
    /// The guard passed but the transport call failed
    TransportFailed,
}

/// Notifications emitted after the coordinator changed something
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    StateChanged(DeviceState),
    MessageAppended(ChatMessage),
    EmotionChanged(Emotion),
    IntentHandled(Intent, IntentOutcome),
    Shutdown,
}

/// Read-only views for the presentation layer
#[derive(Clone, Debug)]
pub struct SessionObservers {
    pub device_state: Observable<DeviceState>,
    pub emotion: Observable<Emotion>,
    pub transcript: TranscriptLog,
}

impl SessionObservers {
    pub fn new() -> Self {
        Self {
            device_state: Observable::new(DeviceState::Starting),
            emotion: Observable::new(Emotion::NEUTRAL),
            transcript: TranscriptLog::new(),
        }
    }
}

impl Default for SessionObservers {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SessionCoordinator {
    transport: Box<dyn Transport>,
    state: DeviceState,
    /// Last issued intent not yet followed by a state report
    pending: Option<(Intent, Instant)>,
    ack_timeout: Duration,
    fatal_reason: Option<String>,
    observers: SessionObservers,
}

impl SessionCoordinator {
    pub fn new(transport: Box<dyn Transport>, observers: SessionObservers) -> Self {
        let state = observers.device_state.get();
        Self {
            transport,
            state,
            pending: None,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            fatal_reason: None,
            observers,
        }
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn observers(&self) -> &SessionObservers {
        &self.observers
    }

    /// The error that ended the session, if it has ended
    pub fn fatal_error(&self) -> Option<VoicebotError> {
        self.fatal_reason
            .as_ref()
            .map(|reason| VoicebotError::FatalDevice(reason.clone()))
    }

    /// Apply a user intent against the current state
    pub fn request(&mut self, intent: Intent) -> IntentOutcome {
        if self.state != intent.required_state() {
            debug!("Dropping {:?} in state {}", intent, self.state);
            return IntentOutcome::Ignored;
        }
        if let Some((pending, issued_at)) = self.pending {
            if pending.same_kind(&intent) {
                if issued_at.elapsed() < self.ack_timeout {
                    debug!("Dropping {:?}: awaiting transport acknowledgement", intent);
                    return IntentOutcome::Ignored;
                }
                warn!(
                    "No state report for {:?} after {:?}, issuing again",
                    pending, self.ack_timeout
                );
            }
        }

        let sent = match intent {
            Intent::StartListening => self.transport.start_listening(),
            Intent::StopListening => self.transport.stop_listening(),
            Intent::AbortSpeaking(reason) => self.transport.abort_speaking(reason),
        };

        match sent {
            Ok(()) => {
                debug!("{:?} issued", intent);
                self.pending = Some((intent, Instant::now()));
                IntentOutcome::Issued
            }
            Err(e) => {
                warn!("Transport rejected {:?}: {}", intent, e);
                self.pending = None;
                IntentOutcome::TransportFailed
            }
        }
    }

    /// Mirror a transport report
    pub fn apply(&mut self, event: TransportEvent) -> Option<SessionEvent> {
        match event {
            TransportEvent::StateChanged(DeviceState::FatalError) => {
                self.enter_fatal("transport reported a fatal error".to_string())
            }
            TransportEvent::StateChanged(next) => {
                if self.state.is_terminal() {
                    debug!("Ignoring state {} after fatal error", next);
                    return None;
                }
                self.pending = None;
                self.set_state(next)
            }
            TransportEvent::Fatal(reason) => self.enter_fatal(reason),
            TransportEvent::Message(message) => {
                debug!("Transcript [{}]: {}", message.sender, message.text);
                self.observers.transcript.append(message.clone());
                Some(SessionEvent::MessageAppended(message))
            }
            TransportEvent::Emotion(label) => {
                let emotion = Emotion::from_label(&label);
                if emotion.is_neutral() && !label.trim().eq_ignore_ascii_case("neutral") {
                    debug!("Unknown emotion {:?}, using neutral", label);
                }
                self.observers
                    .emotion
                    .set_if_changed(emotion)
                    .then_some(SessionEvent::EmotionChanged(emotion))
            }
        }
    }

    /// Release the transport
    pub fn close(&mut self) {
        self.transport.close();
    }

    fn enter_fatal(&mut self, reason: String) -> Option<SessionEvent> {
        if self.state.is_terminal() {
            return None;
        }
        error!("Session failed: {}", reason);
        self.fatal_reason = Some(reason);
        self.pending = None;
        self.set_state(DeviceState::FatalError)
    }

    fn set_state(&mut self, next: DeviceState) -> Option<SessionEvent> {
        if next == self.state {
            return None;
        }
        info!("Device state {} -> {}", self.state, next);
        self.state = next;
        self.observers.device_state.set(next);
        Some(SessionEvent::StateChanged(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Call {
        Start,
        Stop,
        Abort(AbortReason),
        Close,
    }

    #[derive(Clone, Default)]
    struct RecordingTransport {
        calls: Arc<Mutex<Vec<Call>>>,
        fail: bool,
    }

    impl RecordingTransport {
        fn record(&self, call: Call) -> Result<()> {
            self.calls.lock().push(call);
            if self.fail {
                Err(VoicebotError::Transport("link down".into()))
            } else {
                Ok(())
            }
        }
    }

    impl Transport for RecordingTransport {
        fn start_listening(&mut self) -> Result<()> {
            self.record(Call::Start)
        }

        fn stop_listening(&mut self) -> Result<()> {
            self.record(Call::Stop)
        }

        fn abort_speaking(&mut self, reason: AbortReason) -> Result<()> {
            self.record(Call::Abort(reason))
        }

        fn close(&mut self) {
            self.calls.lock().push(Call::Close);
        }
    }

    fn coordinator() -> (SessionCoordinator, Arc<Mutex<Vec<Call>>>) {
        let transport = RecordingTransport::default();
        let calls = Arc::clone(&transport.calls);
        (
            SessionCoordinator::new(Box::new(transport), SessionObservers::new()),
            calls,
        )
    }

    fn connect(coordinator: &mut SessionCoordinator) {
        coordinator.apply(TransportEvent::StateChanged(DeviceState::Connecting));
        coordinator.apply(TransportEvent::StateChanged(DeviceState::Idle));
    }

    #[test]
    fn test_starts_in_starting_and_mirrors_connection() {
        let (mut coordinator, _) = coordinator();
        assert_eq!(coordinator.state(), DeviceState::Starting);

        connect(&mut coordinator);
        assert_eq!(coordinator.state(), DeviceState::Idle);
        assert_eq!(
            coordinator.observers().device_state.get(),
            DeviceState::Idle
        );
    }

    #[test]
    fn test_intents_dropped_before_connected() {
        let (mut coordinator, calls) = coordinator();
        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::Ignored
        );
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_start_only_in_idle() {
        let (mut coordinator, calls) = coordinator();
        connect(&mut coordinator);

        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::Issued
        );
        coordinator.apply(TransportEvent::StateChanged(DeviceState::Listening));
        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::Ignored
        );
        assert_eq!(coordinator.state(), DeviceState::Listening);
        assert_eq!(*calls.lock(), vec![Call::Start]);
    }

    #[test]
    fn test_double_tap_before_acknowledgement_issues_once() {
        let (mut coordinator, calls) = coordinator();
        connect(&mut coordinator);

        coordinator.request(Intent::StartListening);
        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::Ignored
        );
        assert_eq!(*calls.lock(), vec![Call::Start]);
    }

    #[test]
    fn test_unacknowledged_intent_rearms_after_timeout() {
        let (coordinator, calls) = coordinator();
        let mut coordinator = coordinator.with_ack_timeout(Duration::from_millis(20));
        connect(&mut coordinator);

        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::Issued
        );
        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::Ignored
        );

        // transport accepted the call but never reported back
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::Issued
        );
        assert_eq!(*calls.lock(), vec![Call::Start, Call::Start]);
    }

    #[test]
    fn test_stop_does_not_assume_idle() {
        let (mut coordinator, calls) = coordinator();
        connect(&mut coordinator);
        coordinator.request(Intent::StartListening);
        coordinator.apply(TransportEvent::StateChanged(DeviceState::Listening));

        assert_eq!(
            coordinator.request(Intent::StopListening),
            IntentOutcome::Issued
        );
        // state stays until the transport reports
        assert_eq!(coordinator.state(), DeviceState::Listening);

        // late release after the server already moved on
        coordinator.apply(TransportEvent::StateChanged(DeviceState::Speaking));
        assert_eq!(
            coordinator.request(Intent::StopListening),
            IntentOutcome::Ignored
        );
        assert_eq!(*calls.lock(), vec![Call::Start, Call::Stop]);
    }

    #[test]
    fn test_abort_ignored_outside_speaking() {
        let (mut coordinator, calls) = coordinator();
        connect(&mut coordinator);

        let before = coordinator.state();
        assert_eq!(
            coordinator.request(Intent::AbortSpeaking(AbortReason::None)),
            IntentOutcome::Ignored
        );
        assert_eq!(coordinator.state(), before);
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_abort_in_speaking_forwards_reason_once() {
        let (mut coordinator, calls) = coordinator();
        connect(&mut coordinator);
        coordinator.apply(TransportEvent::StateChanged(DeviceState::Speaking));

        assert_eq!(
            coordinator.request(Intent::AbortSpeaking(AbortReason::None)),
            IntentOutcome::Issued
        );
        assert_eq!(
            coordinator.request(Intent::AbortSpeaking(AbortReason::None)),
            IntentOutcome::Ignored
        );
        assert_eq!(*calls.lock(), vec![Call::Abort(AbortReason::None)]);

        // acknowledgement re-arms the guard
        coordinator.apply(TransportEvent::StateChanged(DeviceState::Idle));
        coordinator.apply(TransportEvent::StateChanged(DeviceState::Speaking));
        assert_eq!(
            coordinator.request(Intent::AbortSpeaking(AbortReason::WakeWordDetected)),
            IntentOutcome::Issued
        );
    }

    #[test]
    fn test_transport_failure_does_not_latch() {
        let transport = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let calls = Arc::clone(&transport.calls);
        let mut coordinator = SessionCoordinator::new(Box::new(transport), SessionObservers::new());
        connect(&mut coordinator);

        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::TransportFailed
        );
        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::TransportFailed
        );
        assert_eq!(calls.lock().len(), 2);
        assert_eq!(coordinator.state(), DeviceState::Idle);
    }

    #[test]
    fn test_fatal_error_is_terminal() {
        let (mut coordinator, calls) = coordinator();
        connect(&mut coordinator);

        let event = coordinator.apply(TransportEvent::Fatal("server closed".into()));
        assert_eq!(event, Some(SessionEvent::StateChanged(DeviceState::FatalError)));
        assert!(matches!(
            coordinator.fatal_error(),
            Some(VoicebotError::FatalDevice(reason)) if reason == "server closed"
        ));

        assert_eq!(
            coordinator.apply(TransportEvent::StateChanged(DeviceState::Idle)),
            None
        );
        assert_eq!(coordinator.state(), DeviceState::FatalError);
        assert_eq!(
            coordinator.request(Intent::StartListening),
            IntentOutcome::Ignored
        );
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_fatal_state_report_from_any_state() {
        let (mut coordinator, _) = coordinator();
        coordinator.apply(TransportEvent::StateChanged(DeviceState::FatalError));
        assert_eq!(coordinator.state(), DeviceState::FatalError);
        assert!(coordinator.fatal_error().is_some());
    }

    #[test]
    fn test_opaque_states_pass_through() {
        let (mut coordinator, _) = coordinator();
        let event = coordinator.apply(TransportEvent::StateChanged(DeviceState::Upgrading));
        assert_eq!(event, Some(SessionEvent::StateChanged(DeviceState::Upgrading)));
        assert_eq!(coordinator.state(), DeviceState::Upgrading);
    }

    #[test]
    fn test_transcript_and_emotion_fan_out() {
        let (mut coordinator, _) = coordinator();
        let mut cursor = coordinator.observers().transcript.subscribe();

        coordinator.apply(TransportEvent::Message(ChatMessage::user("hello")));
        coordinator.apply(TransportEvent::Message(ChatMessage::assistant("hi there")));
        let texts: Vec<_> = cursor.drain_new().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["hello", "hi there"]);

        let event = coordinator.apply(TransportEvent::Emotion("happy".into()));
        assert_eq!(
            event,
            Some(SessionEvent::EmotionChanged(Emotion::from_label("happy")))
        );
        assert_eq!(coordinator.apply(TransportEvent::Emotion("HAPPY".into())), None);

        coordinator.apply(TransportEvent::Emotion("bewildered".into()));
        assert!(coordinator.observers().emotion.get().is_neutral());
    }

    #[test]
    fn test_guard_table_holds_for_arbitrary_sequences() {
        let intents = [
            Intent::StartListening,
            Intent::StopListening,
            Intent::AbortSpeaking(AbortReason::None),
        ];
        let states = [
            DeviceState::Starting,
            DeviceState::Connecting,
            DeviceState::Idle,
            DeviceState::Listening,
            DeviceState::Speaking,
        ];

        // simple LCG so the sequence is reproducible
        let mut seed: u64 = 0x5eed;
        let mut next = move |n: usize| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize % n
        };

        let (mut coordinator, calls) = coordinator();
        let mut expected = Vec::new();
        for _ in 0..500 {
            if next(2) == 0 {
                coordinator.apply(TransportEvent::StateChanged(states[next(states.len())]));
            } else {
                let intent = intents[next(intents.len())];
                let state = coordinator.state();
                let outcome = coordinator.request(intent);
                if outcome == IntentOutcome::Issued {
                    assert_eq!(state, intent.required_state());
                    assert_eq!(coordinator.state(), state);
                    expected.push(match intent {
                        Intent::StartListening => Call::Start,
                        Intent::StopListening => Call::Stop,
                        Intent::AbortSpeaking(reason) => Call::Abort(reason),
                    });
                }
            }
        }
        assert_eq!(*calls.lock(), expected);
    }

    #[test]
    fn test_close_releases_transport() {
        let (mut coordinator, calls) = coordinator();
        coordinator.close();
        assert_eq!(*calls.lock(), vec![Call::Close]);
    }
}
