//! Shared fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use voicebot::provisioning::{
    ActivationInfo, ProvisioningClient, ProvisioningError, ProvisioningResult,
};
use voicebot::session::{SessionEvent, SessionHandle, Transport};
use voicebot::settings::{LiveConnectionConfig, SessionConfig};
use voicebot::state::AbortReason;

/// What the fake provisioning service answers
#[derive(Clone)]
pub enum Reply {
    Activated(LiveConnectionConfig),
    Pending(&'static str),
    Fail(ProvisioningError),
}

pub struct FakeProvisioning {
    reply: Reply,
    pub calls: AtomicUsize,
    pub last_config: Mutex<Option<SessionConfig>>,
}

impl FakeProvisioning {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_config: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvisioningClient for FakeProvisioning {
    async fn check(
        &self,
        config: &SessionConfig,
    ) -> Result<ProvisioningResult, ProvisioningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock() = Some(config.clone());
        match &self.reply {
            Reply::Activated(connection) => Ok(ProvisioningResult::Activated {
                connection: connection.clone(),
            }),
            Reply::Pending(code) => Ok(ProvisioningResult::PendingActivation {
                activation: ActivationInfo::new(*code),
            }),
            Reply::Fail(e) => Err(e.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Start,
    Stop,
    Abort(AbortReason),
}

/// Transport that only records what the session asked of it
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingTransport {
    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }
}

impl Transport for RecordingTransport {
    fn start_listening(&mut self) -> voicebot::Result<()> {
        self.calls.lock().push(Call::Start);
        Ok(())
    }

    fn stop_listening(&mut self) -> voicebot::Result<()> {
        self.calls.lock().push(Call::Stop);
        Ok(())
    }

    fn abort_speaking(&mut self, reason: AbortReason) -> voicebot::Result<()> {
        self.calls.lock().push(Call::Abort(reason));
        Ok(())
    }
}

/// Block until an event matching `want` arrives
pub fn wait_for(handle: &SessionHandle, want: impl Fn(&SessionEvent) -> bool) -> SessionEvent {
    loop {
        let event = handle
            .recv_event_timeout(Duration::from_secs(2))
            .expect("timed out waiting for session event");
        if want(&event) {
            return event;
        }
    }
}
