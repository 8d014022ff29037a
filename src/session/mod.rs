//! Live voice session
//!
//! - [`Transport`]: the persistent connection (WebSocket or MQTT) driven by
//!   start/stop/abort calls and reporting back through a [`TransportSink`]
//! - [`SessionCoordinator`]: the single writer of device state, transcript and
//!   emotion
//! - [`SessionOrchestrator`]: runs the coordinator on its own thread so user
//!   intents and transport reports are applied strictly in arrival order
//! - [`SimulatedTransport`]: in-process stand-in for the remote service

mod coordinator;
mod orchestrator;
mod simulated;
mod transport;

pub use coordinator::{Intent, IntentOutcome, SessionCoordinator, SessionEvent, SessionObservers};
pub use orchestrator::{SessionHandle, SessionOrchestrator};
pub use simulated::SimulatedTransport;
pub use transport::{SessionInput, Transport, TransportEvent, TransportSink};
