//! In-process stand-in for the remote voice service
//!
//! Behaves like the live protocol at the level the session cares about:
//! it reports state transitions, transcript lines and emotions, and plays a
//! reply for a while before returning to idle unless interrupted.

use super::transport::{Transport, TransportEvent, TransportSink};
use crate::messages::{ChatMessage, Sender};
use crate::state::{AbortReason, DeviceState};
use crate::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const REPLIES: &[(&str, &str)] = &[
    ("Hello! How can I help you today?", "happy"),
    ("Let me think about that for a moment.", "thinking"),
    ("That sounds great, tell me more.", "relaxed"),
    ("Sorry, I did not quite catch that.", "confused"),
];

pub struct SimulatedTransport {
    sink: TransportSink,
    reply_duration: Duration,
    /// Bumped whenever the current reply is cut short
    generation: Arc<AtomicU64>,
    turns: usize,
}

impl SimulatedTransport {
    pub fn new(sink: TransportSink, reply_duration: Duration) -> Self {
        Self {
            sink,
            reply_duration,
            generation: Arc::new(AtomicU64::new(0)),
            turns: 0,
        }
    }

    /// Run the connection handshake: `Connecting` then `Idle`
    pub fn connect(&self) -> Result<()> {
        info!("Simulated transport connecting");
        self.sink.state(DeviceState::Connecting)?;
        self.sink.state(DeviceState::Idle)
    }

    fn finish_reply_later(&self) {
        let generation = Arc::clone(&self.generation);
        let expected = generation.load(Ordering::SeqCst);
        let sink = self.sink.clone();
        let duration = self.reply_duration;

        thread::spawn(move || {
            thread::sleep(duration);
            report_reply_finished(&sink, &generation, expected);
        });
    }
}

/// Report `Idle` unless the reply was cut short. Returns whether the report
/// reached the session.
fn report_reply_finished(sink: &TransportSink, generation: &AtomicU64, expected: u64) -> bool {
    if generation.load(Ordering::SeqCst) != expected {
        debug!("Reply was interrupted, not reporting idle");
        return false;
    }
    match sink.state(DeviceState::Idle) {
        Ok(()) => true,
        Err(e) => {
            debug!("Reply finished after the session ended: {}", e);
            false
        }
    }
}

/// Transcript line tagged with a wire role, the way the live protocol sends it
fn transcript_line(role: &str, text: impl Into<String>) -> TransportEvent {
    TransportEvent::Message(ChatMessage::new(Sender::from_role(role), text))
}

impl Transport for SimulatedTransport {
    fn start_listening(&mut self) -> Result<()> {
        debug!("Simulated capture started");
        self.sink.state(DeviceState::Listening)
    }

    fn stop_listening(&mut self) -> Result<()> {
        let (reply, emotion) = REPLIES[self.turns % REPLIES.len()];
        self.turns += 1;

        self.sink
            .emit(transcript_line("user", format!("(utterance #{})", self.turns)))?;
        self.sink.state(DeviceState::Speaking)?;
        self.sink.emit(transcript_line("assistant", reply))?;
        self.sink.emit(TransportEvent::Emotion(emotion.to_string()))?;
        self.finish_reply_later();
        Ok(())
    }

    fn abort_speaking(&mut self, reason: AbortReason) -> Result<()> {
        debug!("Simulated reply aborted ({})", reason);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.sink.state(DeviceState::Idle)
    }

    fn close(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
