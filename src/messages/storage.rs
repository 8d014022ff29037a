//! Append-only transcript shared between the session and its observers
//!
//! Observers hold a [`TranscriptCursor`] that remembers how far they have
//! read, so no message is ever skipped or delivered out of order no matter
//! how slowly the observer drains.

use super::types::ChatMessage;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct TranscriptLog {
    messages: Arc<RwLock<Vec<ChatMessage>>>,
    len_tx: Arc<watch::Sender<usize>>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
            len_tx: Arc::new(len_tx),
        }
    }

    /// Append a message. The length notification is sent while the write
    /// lock is held so observers never see a length ahead of the contents.
    pub fn append(&self, message: ChatMessage) {
        let mut messages = self.messages.write();
        messages.push(message);
        self.len_tx.send_replace(messages.len());
    }

    pub fn get_all(&self) -> Vec<ChatMessage> {
        self.messages.read().clone()
    }

    pub fn last(&self) -> Option<ChatMessage> {
        self.messages.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Subscribe from the beginning of the transcript
    pub fn subscribe(&self) -> TranscriptCursor {
        TranscriptCursor {
            log: self.clone(),
            seen: 0,
            len_rx: self.len_tx.subscribe(),
        }
    }

    /// Subscribe to messages appended from now on
    pub fn subscribe_from_now(&self) -> TranscriptCursor {
        let mut cursor = self.subscribe();
        cursor.seen = self.len();
        cursor
    }

    fn slice_from(&self, start: usize) -> Vec<ChatMessage> {
        let messages = self.messages.read();
        messages.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }
}

impl Default for TranscriptLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Read position of one observer in a [`TranscriptLog`]
#[derive(Debug)]
pub struct TranscriptCursor {
    log: TranscriptLog,
    seen: usize,
    len_rx: watch::Receiver<usize>,
}

impl TranscriptCursor {
    /// Return every message appended since the last call, in arrival order
    pub fn drain_new(&mut self) -> Vec<ChatMessage> {
        let _ = self.len_rx.borrow_and_update();
        let fresh = self.log.slice_from(self.seen);
        self.seen += fresh.len();
        fresh
    }

    pub fn has_new(&self) -> bool {
        self.log.len() > self.seen
    }

    /// Wait until at least one unseen message exists, then drain
    pub async fn next_batch(&mut self) -> Vec<ChatMessage> {
        while !self.has_new() {
            if self.len_rx.changed().await.is_err() {
                break;
            }
        }
        self.drain_new()
    }
}
