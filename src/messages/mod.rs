pub mod storage;
pub mod types;

pub use storage::{TranscriptCursor, TranscriptLog};
pub use types::{ChatMessage, Sender};
