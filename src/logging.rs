//! Append-only event sink.
//!
//! The core emits one entry per parse result, precondition outcome,
//! dispatch, collaborator result, state transition, and fatal error.
//! Appends are synchronous fire-and-forget; file-writing mechanics
//! belong to the embedding application.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Current timestamp in milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub message: String,
}

/// Append-only sink for structured command events
pub trait EventSink: Send + Sync {
    fn append(&self, entry: LogEntry);
}

/// Convenience: stamp and append a message
pub fn log_event(sink: &Arc<dyn EventSink>, message: impl Into<String>) {
    sink.append(LogEntry {
        timestamp_ms: now_ms(),
        message: message.into(),
    });
}

/// Forwards entries to the tracing subscriber
pub struct TracingSink;

impl EventSink for TracingSink {
    fn append(&self, entry: LogEntry) {
        info!(timestamp_ms = entry.timestamp_ms, "{}", entry.message);
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Captures entries in memory for assertions
    #[derive(Default)]
    pub struct CapturingSink {
        pub entries: Mutex<Vec<LogEntry>>,
    }

    impl EventSink for CapturingSink {
        fn append(&self, entry: LogEntry) {
            self.entries.lock().unwrap().push(entry);
        }
    }

    impl CapturingSink {
        pub fn messages(&self) -> Vec<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.message.clone())
                .collect()
        }
    }
}
