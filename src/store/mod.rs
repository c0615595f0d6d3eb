//! Persistence of decoded messages
//!
//! Sessions hand every [`DecodedMessage`] to a [`RecordSink`]. Appends must
//! return quickly and their failures never reach the device connection; the
//! session logs them and carries on.

mod json_lines;

pub use self::json_lines::{JsonLinesSink, SinkWriter};

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::Result;
use crate::protocol::DecodedMessage;

/// Append-only destination for decoded messages.
///
/// Implementations are shared by every session and must keep concurrent
/// appends from interleaving with one another.
pub trait RecordSink: Send + Sync {
    /// Queues or stores one record without waiting on I/O
    fn append(&self, record: &DecodedMessage) -> Result<()>;
}

/// Sink that keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DecodedMessage>>,
}

impl MemorySink {
    /// Creates an empty sink
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Returns a copy of everything appended so far
    pub fn records(&self) -> Vec<DecodedMessage> {
        self.lock().clone()
    }

    /// Number of records appended so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic mid-push cannot leave a half-written record, so a poisoned
    // lock still guards a consistent Vec
    fn lock(&self) -> MutexGuard<'_, Vec<DecodedMessage>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordSink for MemorySink {
    fn append(&self, record: &DecodedMessage) -> Result<()> {
        self.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode, MessageType};
    use std::sync::Arc;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.append(&decode(&[0x78, 0x78, 0x05, 0x26])).unwrap();
        sink.append(&decode(&[0x78, 0x78, 0x05, 0x13])).unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message_type(), MessageType::Heartbeat);
        assert_eq!(records[1].message_type(), MessageType::Status);
    }

    #[test]
    fn test_memory_sink_survives_poisoned_lock() {
        let sink = Arc::new(MemorySink::new());
        sink.append(&decode(&[0x78, 0x78, 0x05, 0x26])).unwrap();

        let poisoner = Arc::clone(&sink);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.records.lock().unwrap();
            panic!("holder panicked");
        })
        .join();
        assert!(result.is_err());
        assert!(sink.records.is_poisoned());

        assert_eq!(sink.len(), 1);
        sink.append(&decode(&[0x78, 0x78, 0x05, 0x13])).unwrap();
        assert_eq!(sink.records().len(), 2);
        assert!(!sink.is_empty());
    }
}
