use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::{Error, Result};
use crate::protocol::DecodedMessage;
use super::RecordSink;

/// Appends one JSON object per line to a file.
///
/// Appends are serialized on the caller and queued; a single writer task
/// owns the file, so lines from concurrent sessions never interleave.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    /// Queue feeding the writer task
    tx: mpsc::Sender<String>,
}

/// Handle on the writer task behind a [`JsonLinesSink`]
#[derive(Debug)]
pub struct SinkWriter {
    handle: JoinHandle<Result<u64>>,
}

impl JsonLinesSink {
    /// Opens (or creates) the file for appending and starts the writer task
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<(JsonLinesSink, SinkWriter)> {
        let path = path.as_ref();
        if capacity == 0 {
            return Err(Error::config("packet log capacity must be greater than zero"));
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| Error::persistence(format!("Failed to open {}: {}", path.display(), e)))?;

        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(write_lines(file, rx));
        debug!(path = %path.display(), capacity, "packet log opened");

        Ok((JsonLinesSink { tx }, SinkWriter { handle }))
    }
}

impl RecordSink for JsonLinesSink {
    fn append(&self, record: &DecodedMessage) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.tx.try_send(line).map_err(|e| match e {
            TrySendError::Full(_) => Error::persistence("packet log queue is full"),
            TrySendError::Closed(_) => Error::persistence("packet log writer has stopped"),
        })
    }
}

impl SinkWriter {
    /// Waits for the writer to drain and close the file.
    ///
    /// Completes once every [`JsonLinesSink`] clone has been dropped.
    /// Returns the number of lines written.
    pub async fn finish(self) -> Result<u64> {
        self.handle
            .await
            .map_err(|e| Error::persistence(format!("Packet log writer task failed: {}", e)))?
    }
}

async fn write_lines(file: File, mut rx: mpsc::Receiver<String>) -> Result<u64> {
    let mut writer = BufWriter::new(file);
    let mut written = 0u64;

    while let Some(line) = rx.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!(error = %e, "failed to write packet log line");
            continue;
        }
        written += 1;

        // Flush once the queue is drained
        if rx.is_empty() {
            if let Err(e) = writer.flush().await {
                warn!(error = %e, "failed to flush packet log");
            }
        }
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(written)
}
