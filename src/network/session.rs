use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::core::{FramingMode, Result};
use crate::protocol::{build_response, FrameDecoder, Gt06Codec, Response};
use crate::store::RecordSink;

/// Per-frame processing shared by every session: decode, persist, pick a reply
#[derive(Clone)]
pub struct SessionHandler {
    /// Frame decoder
    decoder: FrameDecoder,
    /// Destination of decoded records
    sink: Arc<dyn RecordSink>,
}

impl SessionHandler {
    /// Creates a new handler
    pub fn new(decoder: FrameDecoder, sink: Arc<dyn RecordSink>) -> Self {
        SessionHandler { decoder, sink }
    }

    /// Handles one inbound frame and returns the reply to send, if any
    pub fn handle(&self, frame: &[u8]) -> Option<Response> {
        let decoded = self.decoder.decode(frame);
        debug!(
            message_type = %decoded.message_type(),
            length = decoded.length(),
            raw = decoded.raw_hex(),
            "frame received"
        );

        if let Some(err) = decoded.decode_error() {
            warn!(message_type = %decoded.message_type(), error = %err, "frame decoded with errors");
        }
        if let Some(login) = decoded.login() {
            info!(imei = %login.imei, "device login");
        }

        if let Err(e) = self.sink.append(&decoded) {
            warn!(error = %e, "failed to persist decoded frame");
        }

        build_response(&decoded, frame)
    }
}

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames received
    pub frames: u64,
    /// Acknowledgments written
    pub responses: u64,
}

/// One device connection
pub struct Session<T> {
    /// Remote address
    peer: SocketAddr,
    /// Framed device stream
    framed: Framed<T, Gt06Codec>,
    /// Frame processing
    handler: SessionHandler,
    /// Close after this long without data
    idle_timeout: Option<Duration>,
    /// Running counters
    stats: SessionStats,
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session over a connected stream
    pub fn new(
        stream: T,
        peer: SocketAddr,
        handler: SessionHandler,
        framing: FramingMode,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Session {
            peer,
            framed: Framed::new(stream, Gt06Codec::new(framing)),
            handler,
            idle_timeout,
            stats: SessionStats::default(),
        }
    }

    /// Returns the remote address
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Processes frames until the device disconnects, goes idle or the stream fails
    pub async fn run(mut self) -> Result<SessionStats> {
        loop {
            let next = match self.idle_timeout {
                Some(limit) => match timeout(limit, self.framed.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        info!(peer = %self.peer, idle_secs = limit.as_secs_f64(), "closing idle session");
                        break;
                    }
                },
                None => self.framed.next().await,
            };

            let frame = match next {
                Some(frame) => frame?,
                None => break,
            };

            self.stats.frames += 1;
            if let Some(response) = self.handler.handle(&frame) {
                self.framed.send(response).await?;
                self.stats.responses += 1;
            }
        }

        Ok(self.stats)
    }
}
