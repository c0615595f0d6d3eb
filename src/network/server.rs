use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use crate::core::{Config, Error, Result};
use crate::protocol::FrameDecoder;
use crate::store::RecordSink;
use super::session::{Session, SessionHandler};

/// Pause after a failed accept so descriptor exhaustion does not spin the loop
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP listener spawning one session per device connection
pub struct Server {
    /// Bound listener
    listener: TcpListener,
    /// Frame processing shared by all sessions
    handler: SessionHandler,
    /// Server configuration
    config: Config,
}

impl Server {
    /// Binds the configured address
    pub async fn bind(config: Config, sink: Arc<dyn RecordSink>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|e| Error::network(format!("Failed to bind {}: {}", config.bind_addr, e)))?;

        let handler = SessionHandler::new(FrameDecoder::from_config(&config), sink);

        Ok(Server {
            listener,
            handler,
            config,
        })
    }

    /// Returns the local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| Error::network(format!("Failed to get local address: {}", e)))
    }

    /// Accepts connections until `shutdown` completes, then aborts open sessions
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(open_sessions = sessions.len(), "shutting down listener");
                    break;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(&mut sessions, stream, peer),
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = %e, "session task panicked");
                        }
                    }
                }
            }
        }

        sessions.shutdown().await;
        Ok(())
    }

    fn spawn_session(&self, sessions: &mut JoinSet<()>, stream: TcpStream, peer: SocketAddr) {
        info!(peer = %peer, "device connected");

        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
        }
        if let Some(idle) = self.config.tcp_keepalive {
            let keepalive = TcpKeepalive::new().with_time(idle);
            if let Err(e) = SockRef::from(&stream).set_tcp_keepalive(&keepalive) {
                warn!(peer = %peer, error = %e, "failed to enable TCP keepalive");
            }
        }

        let session = Session::new(
            stream,
            peer,
            self.handler.clone(),
            self.config.framing,
            self.config.idle_timeout,
        );

        sessions.spawn(
            async move {
                match session.run().await {
                    Ok(stats) => info!(frames = stats.frames, responses = stats.responses, "device disconnected"),
                    Err(e) => warn!(error = %e, "session closed with error"),
                }
            }
            .instrument(info_span!("session", peer = %peer)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySink;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    fn local_config() -> Config {
        Config {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_heartbeat_round_trip() {
        let sink = Arc::new(MemorySink::new());
        let server = Server::bind(local_config(), sink.clone()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server_handle = tokio::spawn(server.run_until(async {
            let _ = stop_rx.await;
        }));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(&hex::decode("78780A2604000100020001E90D0A").unwrap())
            .await
            .unwrap();

        let mut reply = [0u8; 9];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, crate::protocol::HEARTBEAT_ACK);

        stop_tx.send(()).unwrap();
        server_handle.await.unwrap().unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = Config {
            sink_capacity: 0,
            ..local_config()
        };
        let result = Server::bind(config, Arc::new(MemorySink::new())).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
