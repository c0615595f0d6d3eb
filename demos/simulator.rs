//! Device simulator
//!
//! Sends one sample frame of each kind to a running server, each on its own
//! connection, and prints whatever the server answers.
//!
//! ```text
//! GT06_ADDR=127.0.0.1:5023 cargo run --example simulator
//! ```

use std::time::Duration;

use gt06_server::protocol::decode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

const DEFAULT_ADDR: &str = "127.0.0.1:5023";

/// Reports and status frames are never answered
const REPLY_WAIT: Duration = Duration::from_secs(2);

const SAMPLES: [(&str, &str); 5] = [
    ("login", "78780D010391608033600100018CDD0D0A"),
    ("gps", "78781F1212060B0B1C2C0C034D5B890C1E0B0C0004000100000001C6A20D0A"),
    ("status", "78780A1304000100020001D90D0A"),
    ("alarm", "78781F1612060B0B1C2C0C034D5B890C1E0B0C0004000100000001C6A20D0A"),
    ("heartbeat", "78780A2604000100020001E90D0A"),
];

async fn send_frame(addr: &str, frame: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(frame).await?;

    let mut buf = [0u8; 64];
    match timeout(REPLY_WAIT, stream.read(&mut buf)).await {
        Ok(Ok(0)) | Err(_) => Ok(None),
        Ok(Ok(n)) => Ok(Some(buf[..n].to_vec())),
        Ok(Err(e)) => Err(e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let addr = std::env::var("GT06_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

    for (name, frame_hex) in SAMPLES {
        let frame = hex::decode(frame_hex)?;
        info!(kind = name, decoded_as = %decode(&frame).message_type(), "sending {}", frame_hex);

        match send_frame(&addr, &frame).await {
            Ok(Some(reply)) => info!(kind = name, "response: {}", hex::encode(&reply)),
            Ok(None) => info!(kind = name, "no response"),
            Err(e) => warn!(kind = name, error = %e, "send failed"),
        }
    }

    info!("all packets sent");
    Ok(())
}
