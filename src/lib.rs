//! GT06 server: decoding and acknowledging GPS tracker traffic
//!
//! This library implements the server side of the GT06 binary tracking
//! protocol over TCP. Each device frame is decoded into a structured record,
//! appended to a packet log, and answered when the protocol requires it
//! (login and heartbeat) so the device keeps its session open.
//!
//! # Examples
//!
//! ```
//! use gt06_server::protocol::{build_response, decode, MessageType};
//!
//! let frame = [
//!     0x78, 0x78, 0x0D, 0x01, 0x03, 0x91, 0x60, 0x80, 0x33,
//!     0x60, 0x01, 0x00, 0x01, 0x8C, 0xDD, 0x0D, 0x0A,
//! ];
//! let decoded = decode(&frame);
//! assert_eq!(decoded.message_type(), MessageType::Login);
//! assert_eq!(decoded.login().unwrap().imei, "391608033600100");
//!
//! let ack = build_response(&decoded, &frame).unwrap();
//! assert_eq!(ack.to_bytes().len(), 10);
//! ```

pub mod core;
pub mod network;
pub mod protocol;
pub mod store;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Config, Error, Result};
pub use crate::network::Server;
pub use crate::store::{JsonLinesSink, MemorySink, RecordSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
