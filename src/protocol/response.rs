//! Acknowledgment policy
//!
//! Devices drop the session unless login and heartbeat messages are
//! acknowledged. Login acks echo the serial number of the login frame and
//! carry a checksum over their own content; heartbeat acks are a fixed frame.

use bytes::Bytes;
use tracing::warn;

use crate::core::{END_MARKER, START_MARKER};
use super::crc::compute_crc;
use super::message::{DecodedMessage, MessageType};

/// Length byte of a login acknowledgment
pub const ACK_LENGTH: u8 = 0x05;

/// Protocol number of a login acknowledgment
pub const LOGIN_PROTOCOL: u8 = 0x01;

/// Literal heartbeat acknowledgment (`7878051300019D0D0A`)
pub const HEARTBEAT_ACK: [u8; 9] = [0x78, 0x78, 0x05, 0x13, 0x00, 0x01, 0x9D, 0x0D, 0x0A];

/// Distance from the end of a frame to the first serial byte
const SERIAL_FROM_END: usize = 6;

/// Ten-byte acknowledgment frame echoing a device serial number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Protocol number being acknowledged
    pub protocol_number: u8,
    /// Serial copied from the triggering frame
    pub serial: [u8; 2],
}

impl ResponseFrame {
    /// Wire size of an encoded frame
    pub const LEN: usize = 10;

    /// Serializes the frame, stamping the checksum over bytes [2, 6)
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [
            START_MARKER[0],
            START_MARKER[1],
            ACK_LENGTH,
            self.protocol_number,
            self.serial[0],
            self.serial[1],
            0x00,
            0x00,
            END_MARKER[0],
            END_MARKER[1],
        ];
        let crc = compute_crc(&out, 2, 6);
        out[6..8].copy_from_slice(&crc.to_be_bytes());
        out
    }
}

/// Bytes to write back to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Serial-correlated login acknowledgment
    LoginAck(ResponseFrame),
    /// Fixed heartbeat acknowledgment
    HeartbeatAck,
}

impl Response {
    /// Wire bytes of the response
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Response::LoginAck(frame) => Bytes::copy_from_slice(&frame.encode()),
            Response::HeartbeatAck => Bytes::from_static(&HEARTBEAT_ACK),
        }
    }
}

/// Decides whether a decoded message gets a reply, and what it is
pub fn build_response(decoded: &DecodedMessage, original: &[u8]) -> Option<Response> {
    match decoded.message_type() {
        MessageType::Login => match login_serial(original) {
            Some(serial) => Some(Response::LoginAck(ResponseFrame {
                protocol_number: LOGIN_PROTOCOL,
                serial,
            })),
            None => {
                warn!(length = original.len(), "login frame too short to carry a serial, not acknowledging");
                None
            }
        },
        MessageType::Heartbeat => Some(Response::HeartbeatAck),
        MessageType::Gps | MessageType::Status | MessageType::Alarm | MessageType::Unknown => None,
    }
}

/// Serial number sitting just before the checksum and end marker
fn login_serial(frame: &[u8]) -> Option<[u8; 2]> {
    let start = frame.len().checked_sub(SERIAL_FROM_END)?;
    let bytes = frame.get(start..start + 2)?;
    Some([bytes[0], bytes[1]])
}
