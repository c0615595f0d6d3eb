//! Protocol implementation module
//!
//! This module defines the GT06 messages, the checksum, frame decoding,
//! the acknowledgment policy and the stream codec used on device connections.

pub mod codec;
pub mod crc;
pub mod decoder;
pub mod message;
pub mod response;

pub use self::codec::Gt06Codec;
pub use self::crc::compute_crc;
pub use self::decoder::{decode, DecodeError, FrameDecoder};
pub use self::message::{
    DecodedMessage, DeviceTime, GpsPayload, LoginPayload, MessageType, Payload, TypeTable,
};
pub use self::response::{build_response, Response, ResponseFrame, HEARTBEAT_ACK};
