use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use super::decoder::DecodeError;

/// GT06 message categories recognized by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Device login carrying its IMEI
    Login,
    /// Location report
    Gps,
    /// Status report
    Status,
    /// Alarm report
    Alarm,
    /// Keep-alive
    Heartbeat,
    /// Anything not in the type table
    Unknown,
}

impl MessageType {
    /// Lowercase name used in the packet log
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Login => "login",
            MessageType::Gps => "gps",
            MessageType::Status => "status",
            MessageType::Alarm => "alarm",
            MessageType::Heartbeat => "heartbeat",
            MessageType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol numbers every deployment understands
pub const BASELINE_TYPES: [(u8, MessageType); 5] = [
    (0x01, MessageType::Login),
    (0x12, MessageType::Gps),
    (0x13, MessageType::Status),
    (0x16, MessageType::Alarm),
    (0x26, MessageType::Heartbeat),
];

/// Protocol number some devices use for location reports in place of 0x12
pub const EXTENDED_GPS_TYPE: u8 = 0x22;

/// Closed lookup from protocol number to message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTable {
    entries: Vec<(u8, MessageType)>,
}

impl TypeTable {
    /// The five-entry table
    pub fn baseline() -> Self {
        TypeTable {
            entries: BASELINE_TYPES.to_vec(),
        }
    }

    /// Baseline plus 0x22 as GPS
    pub fn extended() -> Self {
        let mut table = Self::baseline();
        table.entries.push((EXTENDED_GPS_TYPE, MessageType::Gps));
        table
    }

    /// Maps a protocol number, falling back to Unknown
    pub fn lookup(&self, protocol_number: u8) -> MessageType {
        self.entries
            .iter()
            .find(|(number, _)| *number == protocol_number)
            .map(|(_, kind)| *kind)
            .unwrap_or(MessageType::Unknown)
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Calendar fields as sent by the device, with no range checks applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTime {
    /// Full year (2000 + the two-digit year byte)
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DeviceTime {
    /// Interprets the fields as a real timestamp, if they form one
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
    }
}

impl fmt::Display for DeviceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Decoded login content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginPayload {
    /// Device IMEI with leading zeros stripped
    pub imei: String,
}

/// Decoded location content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsPayload {
    /// Device-reported fix time
    #[serde(serialize_with = "crate::core::serde::serialize_display")]
    pub datetime: DeviceTime,
    /// Raw value / 1,800,000, no hemisphere applied
    pub latitude: f64,
    /// Raw value / 1,800,000, no hemisphere applied
    pub longitude: f64,
    /// km/h
    pub speed: u8,
    /// Course and status bit-field, undecoded
    #[serde(rename = "courseStatus")]
    pub course_status: u16,
}

/// Type-specific content of a decoded message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Login(LoginPayload),
    Gps(GpsPayload),
}

/// One decoded inbound delivery, as handed to the packet log and the response policy.
///
/// Serializes to the packet log's JSON shape: `raw`, `type`, `length`,
/// `timestamp`, the payload fields inlined, and `error` plus `message` when
/// decoding failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    #[serde(rename = "raw")]
    raw_hex: String,
    #[serde(rename = "type")]
    message_type: MessageType,
    length: usize,
    #[serde(rename = "timestamp")]
    received_at: DateTime<Utc>,
    #[serde(flatten)]
    payload: Option<Payload>,
    #[serde(flatten)]
    failure: Option<DecodeFailure>,
}

/// Decode failure as written to the packet log: a summary under `error` and
/// the specific cause under `message`
#[derive(Debug, Clone, PartialEq, Serialize)]
struct DecodeFailure {
    #[serde(rename = "error")]
    summary: &'static str,
    #[serde(rename = "message", serialize_with = "crate::core::serde::serialize_display")]
    cause: DecodeError,
}

impl DecodeFailure {
    fn new(message_type: MessageType, cause: DecodeError) -> Self {
        let summary = match (cause.is_framing(), message_type) {
            (false, MessageType::Gps) => "Failed to parse GPS packet",
            (false, MessageType::Login) => "Failed to parse login packet",
            _ => "Invalid GT06 frame",
        };
        DecodeFailure { summary, cause }
    }
}

impl DecodedMessage {
    pub(crate) fn new(
        buffer: &[u8],
        message_type: MessageType,
        received_at: DateTime<Utc>,
        payload: Option<Payload>,
        decode_error: Option<DecodeError>,
    ) -> Self {
        DecodedMessage {
            raw_hex: hex::encode(buffer),
            message_type,
            length: buffer.len(),
            received_at,
            payload,
            failure: decode_error.map(|cause| DecodeFailure::new(message_type, cause)),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Whole input buffer as lowercase hex
    pub fn raw_hex(&self) -> &str {
        &self.raw_hex
    }

    /// Input buffer size in bytes
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn login(&self) -> Option<&LoginPayload> {
        match &self.payload {
            Some(Payload::Login(login)) => Some(login),
            _ => None,
        }
    }

    pub fn gps(&self) -> Option<&GpsPayload> {
        match &self.payload {
            Some(Payload::Gps(gps)) => Some(gps),
            _ => None,
        }
    }

    pub fn decode_error(&self) -> Option<&DecodeError> {
        self.failure.as_ref().map(|failure| &failure.cause)
    }
}
