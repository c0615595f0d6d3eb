//! GT06 frame decoding
//!
//! Turns one inbound buffer into a [`DecodedMessage`]. Decoding never fails
//! outright: every problem is captured in the message's `decode_error` and
//! whatever could be classified is still reported.
//!
//! ## Short frame layout
//! ```text
//! [0x78 0x78] [Length(1)] [Protocol(1)] [Content(N)] [Serial(2)] [CRC(2)] [0x0D 0x0A]
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::{Config, END_MARKER, FRAME_OVERHEAD, START_MARKER};
use crate::util::{bcd_digits, strip_leading_zeros};
use super::crc::compute_crc;
use super::message::{
    DecodedMessage, DeviceTime, GpsPayload, LoginPayload, MessageType, Payload, TypeTable,
};

/// Buffers shorter than this are never classified
pub const MIN_CLASSIFIABLE_LEN: usize = 2;

/// Offset of the protocol-number byte
pub const PROTOCOL_NUMBER_OFFSET: usize = 3;

/// Offset where type-specific content starts
pub const CONTENT_OFFSET: usize = 4;

/// Packed BCD bytes carrying the IMEI
pub const IMEI_LEN: usize = 8;

/// Smallest frame that carries a protocol number, serial and checksum
pub const MIN_FRAME_LEN: usize = 10;

const GPS_LATITUDE_OFFSET: usize = 10;
const GPS_LONGITUDE_OFFSET: usize = 14;
const GPS_SPEED_OFFSET: usize = 18;
const GPS_COURSE_OFFSET: usize = 19;

/// Raw coordinate units per degree
pub const COORDINATE_SCALE: f64 = 1_800_000.0;

/// Why a buffer could not be fully decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short for {field}: need {needed} bytes, have {actual}")]
    TooShort {
        field: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("missing 0x7878 start marker")]
    BadStartMarker,

    #[error("missing 0x0d0a end marker")]
    BadEndMarker,

    #[error("length byte implies a {declared}-byte frame, got {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("checksum mismatch: frame carries {actual:#06x}, computed {expected:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },
}

impl DecodeError {
    /// True when the frame envelope is at fault rather than its content
    pub fn is_framing(&self) -> bool {
        !matches!(self, DecodeError::TooShort { field, .. } if *field != "frame")
    }
}

/// Decodes buffers against a type table, optionally validating frame structure
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    /// Protocol number lookup
    table: TypeTable,
    /// Check markers, length byte and checksum
    strict: bool,
}

impl FrameDecoder {
    /// Creates a decoder
    pub fn new(table: TypeTable, strict: bool) -> Self {
        FrameDecoder { table, strict }
    }

    /// Creates a decoder matching the server configuration
    pub fn from_config(config: &Config) -> Self {
        let table = if config.extended_gps {
            TypeTable::extended()
        } else {
            TypeTable::baseline()
        };
        FrameDecoder::new(table, config.strict_frames)
    }

    /// Decodes a buffer, stamping it with the current wall-clock time
    pub fn decode(&self, buffer: &[u8]) -> DecodedMessage {
        self.decode_at(buffer, Utc::now())
    }

    /// Decodes a buffer with a caller-supplied receive time
    pub fn decode_at(&self, buffer: &[u8], received_at: DateTime<Utc>) -> DecodedMessage {
        if buffer.len() < MIN_CLASSIFIABLE_LEN {
            return DecodedMessage::new(buffer, MessageType::Unknown, received_at, None, None);
        }

        // Classification only looks at the protocol-number byte
        let message_type = buffer
            .get(PROTOCOL_NUMBER_OFFSET)
            .map(|&number| self.table.lookup(number))
            .unwrap_or(MessageType::Unknown);

        let mut error = if self.strict {
            validate_frame(buffer).err()
        } else {
            None
        };

        let decoded = match message_type {
            MessageType::Login => Some(decode_login(buffer).map(Payload::Login)),
            MessageType::Gps => Some(decode_gps(buffer).map(Payload::Gps)),
            _ => None,
        };

        let payload = match decoded {
            Some(Ok(payload)) => Some(payload),
            Some(Err(e)) => {
                error.get_or_insert(e);
                None
            }
            None => None,
        };

        DecodedMessage::new(buffer, message_type, received_at, payload, error)
    }
}

/// Decodes with the baseline type table and no structural validation
pub fn decode(buffer: &[u8]) -> DecodedMessage {
    FrameDecoder::default().decode(buffer)
}

/// Checks markers, length byte and checksum of a complete frame
pub fn validate_frame(buffer: &[u8]) -> Result<(), DecodeError> {
    if !buffer.starts_with(&START_MARKER) {
        return Err(DecodeError::BadStartMarker);
    }
    if buffer.len() < MIN_FRAME_LEN {
        return Err(DecodeError::TooShort {
            field: "frame",
            needed: MIN_FRAME_LEN,
            actual: buffer.len(),
        });
    }
    if !buffer.ends_with(&END_MARKER) {
        return Err(DecodeError::BadEndMarker);
    }

    let declared = buffer[2] as usize + FRAME_OVERHEAD;
    if declared != buffer.len() {
        return Err(DecodeError::LengthMismatch {
            declared,
            actual: buffer.len(),
        });
    }

    let crc_offset = buffer.len() - 4;
    let carried = u16::from_be_bytes([buffer[crc_offset], buffer[crc_offset + 1]]);
    let computed = compute_crc(buffer, 2, crc_offset);
    if carried != computed {
        return Err(DecodeError::ChecksumMismatch {
            expected: computed,
            actual: carried,
        });
    }

    Ok(())
}

fn decode_login(buffer: &[u8]) -> Result<LoginPayload, DecodeError> {
    let fields = FieldReader::new(buffer);
    let bcd = fields.bytes(CONTENT_OFFSET, IMEI_LEN, "imei")?;
    let digits = bcd_digits(bcd);
    Ok(LoginPayload {
        imei: strip_leading_zeros(&digits).to_string(),
    })
}

fn decode_gps(buffer: &[u8]) -> Result<GpsPayload, DecodeError> {
    let fields = FieldReader::new(buffer);
    let date = fields.bytes(CONTENT_OFFSET, 6, "datetime")?;
    let datetime = DeviceTime {
        year: 2000 + date[0] as u16,
        month: date[1],
        day: date[2],
        hour: date[3],
        minute: date[4],
        second: date[5],
    };

    let lat_raw = fields.u32(GPS_LATITUDE_OFFSET, "latitude")?;
    let lng_raw = fields.u32(GPS_LONGITUDE_OFFSET, "longitude")?;
    let speed = fields.u8(GPS_SPEED_OFFSET, "speed")?;
    let course_status = fields.u16(GPS_COURSE_OFFSET, "course_status")?;

    Ok(GpsPayload {
        datetime,
        latitude: lat_raw as f64 / COORDINATE_SCALE,
        longitude: lng_raw as f64 / COORDINATE_SCALE,
        speed,
        course_status,
    })
}

/// Bounds-checked big-endian reads at fixed offsets
struct FieldReader<'a> {
    buffer: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        FieldReader { buffer }
    }

    fn bytes(&self, offset: usize, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        self.buffer
            .get(offset..offset + len)
            .ok_or(DecodeError::TooShort {
                field,
                needed: offset + len,
                actual: self.buffer.len(),
            })
    }

    fn u8(&self, offset: usize, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.bytes(offset, 1, field)?[0])
    }

    fn u16(&self, offset: usize, field: &'static str) -> Result<u16, DecodeError> {
        let b = self.bytes(offset, 2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&self, offset: usize, field: &'static str) -> Result<u32, DecodeError> {
        let b = self.bytes(offset, 4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
