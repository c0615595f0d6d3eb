use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::core::{Error, FramingMode, FRAME_OVERHEAD, START_MARKER};
use super::response::Response;

/// Stream codec cutting TCP bytes into GT06 frames and writing acknowledgments
#[derive(Debug, Clone, Copy, Default)]
pub struct Gt06Codec {
    /// Frame delimitation strategy
    mode: FramingMode,
}

impl Gt06Codec {
    /// Creates a new codec
    pub fn new(mode: FramingMode) -> Self {
        Gt06Codec { mode }
    }

    /// Returns the framing strategy in use
    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    fn decode_length_prefixed(&mut self, src: &mut BytesMut) -> Option<BytesMut> {
        // Resynchronize on the next start marker
        match src.windows(2).position(|w| w == START_MARKER) {
            Some(0) => {}
            Some(skip) => {
                warn!(skipped = skip, "discarding bytes before frame start marker");
                src.advance(skip);
            }
            None => {
                // Keep a trailing 0x78 that may begin the next marker
                let keep = usize::from(src.last() == Some(&START_MARKER[0]));
                let skip = src.len() - keep;
                if skip > 0 {
                    warn!(skipped = skip, "discarding bytes without frame start marker");
                    src.advance(skip);
                }
                return None;
            }
        }

        // Need the length byte
        if src.len() < 3 {
            return None;
        }

        let frame_len = src[2] as usize + FRAME_OVERHEAD;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return None;
        }

        Some(src.split_to(frame_len))
    }
}

impl Decoder for Gt06Codec {
    type Item = BytesMut;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        match self.mode {
            FramingMode::Delivery => Ok(Some(src.split())),
            FramingMode::LengthPrefixed => Ok(self.decode_length_prefixed(src)),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !buf.is_empty() {
                    debug!(remaining = buf.len(), "dropping partial frame at end of stream");
                    buf.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Response> for Gt06Codec {
    type Error = Error;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.to_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::response::{ResponseFrame, HEARTBEAT_ACK};

    /// Well-formed heartbeat frame (length byte matches buffer size)
    const HEARTBEAT: [u8; 15] = [
        0x78, 0x78, 0x0A, 0x26, 0x04, 0x00, 0x01, 0x00, 0x02, 0x00, 0x01, 0x12, 0x34, 0x0D, 0x0A,
    ];

    #[test]
    fn test_delivery_mode_yields_each_read() {
        let mut codec = Gt06Codec::new(FramingMode::Delivery);
        assert_eq!(codec.mode(), FramingMode::Delivery);
        let mut bytes = BytesMut::from(&[0x01, 0x02, 0x03][..]);

        let frame = codec.decode(&mut bytes).unwrap().unwrap();
        assert_eq!(&frame[..], &[0x01, 0x02, 0x03]);
        assert!(bytes.is_empty());
        assert!(codec.decode(&mut bytes).unwrap().is_none());
    }

    #[test]
    fn test_length_prefixed_waits_for_whole_frame() {
        let mut codec = Gt06Codec::new(FramingMode::LengthPrefixed);
        let mut bytes = BytesMut::from(&HEARTBEAT[..7]);
        assert!(codec.decode(&mut bytes).unwrap().is_none());

        bytes.extend_from_slice(&HEARTBEAT[7..]);
        let frame = codec.decode(&mut bytes).unwrap().unwrap();
        assert_eq!(&frame[..], &HEARTBEAT[..]);
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_length_prefixed_splits_coalesced_frames() {
        let mut codec = Gt06Codec::new(FramingMode::LengthPrefixed);
        let mut bytes = BytesMut::new();
        bytes.extend_from_slice(&HEARTBEAT);
        bytes.extend_from_slice(&HEARTBEAT);
        bytes.extend_from_slice(&HEARTBEAT[..4]);

        assert_eq!(&codec.decode(&mut bytes).unwrap().unwrap()[..], &HEARTBEAT[..]);
        assert_eq!(&codec.decode(&mut bytes).unwrap().unwrap()[..], &HEARTBEAT[..]);
        assert!(codec.decode(&mut bytes).unwrap().is_none());
        assert_eq!(bytes.len(), 4);
    }

    #[test]
    fn test_length_prefixed_skips_garbage() {
        let mut codec = Gt06Codec::new(FramingMode::LengthPrefixed);
        let mut bytes = BytesMut::from(&[0xAA, 0xBB, 0x78][..]);
        assert!(codec.decode(&mut bytes).unwrap().is_none());
        // Trailing 0x78 is kept as a possible marker start
        assert_eq!(&bytes[..], &[0x78]);

        bytes.extend_from_slice(&HEARTBEAT[1..]);
        assert_eq!(&codec.decode(&mut bytes).unwrap().unwrap()[..], &HEARTBEAT[..]);
    }

    #[test]
    fn test_partial_frame_dropped_at_eof() {
        let mut codec = Gt06Codec::new(FramingMode::LengthPrefixed);
        let mut bytes = BytesMut::from(&HEARTBEAT[..5]);
        assert!(codec.decode_eof(&mut bytes).unwrap().is_none());
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_encode_responses() {
        let mut codec = Gt06Codec::default();
        assert_eq!(codec.mode(), FramingMode::Delivery);
        let mut bytes = BytesMut::new();

        codec.encode(Response::HeartbeatAck, &mut bytes).unwrap();
        assert_eq!(&bytes[..], &HEARTBEAT_ACK[..]);

        bytes.clear();
        let frame = ResponseFrame { protocol_number: 0x01, serial: [0x00, 0x01] };
        codec.encode(Response::LoginAck(frame), &mut bytes).unwrap();
        assert_eq!(&bytes[..], &frame.encode()[..]);
    }
}
