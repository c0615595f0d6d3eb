//! CRC-16/CCITT checksum used to stamp and verify GT06 frames
//!
//! Polynomial 0x1021, initial register 0x0000, no reflection, no final XOR.

/// Generator polynomial
pub const POLYNOMIAL: u16 = 0x1021;

/// Computes the checksum over `bytes[start..end]`.
///
/// Callers pass exactly the range the checksum covers: length byte,
/// protocol number and content, never markers or the checksum field.
/// A range that falls outside `bytes` is clamped to the buffer, and an
/// empty range yields 0.
pub fn compute_crc(bytes: &[u8], start: usize, end: usize) -> u16 {
    let end = end.min(bytes.len());
    let start = start.min(end);
    crc16(&bytes[start..end])
}

/// Computes the checksum over a whole slice
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Standard check input for this CRC parameter set
        assert_eq!(crc16(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_empty_range_is_zero() {
        let bytes = [0x78, 0x78, 0x05, 0x01];
        assert_eq!(compute_crc(&bytes, 2, 2), 0);
        assert_eq!(compute_crc(&[], 0, 0), 0);
    }

    #[test]
    fn test_range_selection() {
        let frame = [0x78, 0x78, 0x05, 0x01, 0x00, 0x01, 0x00, 0x00, 0x0D, 0x0A];
        assert_eq!(compute_crc(&frame, 2, 6), crc16(&[0x05, 0x01, 0x00, 0x01]));
        assert_eq!(compute_crc(&frame, 2, 6), 0x9B54);
    }

    #[test]
    fn test_deterministic() {
        let data = [0x0D, 0x01, 0x03, 0x91, 0x60, 0x80];
        assert_eq!(compute_crc(&data, 0, 6), compute_crc(&data, 0, 6));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let data = [0x05, 0x01];
        assert_eq!(compute_crc(&data, 0, 10), crc16(&data));
        assert_eq!(compute_crc(&data, 5, 10), 0);
    }
}
