//! Utility module
//!
//! This module provides common utilities and helper functions used
//! throughout the library.

/// Expands packed binary-coded decimal into its digit string.
///
/// Each byte yields its high nibble then its low nibble as decimal
/// numbers. A nibble above 9 is not valid BCD; it is written out as its
/// two-digit value (0xA becomes "10") instead of being rejected.
pub fn bcd_digits(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        for nibble in [b >> 4, b & 0x0F] {
            out.push_str(&nibble.to_string());
        }
    }
    out
}

/// Drops leading '0' characters from a digit string
pub fn strip_leading_zeros(digits: &str) -> &str {
    digits.trim_start_matches('0')
}
