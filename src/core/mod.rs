//! Core types and traits for the GT06 server
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Error, Result};
pub use self::types::{Config, FramingMode};

/// Default TCP port devices connect to
pub const DEFAULT_PORT: u16 = 5023;

/// Default path of the JSON-lines packet log
pub const DEFAULT_LOG_FILE: &str = "packets.log.json";

/// Start marker of a short GT06 frame
pub const START_MARKER: [u8; 2] = [0x78, 0x78];

/// End marker of every GT06 frame
pub const END_MARKER: [u8; 2] = [0x0D, 0x0A];

/// Bytes a frame carries beyond what its length byte counts
/// (start marker, length byte itself, end marker)
pub const FRAME_OVERHEAD: usize = 5;
