//! Device-facing network layer
//!
//! This module accepts device TCP connections and runs one session per
//! connection. Sessions share nothing but the record sink.

mod server;
mod session;

pub use self::server::Server;
pub use self::session::{Session, SessionHandler, SessionStats};
