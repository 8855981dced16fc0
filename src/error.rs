//! Protocol error types
//!
//! Frame-level and decode-level failures are local and non-fatal: the caller
//! drops the offending frame (or rejects the offending input) and the
//! accumulated snapshot is left untouched.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the sysex protocol layer
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A request builder argument is outside the device profile's valid range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A dump payload ended before its declared length
    #[error("truncated payload: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The frame carries a command byte this profile does not define
    #[error("unknown command byte 0x{0:02X}")]
    UnknownCommand(u8),

    /// An input buffer exceeded the configured ceiling before decoding
    #[error("input too large: {size} bytes (limit {limit})")]
    InputTooLarge { size: usize, limit: usize },

    /// The watchdog expired with no batch flushed after a request
    #[error("no response from device after {0:?}")]
    NoResponse(Duration),
}

impl ProtocolError {
    /// True for per-frame decode failures that callers log and skip
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            ProtocolError::Truncated { .. } | ProtocolError::UnknownCommand(_)
        )
    }
}
