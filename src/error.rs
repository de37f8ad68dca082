// ABOUTME: Unified error taxonomy for transport, session, and parsing failures
// ABOUTME: Provides structured error reporting with automatic conversion from I/O and codec errors

use crate::pdu::DecodeError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for modem operations
///
/// Covers the full lifecycle: argument validation before any I/O, transport
/// arbitration (`PortClosed`, `Busy`, `Timeout`), underlying serial failures,
/// and modem- or grammar-level failures surfaced after a response arrived.
#[derive(Debug, Error)]
pub enum SmsError {
    /// Malformed caller input, rejected before any I/O
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// Operation attempted while the serial port is not open
    #[error("Serial port is not open")]
    PortClosed,

    /// Another command is already in flight; callers must serialize
    #[error("Another command is already in flight")]
    Busy,

    /// No response terminator was seen within the deadline
    #[error("Command {command:?} timed out after {timeout:?}")]
    Timeout {
        command: String,
        terminator: u8,
        timeout: Duration,
    },

    /// Underlying serial port error (open failure, write failure)
    #[error("Serial I/O error: {0}")]
    Io(#[from] io::Error),

    /// Well-formed transport response, but `OK` was missing where required;
    /// carries the verbatim response
    #[error("Modem reported failure: {response:?}")]
    Modem { response: String },

    /// Response shape does not match the expected grammar
    #[error("Malformed modem response: {0}")]
    Protocol(String),

    /// PDU codec failure, surfaced from the external codec
    #[error("PDU decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// An initialization command did not confirm with `OK`
    #[error("Initialization command {command:?} failed: {response:?}")]
    InitFailed { command: String, response: String },

    /// A message transmission aborted mid-way; already-sent fragments are
    /// not rolled back
    #[error("Message transmission aborted: {response:?}")]
    SendFailed { response: String },
}

/// Result type alias for modem operations
pub type SmsResult<T> = Result<T, SmsError>;
