//! Error types for RDD
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::client::HandleState;
use crate::protocol::StatusCode;

/// Result type alias using RddError
pub type Result<T> = std::result::Result<T, RddError>;

/// Unified error type for RDD operations
#[derive(Debug, Error)]
pub enum RddError {
    // -------------------------------------------------------------------------
    // Construction Errors
    // -------------------------------------------------------------------------
    #[error("A transport must be supplied to construct a DeviceDriverClient")]
    MissingTransport,

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Encoding Errors
    // -------------------------------------------------------------------------
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Decoding Errors
    // -------------------------------------------------------------------------
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    // -------------------------------------------------------------------------
    // Remote Outcomes
    // -------------------------------------------------------------------------
    #[error("Device error {}: {}", .0.name, .0.message)]
    Device(StatusCode),

    #[error("Request timed out waiting for a device response")]
    Timeout,

    #[error("Request was cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // Client State Errors
    // -------------------------------------------------------------------------
    #[error("Handle {handle} is {state:?}, expected Open")]
    InvalidState { handle: u16, state: HandleState },

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Transport(String),
}

impl RddError {
    /// The status code a POSIX-style caller would see for this error.
    ///
    /// Errors that never reach the wire (bad config, encoding limits) have
    /// no status of their own.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RddError::Device(code) => Some(*code),
            RddError::Timeout => Some(StatusCode::ETIMEDOUT),
            RddError::Cancelled => Some(StatusCode::ECANCELED),
            RddError::InvalidState { .. } => Some(StatusCode::EBADF),
            RddError::PayloadTooLarge { .. } => Some(StatusCode::EMSGSIZE),
            RddError::MalformedResponse(_) | RddError::MalformedQuery(_) => {
                Some(StatusCode::EPROTO)
            }
            RddError::Transport(_) => Some(StatusCode::ECOMM),
            _ => None,
        }
    }
}
