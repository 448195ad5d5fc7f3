//! Response definitions
//!
//! Represents responses from the remote device driver.

use super::StatusCode;

/// A decoded device response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResponse {
    /// Action that produced this response (echoed from the query)
    pub action: u8,

    /// Handle assigned by the remote driver (meaningful for OPEN)
    pub handle: u16,

    /// Register echoed from the query
    pub register: i16,

    /// Byte count echoed from the query
    pub requested_byte_count: u16,

    /// Status value; negative is a failure, non-negative is success
    /// (for READ/WRITE it is the number of bytes transferred)
    pub status: i16,

    /// Trailing bytes after the fixed header (READ data)
    pub data: Vec<u8>,
}

impl DeviceResponse {
    /// Create a response with no trailing data
    pub fn new(action: u8, handle: u16, register: i16, requested_byte_count: u16, status: i16) -> Self {
        Self {
            action,
            handle,
            register,
            requested_byte_count,
            status,
            data: Vec::new(),
        }
    }

    /// Attach trailing data
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status >= 0
    }

    /// Resolve the status into its table entry.
    ///
    /// Values missing from the table fall back to `EIO` for failures and
    /// `ESUCCESS` for non-negative counts.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_value(self.status).unwrap_or(if self.status < 0 {
            StatusCode::EIO
        } else {
            StatusCode::ESUCCESS
        })
    }
}
