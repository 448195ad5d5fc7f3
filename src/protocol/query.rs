//! Query definitions
//!
//! Represents requests sent to the remote device driver.

use super::ActionCode;

/// A device query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceQuery {
    /// Open a device unit by name
    Open { flags: u16, unit_name: String },

    /// Read `count` bytes from `register` of an open handle
    Read { handle: u16, register: i16, count: u16 },

    /// Write `data` to `register` of an open handle
    Write {
        handle: u16,
        register: i16,
        data: Vec<u8>,
    },

    /// Release an open handle
    Close { handle: u16 },
}

impl DeviceQuery {
    /// Build an OPEN query
    pub fn open(unit_name: impl Into<String>, flags: u16) -> Self {
        DeviceQuery::Open {
            flags,
            unit_name: unit_name.into(),
        }
    }

    /// Get the action code
    pub fn action(&self) -> ActionCode {
        match self {
            DeviceQuery::Open { .. } => ActionCode::Open,
            DeviceQuery::Read { .. } => ActionCode::Read,
            DeviceQuery::Write { .. } => ActionCode::Write,
            DeviceQuery::Close { .. } => ActionCode::Close,
        }
    }

    /// The handle this query addresses (None for OPEN)
    pub fn handle(&self) -> Option<u16> {
        match self {
            DeviceQuery::Open { .. } => None,
            DeviceQuery::Read { handle, .. }
            | DeviceQuery::Write { handle, .. }
            | DeviceQuery::Close { handle } => Some(*handle),
        }
    }
}
