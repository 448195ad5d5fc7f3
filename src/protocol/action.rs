//! Action codes
//!
//! The leading discriminator byte of every device query.

use std::fmt;

use crate::error::{RddError, Result};

/// Device operation requested by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionCode {
    Open = 0,
    Read = 1,
    Write = 2,
    Close = 3,
}

impl ActionCode {
    pub const ALL: [ActionCode; 4] = [
        ActionCode::Open,
        ActionCode::Read,
        ActionCode::Write,
        ActionCode::Close,
    ];

    /// Look up an action by its symbolic name ("OPEN", "READ", ...)
    pub fn lookup(name: &str) -> Result<u8> {
        Self::ALL
            .iter()
            .find(|action| action.name() == name)
            .map(|action| *action as u8)
            .ok_or_else(|| RddError::UnknownAction(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionCode::Open => "OPEN",
            ActionCode::Read => "READ",
            ActionCode::Write => "WRITE",
            ActionCode::Close => "CLOSE",
        }
    }
}

impl TryFrom<u8> for ActionCode {
    type Error = RddError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(ActionCode::Open),
            1 => Ok(ActionCode::Read),
            2 => Ok(ActionCode::Write),
            3 => Ok(ActionCode::Close),
            _ => Err(RddError::UnknownAction(format!("0x{:02x}", byte))),
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
