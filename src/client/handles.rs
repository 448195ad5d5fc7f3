//! Handle state table
//!
//! Tracks each remote handle through open → operate → close.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{RddError, Result};

/// Lifecycle state of a remote handle (or of an open in progress)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Never opened, or the open failed
    Unopened,
    AwaitingOpenResponse,
    Open,
    AwaitingOperationResponse,
    AwaitingCloseResponse,
    Closed,
    /// A request on this handle timed out; no further use is allowed
    Errored,
}

impl HandleState {
    pub fn is_awaiting(&self) -> bool {
        matches!(
            self,
            HandleState::AwaitingOpenResponse
                | HandleState::AwaitingOperationResponse
                | HandleState::AwaitingCloseResponse
        )
    }
}

/// Handle → state map shared between the client and its pending requests
#[derive(Debug, Default)]
pub(crate) struct HandleTable {
    states: Mutex<HashMap<u16, HandleState>>,
}

impl HandleTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current state; handles never seen are `Unopened`
    pub(crate) fn state(&self, handle: u16) -> HandleState {
        self.states
            .lock()
            .get(&handle)
            .copied()
            .unwrap_or(HandleState::Unopened)
    }

    pub(crate) fn set(&self, handle: u16, state: HandleState) {
        tracing::trace!("Handle {} -> {:?}", handle, state);
        self.states.lock().insert(handle, state);
    }

    /// Move an `Open` handle into `awaiting`; anything else is rejected
    pub(crate) fn begin(&self, handle: u16, awaiting: HandleState) -> Result<()> {
        let mut states = self.states.lock();
        let current = states.get(&handle).copied().unwrap_or(HandleState::Unopened);
        if current != HandleState::Open {
            return Err(RddError::InvalidState {
                handle,
                state: current,
            });
        }
        states.insert(handle, awaiting);
        Ok(())
    }

    /// Handles currently in the `Open` state
    pub(crate) fn open_handles(&self) -> Vec<u16> {
        let mut handles: Vec<u16> = self
            .states
            .lock()
            .iter()
            .filter(|(_, state)| **state == HandleState::Open)
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort_unstable();
        handles
    }
}
