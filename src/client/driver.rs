//! Device driver client
//!
//! File-descriptor style access (open/read/write/close) to a device
//! driver running on the remote board.

use std::sync::Arc;
use std::time::Duration;

use super::handles::{HandleState, HandleTable};
use super::pending::{PendingRequest, RequestSlot};
use crate::config::ClientConfig;
use crate::error::{RddError, Result};
use crate::protocol::{decode_response, encode_query, DeviceQuery, DeviceResponse, StatusCode, DEVICE_RESPONSE};
use crate::transport::Transport;

/// Client for a remote DeviceDriver
///
/// ## Concurrency Model: One Request In Flight
///
/// Responses carry no correlation token, so requests are strictly
/// serialized: a second caller blocks in `submit_*` until the first
/// request completes or times out. A cancelled request holds the slot
/// until its response has been discarded or its deadline passes. The
/// response handler runs on the transport's delivery thread and only
/// hands the decoded response over; callers block on their own thread.
pub struct DeviceDriverClient {
    /// Extension channel to the remote board
    transport: Arc<dyn Transport>,

    /// In-flight slot, shared with the response handler
    slot: Arc<RequestSlot>,

    /// Per-handle lifecycle
    handles: Arc<HandleTable>,

    /// Deadline for each request
    request_timeout: Duration,
}

impl DeviceDriverClient {
    /// Create a client and register its response handler on the transport
    ///
    /// Only one client may register per transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = config.transport.clone().ok_or(RddError::MissingTransport)?;

        let slot = Arc::new(RequestSlot::new());
        let handler_slot = Arc::clone(&slot);
        transport.on_extension(
            DEVICE_RESPONSE,
            Box::new(move |payload: &[u8]| handle_response(&handler_slot, payload)),
        )?;

        tracing::debug!(
            "DeviceDriverClient ready (timeout {} ms)",
            config.request_timeout_ms
        );

        Ok(Self {
            transport,
            slot,
            handles: Arc::new(HandleTable::new()),
            request_timeout: config.request_timeout(),
        })
    }

    // =========================================================================
    // Blocking Operations
    // =========================================================================

    /// Open a device unit, returning the handle assigned by the remote driver
    pub fn open(&self, unit_name: &str, flags: u16) -> Result<u16> {
        let response = self.submit_open(unit_name, flags)?.wait()?;
        check_status(&response)?;
        tracing::debug!("Opened '{}' as handle {}", unit_name, response.handle);
        Ok(response.handle)
    }

    /// Read up to `count` bytes from `register` into `buffer`
    ///
    /// The request is clamped to `buffer.len()`. Returns the number of
    /// bytes copied.
    pub fn read(&self, handle: u16, register: i16, count: u16, buffer: &mut [u8]) -> Result<usize> {
        let count = count.min(u16::try_from(buffer.len()).unwrap_or(u16::MAX));
        let response = self.submit_read(handle, register, count)?.wait()?;
        let transferred = check_status(&response)?;

        let n = transferred.min(response.data.len()).min(buffer.len());
        buffer[..n].copy_from_slice(&response.data[..n]);
        Ok(n)
    }

    /// Write up to `count` bytes of `buffer` to `register`
    ///
    /// Returns the byte count reported by the remote driver.
    pub fn write(&self, handle: u16, register: i16, count: u16, buffer: &[u8]) -> Result<usize> {
        let n = (count as usize).min(buffer.len());
        let response = self.submit_write(handle, register, &buffer[..n])?.wait()?;
        check_status(&response)
    }

    /// Close a handle, returning the remote status
    pub fn close(&self, handle: u16) -> Result<StatusCode> {
        let response = self.submit_close(handle)?.wait()?;
        check_status(&response)?;
        Ok(response.status_code())
    }

    // =========================================================================
    // Non-blocking Submission
    // =========================================================================

    /// Send an OPEN query without waiting for the response
    pub fn submit_open(&self, unit_name: &str, flags: u16) -> Result<PendingRequest> {
        self.submit(DeviceQuery::open(unit_name, flags))
    }

    /// Send a READ query without waiting for the response
    pub fn submit_read(&self, handle: u16, register: i16, count: u16) -> Result<PendingRequest> {
        self.submit(DeviceQuery::Read {
            handle,
            register,
            count,
        })
    }

    /// Send a WRITE query without waiting for the response
    pub fn submit_write(&self, handle: u16, register: i16, data: &[u8]) -> Result<PendingRequest> {
        self.submit(DeviceQuery::Write {
            handle,
            register,
            data: data.to_vec(),
        })
    }

    /// Send a CLOSE query without waiting for the response
    pub fn submit_close(&self, handle: u16) -> Result<PendingRequest> {
        self.submit(DeviceQuery::Close { handle })
    }

    /// Encode, claim the in-flight slot, and send
    ///
    /// Encoding errors surface before anything is sent. The slot wait
    /// counts against the request's deadline.
    fn submit(&self, query: DeviceQuery) -> Result<PendingRequest> {
        let message = encode_query(&query)?;

        let mut pending = PendingRequest::acquire(
            Arc::clone(&self.slot),
            Arc::clone(&self.handles),
            query.action(),
            query.handle(),
            self.request_timeout,
        )?;

        let (command, payload) = message
            .split_first()
            .ok_or_else(|| RddError::Transport("empty query message".to_string()))?;

        tracing::debug!(
            "Sending {} query (request {}, handle {:?})",
            query.action(),
            pending.id(),
            query.handle()
        );

        // On failure `pending` drops unsent, freeing the slot and the handle
        self.transport.send_extension(*command, payload)?;
        pending.mark_sent();
        Ok(pending)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Lifecycle state of a handle
    pub fn handle_state(&self, handle: u16) -> HandleState {
        self.handles.state(handle)
    }

    /// Handles currently open
    pub fn open_handles(&self) -> Vec<u16> {
        self.handles.open_handles()
    }

    /// Whether a request is currently awaiting its response
    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Response handler registered for DEVICE_RESPONSE
///
/// Malformed payloads have no caller to report to, so they are logged
/// and dropped.
fn handle_response(slot: &RequestSlot, payload: &[u8]) {
    tracing::trace!("Device response payload: {:02x?}", payload);

    let response = match decode_response(payload) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Dropping malformed device response: {}", e);
            return;
        }
    };

    tracing::debug!(
        "DeviceResponse: action {}, handle {}, register {}, requested byte count {}, status {}",
        response.action,
        response.handle,
        response.register,
        response.requested_byte_count,
        response.status
    );

    slot.complete(response);
}

/// Turn a negative status into an error; otherwise return it as a count
fn check_status(response: &DeviceResponse) -> Result<usize> {
    if response.is_success() {
        Ok(response.status as usize)
    } else {
        Err(RddError::Device(response.status_code()))
    }
}
