//! Pending requests
//!
//! The wire format carries no correlation token, so a client has a single
//! in-flight slot. A submitter waits for the slot to free, claims it, and
//! gets a [`PendingRequest`] whose reply channel the response handler
//! fills. A response or a timeout frees the slot and wakes the next
//! submitter. A cancelled request keeps the slot until its own response
//! has been swallowed (or its deadline passes), since responses arrive
//! in request order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};

use super::handles::{HandleState, HandleTable};
use crate::error::{RddError, Result};
use crate::protocol::{ActionCode, DeviceResponse};

/// The request currently on the wire
struct InFlight {
    id: u64,
    action: ActionCode,
    deadline: Instant,

    /// None once the request is cancelled: the slot stays claimed until
    /// its response is swallowed or its deadline passes
    reply: Option<Sender<DeviceResponse>>,
}

impl InFlight {
    fn is_draining(&self) -> bool {
        self.reply.is_none()
    }
}

/// Single in-flight slot shared by a client and its response handler
pub(crate) struct RequestSlot {
    current: Mutex<Option<InFlight>>,
    freed: Condvar,
    next_id: AtomicU64,
}

impl RequestSlot {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(None),
            freed: Condvar::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Wait until the slot is free, then claim it for `action`
    ///
    /// A cancelled request still holds the slot until its response has
    /// been discarded or its own deadline passes. Fails with `Timeout` if
    /// the slot is still busy at `deadline`.
    fn acquire(&self, action: ActionCode, deadline: Instant) -> Result<(u64, Receiver<DeviceResponse>)> {
        let mut current = self.current.lock();
        loop {
            let now = Instant::now();
            let held = current.as_ref().map(|f| (f.id, f.is_draining(), f.deadline));
            let wake = match held {
                None => break,
                Some((id, true, drain_deadline)) if drain_deadline <= now => {
                    tracing::debug!("Cancelled request {} got no response; freeing slot", id);
                    *current = None;
                    break;
                }
                Some((_, true, drain_deadline)) => drain_deadline.min(deadline),
                Some((_, false, _)) => deadline,
            };
            if now >= deadline {
                return Err(RddError::Timeout);
            }
            self.freed.wait_until(&mut current, wake);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, rx) = channel::bounded(1);
        *current = Some(InFlight {
            id,
            action,
            deadline,
            reply: Some(reply),
        });
        Ok((id, rx))
    }

    /// Free the slot if request `id` still holds it
    fn release(&self, id: u64) -> bool {
        let mut current = self.current.lock();
        if current.as_ref().map(|f| f.id) != Some(id) {
            return false;
        }
        *current = None;
        drop(current);
        self.freed.notify_all();
        true
    }

    /// Cancel request `id` after its query went out
    ///
    /// Its response is still coming, so the slot drains instead of
    /// freeing: the next matching response is discarded. Past the
    /// request's deadline nothing is expected and the slot frees now.
    fn abandon(&self, id: u64) {
        let mut current = self.current.lock();
        let expired = match current.as_mut() {
            Some(f) if f.id == id => {
                if f.deadline <= Instant::now() {
                    true
                } else {
                    f.reply = None;
                    false
                }
            }
            _ => return,
        };
        if expired {
            *current = None;
            drop(current);
            self.freed.notify_all();
        }
    }

    /// Hand a decoded response to the in-flight request
    ///
    /// Runs on the transport's delivery thread and never blocks on the
    /// waiter. Returns false if the response was discarded.
    pub(crate) fn complete(&self, response: DeviceResponse) -> bool {
        let mut current = self.current.lock();
        let expected = match current.as_ref() {
            Some(f) => f.action,
            None => {
                tracing::debug!(
                    "Discarding response for action {} with no request in flight",
                    response.action
                );
                return false;
            }
        };
        if expected as u8 != response.action {
            tracing::warn!(
                "Discarding response for action {} while {} is in flight",
                response.action,
                expected
            );
            return false;
        }
        let in_flight = current.take();
        drop(current);
        self.freed.notify_all();

        match in_flight.and_then(|f| f.reply) {
            Some(reply) => {
                // Capacity 1 and one send per request; a full or closed
                // channel means the waiter already gave up.
                let _ = reply.try_send(response);
                true
            }
            None => {
                tracing::debug!(
                    "Discarding late {} response for a cancelled request",
                    expected
                );
                false
            }
        }
    }

    /// Whether the slot is claimed (including by a draining cancellation)
    pub(crate) fn is_busy(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(f) if f.is_draining() => f.deadline > Instant::now(),
            Some(_) => true,
            None => false,
        }
    }
}

/// A request that has been sent and is awaiting its response
///
/// Dropping it without calling [`wait`](Self::wait) cancels it.
pub struct PendingRequest {
    id: u64,
    action: ActionCode,
    handle: Option<u16>,
    deadline: Instant,
    reply: Receiver<DeviceResponse>,
    slot: Arc<RequestSlot>,
    handles: Arc<HandleTable>,

    /// Whether `handle` was moved into an awaiting state by this request
    claimed: bool,

    /// Whether the query reached the transport (a response is expected)
    sent: bool,
    finished: bool,
}

impl PendingRequest {
    /// Claim the client's slot for a new request
    pub(crate) fn acquire(
        slot: Arc<RequestSlot>,
        handles: Arc<HandleTable>,
        action: ActionCode,
        handle: Option<u16>,
        timeout: Duration,
    ) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        let (id, reply) = slot.acquire(action, deadline)?;

        let mut pending = Self {
            id,
            action,
            handle,
            deadline,
            reply,
            slot,
            handles,
            claimed: false,
            sent: false,
            finished: false,
        };

        // On failure `pending` drops here and frees the slot
        if let Some(handle) = handle {
            pending.handles.begin(handle, pending.state())?;
            pending.claimed = true;
        }
        Ok(pending)
    }

    /// Record that the query went out; cancelling now drains the slot
    pub(crate) fn mark_sent(&mut self) {
        self.sent = true;
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn action(&self) -> ActionCode {
        self.action
    }

    /// Handle addressed by this request (None for OPEN)
    pub fn handle(&self) -> Option<u16> {
        self.handle
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The awaiting state this request represents
    pub fn state(&self) -> HandleState {
        match self.action {
            ActionCode::Open => HandleState::AwaitingOpenResponse,
            ActionCode::Read | ActionCode::Write => HandleState::AwaitingOperationResponse,
            ActionCode::Close => HandleState::AwaitingCloseResponse,
        }
    }

    /// Block until the response arrives or the deadline passes
    ///
    /// Returns the raw response whatever its status; the handle table is
    /// updated to match. On expiry the handle becomes `Errored` and the
    /// call fails with `Timeout`.
    pub fn wait(mut self) -> Result<DeviceResponse> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        let received = match self.reply.recv_timeout(remaining) {
            Ok(response) => Ok(response),
            // The handler may have filled the channel just as we timed out
            Err(RecvTimeoutError::Timeout) => self.reply.try_recv().map_err(|_| RddError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(RddError::Cancelled),
        };
        self.slot.release(self.id);
        self.finished = true;

        match &received {
            Ok(response) => self.apply_response(response),
            Err(RddError::Timeout) => {
                tracing::warn!("{} request {} timed out", self.action, self.id);
                if let Some(handle) = self.handle {
                    self.handles.set(handle, HandleState::Errored);
                }
            }
            Err(_) => self.restore_handle(),
        }
        received
    }

    /// Abandon the request; its late response is discarded
    ///
    /// The slot stays claimed until that response arrives or the
    /// request's deadline passes, so it cannot reach the next request.
    pub fn cancel(self) {
        tracing::debug!("Cancelling {} request {}", self.action, self.id);
        // Drop does the work
    }

    fn apply_response(&self, response: &DeviceResponse) {
        match self.action {
            ActionCode::Open => {
                if response.is_success() {
                    self.handles.set(response.handle, HandleState::Open);
                }
            }
            ActionCode::Read | ActionCode::Write => self.restore_handle(),
            ActionCode::Close => {
                if let Some(handle) = self.handle {
                    let state = if response.is_success() {
                        HandleState::Closed
                    } else {
                        HandleState::Open
                    };
                    self.handles.set(handle, state);
                }
            }
        }
    }

    /// Put a claimed handle back to `Open`
    fn restore_handle(&self) {
        if let (true, Some(handle)) = (self.claimed, self.handle) {
            self.handles.set(handle, HandleState::Open);
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if !self.finished {
            if self.sent {
                self.slot.abandon(self.id);
            } else {
                self.slot.release(self.id);
            }
            self.restore_handle();
        }
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("action", &self.action)
            .field("handle", &self.handle)
            .field("deadline", &self.deadline)
            .finish()
    }
}
