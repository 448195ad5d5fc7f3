//! In-memory transport
//!
//! Records outbound messages and delivers inbound ones on a dedicated
//! delivery thread, the way a serial transport's reader thread would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use super::{ExtensionHandler, Transport};
use crate::error::{RddError, Result};

/// Hook that plays the remote end: given an outbound (command, payload),
/// returns complete inbound messages (command byte first) to deliver
pub type Responder = Box<dyn FnMut(u8, &[u8]) -> Vec<Vec<u8>> + Send + 'static>;

type SharedHandler = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;
type HandlerMap = Arc<Mutex<HashMap<u8, SharedHandler>>>;
type Counter = Arc<AtomicUsize>;

/// A queued inbound message
struct Inbound {
    command: u8,
    payload: Vec<u8>,
}

/// Transport double backed by memory instead of a serial port
pub struct MockTransport {
    /// Registered handlers by command id
    handlers: HandlerMap,

    /// Every message passed to `send_extension`, in order
    sent: Mutex<Vec<(u8, Vec<u8>)>>,

    /// Optional remote-end simulation
    responder: Mutex<Option<Responder>>,

    /// Queue feeding the delivery thread
    inbound: Sender<Inbound>,

    /// Delay applied before each queued delivery
    delay: Arc<Mutex<Duration>>,

    /// When set, sends fail as if the port were gone
    offline: AtomicBool,

    /// Inbound messages dispatched so far
    delivered: Counter,
}

impl MockTransport {
    /// Create a transport and start its delivery thread
    ///
    /// The thread exits once the transport is dropped. Fails if the
    /// thread cannot be spawned.
    pub fn new() -> Result<Self> {
        let handlers: HandlerMap = Arc::new(Mutex::new(HashMap::new()));
        let delay = Arc::new(Mutex::new(Duration::ZERO));
        let delivered: Counter = Arc::new(AtomicUsize::new(0));
        let (inbound, rx) = channel::unbounded();

        let thread_handlers = Arc::clone(&handlers);
        let thread_delay = Arc::clone(&delay);
        let thread_delivered = Arc::clone(&delivered);
        thread::Builder::new()
            .name("mock-transport-delivery".to_string())
            .spawn(move || delivery_loop(rx, thread_handlers, thread_delay, thread_delivered))
            .map_err(|e| RddError::Transport(format!("failed to start delivery thread: {}", e)))?;

        Ok(Self {
            handlers,
            sent: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
            inbound,
            delay,
            offline: AtomicBool::new(false),
            delivered,
        })
    }

    /// Install a responder that answers outbound messages
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(u8, &[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        *self.responder.lock() = Some(Box::new(responder));
    }

    /// Delay every queued delivery by `delay`
    pub fn set_response_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Make subsequent sends fail (or succeed again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Queue a complete inbound message for the delivery thread
    pub fn deliver(&self, message: &[u8]) {
        if let Some((&command, payload)) = message.split_first() {
            let queued = self.inbound.send(Inbound {
                command,
                payload: payload.to_vec(),
            });
            if queued.is_err() {
                tracing::error!(
                    "Delivery thread has stopped; dropping inbound 0x{:02x}",
                    command
                );
            }
        }
    }

    /// Dispatch a complete inbound message on the calling thread
    pub fn deliver_now(&self, message: &[u8]) {
        if let Some((&command, payload)) = message.split_first() {
            dispatch(&self.handlers, &self.delivered, command, payload);
        }
    }

    /// Messages sent so far
    pub fn sent(&self) -> Vec<(u8, Vec<u8>)> {
        self.sent.lock().clone()
    }

    /// Number of messages sent so far
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Number of inbound messages dispatched so far
    ///
    /// Counted as each dispatch starts, before the handler runs.
    pub fn delivered_count(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Whether a handler is registered for `command`
    pub fn has_handler(&self, command: u8) -> bool {
        self.handlers.lock().contains_key(&command)
    }
}

impl Transport for MockTransport {
    fn send_extension(&self, command: u8, payload: &[u8]) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RddError::Transport("transport is offline".to_string()));
        }

        tracing::trace!("Mock send 0x{:02x}: {} bytes", command, payload.len());
        self.sent.lock().push((command, payload.to_vec()));

        let replies = match self.responder.lock().as_mut() {
            Some(responder) => responder(command, payload),
            None => Vec::new(),
        };
        for reply in replies {
            self.deliver(&reply);
        }
        Ok(())
    }

    fn on_extension(&self, command: u8, handler: ExtensionHandler) -> Result<()> {
        let mut handlers = self.handlers.lock();
        if handlers.contains_key(&command) {
            return Err(RddError::Transport(format!(
                "handler already registered for command 0x{:02x}",
                command
            )));
        }
        handlers.insert(command, Arc::from(handler));
        Ok(())
    }
}

fn delivery_loop(
    rx: Receiver<Inbound>,
    handlers: HandlerMap,
    delay: Arc<Mutex<Duration>>,
    delivered: Counter,
) {
    for message in rx.iter() {
        let pause = *delay.lock();
        if !pause.is_zero() {
            thread::sleep(pause);
        }
        dispatch(&handlers, &delivered, message.command, &message.payload);
    }
}

fn dispatch(handlers: &HandlerMap, delivered: &Counter, command: u8, payload: &[u8]) {
    delivered.fetch_add(1, Ordering::SeqCst);

    // Clone out of the lock so a handler may touch the transport
    let handler = handlers.lock().get(&command).cloned();
    match handler {
        Some(handler) => handler(payload),
        None => tracing::debug!("No handler for inbound command 0x{:02x}", command),
    }
}
