//! Transport Module
//!
//! The extension channel the client talks through.
//!
//! ## Contract
//! - `send_extension` hands one command-tagged payload to the channel.
//!   Framing and escaping are the transport's business.
//! - `on_extension` registers the single handler for a command id.
//!   Handlers run on the transport's delivery thread, one at a time,
//!   with payload bytes exactly as received (command byte stripped).

mod mock;

pub use mock::{MockTransport, Responder};

use crate::error::Result;

/// Callback invoked with each inbound payload for a command id
pub type ExtensionHandler = Box<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// A bidirectional extension channel to the remote board
pub trait Transport: Send + Sync {
    /// Send one extension message
    fn send_extension(&self, command: u8, payload: &[u8]) -> Result<()>;

    /// Register the handler for inbound messages tagged with `command`
    ///
    /// Fails if a handler is already registered for that id.
    fn on_extension(&self, command: u8, handler: ExtensionHandler) -> Result<()>;
}
