//! Client Module
//!
//! The caller-facing side of the protocol.
//!
//! ## Architecture
//! - `DeviceDriverClient` encodes queries and sends them on the transport
//! - One in-flight slot serializes requests (no correlation token on the wire)
//! - The response handler decodes on the transport thread and fills the slot
//! - Callers block on their `PendingRequest` until response or deadline

mod driver;
mod handles;
mod pending;

pub use driver::DeviceDriverClient;
pub use handles::HandleState;
pub use pending::PendingRequest;
