//! # RDD
//!
//! Client-side access to DeviceDriver instances running on a remote
//! microcontroller, over the extension channel of a Firmata-style serial
//! protocol:
//! - Binary query/response codec with base64 armor
//! - POSIX-style status table (negated `errno` values)
//! - Blocking open/read/write/close with per-request deadlines
//! - Cancellable pending requests, strictly one in flight
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                                │
//! │                open / read / write / close                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 DeviceDriverClient                           │
//! │          (In-flight slot + handle state table)               │
//! └──────────┬──────────────────────────────────▲───────────────┘
//!            │ encode_query                     │ decode_response
//!            ▼                                  │
//!   ┌─────────────────┐                ┌────────┴────────┐
//!   │  DEVICE_QUERY   │                │ DEVICE_RESPONSE │
//!   │     (0x30)      │                │     (0x31)      │
//!   └────────┬────────┘                └────────▲────────┘
//!            │                                  │
//! ┌──────────▼──────────────────────────────────┴───────────────┐
//! │                       Transport                              │
//! │               (serial extension channel)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RddError, Result};
pub use config::ClientConfig;
pub use client::{DeviceDriverClient, HandleState, PendingRequest};
pub use protocol::{ActionCode, DeviceQuery, DeviceResponse, StatusCode};
pub use transport::{MockTransport, Transport};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of RDD
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
