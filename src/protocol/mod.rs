//! Protocol Module
//!
//! Defines the device query/response messages carried over the extension
//! channel.
//!
//! ## Extension Commands
//! - 0x30: DEVICE_QUERY    - host → remote driver
//! - 0x31: DEVICE_RESPONSE - remote driver → host
//!
//! ### Actions
//! - 0: OPEN  - Payload: unit name + NUL
//! - 1: READ  - Payload: empty
//! - 2: WRITE - Payload: data
//! - 3: CLOSE - Payload: empty
//!
//! ### Status
//! Responses carry a signed status: 0 success, negative `errno` values
//! on failure (see [`StatusCode`]).

mod action;
mod codec;
mod query;
mod response;
mod status;

pub use action::ActionCode;
pub use codec::{
    armor, decode_query, decode_query_body, decode_response, decode_response_body, encode_open,
    encode_query, encode_query_body, encode_response, unarmor, HEADER_SIZE, MAX_BODY_SIZE,
    MAX_UNIT_NAME_LEN,
};
pub use query::DeviceQuery;
pub use response::DeviceResponse;
pub use status::StatusCode;

/// Extension command id for device queries
pub const DEVICE_QUERY: u8 = 0x30;

/// Extension command id for device responses
pub const DEVICE_RESPONSE: u8 = 0x31;
