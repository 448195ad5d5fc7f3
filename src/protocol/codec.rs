//! Protocol codec
//!
//! Encoding and decoding functions for the device query/response messages.
//!
//! ## Wire Format
//!
//! ### Query Body (command 0x30)
//! ```text
//! ┌───────────┬────────────────┬──────────────┬───────────┬──────────────┬─────────────────────┐
//! │Action (1) │ Flags/Handle(2)│ Register (2) │ Count (2) │ Reserved (2) │ Unit name + NUL /   │
//! │           │                │              │           │              │ write data          │
//! └───────────┴────────────────┴──────────────┴───────────┴──────────────┴─────────────────────┘
//! ```
//!
//! ### Response Body (command 0x31)
//! ```text
//! ┌───────────┬────────────┬──────────────┬───────────┬────────────┬─────────────────┐
//! │Action (1) │ Handle (2) │ Register (2) │ Count (2) │ Status (2) │ Data (optional) │
//! └───────────┴────────────┴──────────────┴───────────┴────────────┴─────────────────┘
//! ```
//!
//! All multi-byte fields are little-endian. Bodies are at most 256 bytes.
//!
//! ### Armor
//! The extension channel only carries 7-bit-safe bytes, so each body is
//! base64 encoded and every base64 character becomes one payload byte.
//! A full query message is `[0x30, armored body...]`.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use bytes::{Buf, BufMut, BytesMut};

use super::{ActionCode, DeviceQuery, DeviceResponse, DEVICE_QUERY, DEVICE_RESPONSE};
use crate::error::{RddError, Result};

/// Fixed header size shared by queries and responses
pub const HEADER_SIZE: usize = 9;

/// Maximum body size before armoring (the remote message buffer)
pub const MAX_BODY_SIZE: usize = 256;

/// Longest unit name that fits an OPEN query (header + name + NUL)
pub const MAX_UNIT_NAME_LEN: usize = MAX_BODY_SIZE - HEADER_SIZE - 1;

/// Standard alphabet, padded on encode, padding optional on decode
const ARMOR: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Armor
// =============================================================================

/// Base64 encode a body, one payload byte per base64 character
pub fn armor(body: &[u8]) -> Vec<u8> {
    ARMOR.encode(body).into_bytes()
}

/// Reverse [`armor`]: treat each byte as a base64 character and decode
///
/// ASCII whitespace is skipped.
pub fn unarmor(payload: &[u8]) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let text: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    ARMOR.decode(text)
}

// =============================================================================
// Query Encoding/Decoding
// =============================================================================

/// Encode an OPEN query into a complete extension message
pub fn encode_open(unit_name: &str, flags: u16) -> Result<Vec<u8>> {
    encode_query(&DeviceQuery::open(unit_name, flags))
}

/// Encode any query into a complete extension message
///
/// Format: DEVICE_QUERY (1) + armored body
pub fn encode_query(query: &DeviceQuery) -> Result<Vec<u8>> {
    let body = encode_query_body(query)?;
    let encoded = armor(&body);

    let mut message = Vec::with_capacity(1 + encoded.len());
    message.push(DEVICE_QUERY);
    message.extend_from_slice(&encoded);

    tracing::trace!("Encoded {} query: body {:02x?}", query.action(), &body[..]);
    Ok(message)
}

/// Serialize a query into its raw (unarmored) body
pub fn encode_query_body(query: &DeviceQuery) -> Result<Vec<u8>> {
    let trailer_len = match query {
        DeviceQuery::Open { unit_name, .. } => unit_name.len() + 1,
        DeviceQuery::Write { data, .. } => data.len(),
        DeviceQuery::Read { .. } | DeviceQuery::Close { .. } => 0,
    };

    let size = HEADER_SIZE + trailer_len;
    if size > MAX_BODY_SIZE {
        return Err(RddError::PayloadTooLarge {
            size,
            max: MAX_BODY_SIZE,
        });
    }

    let mut body = BytesMut::with_capacity(size);
    body.put_u8(query.action() as u8);

    match query {
        DeviceQuery::Open { flags, unit_name } => {
            put_header_fields(&mut body, *flags, 0, 0);
            body.put_slice(unit_name.as_bytes());
            body.put_u8(0);
        }
        DeviceQuery::Read {
            handle,
            register,
            count,
        } => {
            put_header_fields(&mut body, *handle, *register, *count);
        }
        DeviceQuery::Write {
            handle,
            register,
            data,
        } => {
            put_header_fields(&mut body, *handle, *register, data.len() as u16);
            body.put_slice(data);
        }
        DeviceQuery::Close { handle } => {
            put_header_fields(&mut body, *handle, 0, 0);
        }
    }

    Ok(body.to_vec())
}

/// Fields 1..9 of the query header; the reserved word is always zero
fn put_header_fields(body: &mut BytesMut, flags_or_handle: u16, register: i16, count: u16) {
    body.put_u16_le(flags_or_handle);
    body.put_i16_le(register);
    body.put_u16_le(count);
    body.put_u16_le(0);
}

/// Decode a query from an extension payload (command byte already stripped)
pub fn decode_query(payload: &[u8]) -> Result<DeviceQuery> {
    let body = unarmor(payload)
        .map_err(|e| RddError::MalformedQuery(format!("Invalid base64 body: {}", e)))?;
    decode_query_body(&body)
}

/// Parse a raw (unarmored) query body
pub fn decode_query_body(body: &[u8]) -> Result<DeviceQuery> {
    if body.len() < HEADER_SIZE {
        return Err(RddError::MalformedQuery(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            body.len()
        )));
    }
    if body.len() > MAX_BODY_SIZE {
        return Err(RddError::MalformedQuery(format!(
            "Body too large: {} bytes (max {})",
            body.len(),
            MAX_BODY_SIZE
        )));
    }

    let mut buf = body;
    let action = ActionCode::try_from(buf.get_u8())
        .map_err(|e| RddError::MalformedQuery(e.to_string()))?;
    let flags_or_handle = buf.get_u16_le();
    let register = buf.get_i16_le();
    let count = buf.get_u16_le();
    let _reserved = buf.get_u16_le();

    match action {
        ActionCode::Open => {
            let name_bytes = match buf.iter().position(|&b| b == 0) {
                Some(nul) => &buf[..nul],
                None => {
                    return Err(RddError::MalformedQuery(
                        "OPEN query: unit name is not NUL-terminated".to_string(),
                    ))
                }
            };
            let unit_name = std::str::from_utf8(name_bytes)
                .map_err(|_| {
                    RddError::MalformedQuery("OPEN query: unit name is not UTF-8".to_string())
                })?
                .to_string();
            Ok(DeviceQuery::Open {
                flags: flags_or_handle,
                unit_name,
            })
        }
        ActionCode::Read => Ok(DeviceQuery::Read {
            handle: flags_or_handle,
            register,
            count,
        }),
        ActionCode::Write => {
            let count = count as usize;
            if buf.len() < count {
                return Err(RddError::MalformedQuery(format!(
                    "WRITE query: incomplete data (expected {}, got {})",
                    count,
                    buf.len()
                )));
            }
            Ok(DeviceQuery::Write {
                handle: flags_or_handle,
                register,
                data: buf[..count].to_vec(),
            })
        }
        ActionCode::Close => Ok(DeviceQuery::Close {
            handle: flags_or_handle,
        }),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response into a complete extension message
///
/// Format: DEVICE_RESPONSE (1) + armored body
pub fn encode_response(response: &DeviceResponse) -> Result<Vec<u8>> {
    let size = HEADER_SIZE + response.data.len();
    if size > MAX_BODY_SIZE {
        return Err(RddError::PayloadTooLarge {
            size,
            max: MAX_BODY_SIZE,
        });
    }

    let mut body = BytesMut::with_capacity(size);
    body.put_u8(response.action);
    body.put_u16_le(response.handle);
    body.put_i16_le(response.register);
    body.put_u16_le(response.requested_byte_count);
    body.put_i16_le(response.status);
    body.put_slice(&response.data);

    let encoded = armor(&body);
    let mut message = Vec::with_capacity(1 + encoded.len());
    message.push(DEVICE_RESPONSE);
    message.extend_from_slice(&encoded);
    Ok(message)
}

/// Decode a response from an extension payload (command byte already stripped)
pub fn decode_response(payload: &[u8]) -> Result<DeviceResponse> {
    let body = unarmor(payload)
        .map_err(|e| RddError::MalformedResponse(format!("Invalid base64 body: {}", e)))?;

    if body.is_empty() {
        return Err(RddError::MalformedResponse(
            "Base64 body decoded to zero bytes".to_string(),
        ));
    }
    decode_response_body(&body)
}

/// Parse a raw (unarmored) response body
pub fn decode_response_body(body: &[u8]) -> Result<DeviceResponse> {
    if body.len() < HEADER_SIZE {
        return Err(RddError::MalformedResponse(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            body.len()
        )));
    }

    let mut buf = body;
    let action = buf.get_u8();
    let handle = buf.get_u16_le();
    let register = buf.get_i16_le();
    let requested_byte_count = buf.get_u16_le();
    let status = buf.get_i16_le();

    Ok(DeviceResponse::new(action, handle, register, requested_byte_count, status)
        .with_data(buf.to_vec()))
}
