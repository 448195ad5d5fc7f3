//! Codec Tests
//!
//! Tests for query and response encoding/decoding.

use rdd::protocol::{
    armor, decode_query, decode_query_body, decode_response, encode_open, encode_query,
    encode_query_body, encode_response, unarmor, ActionCode, DeviceQuery, DeviceResponse,
    DEVICE_QUERY, DEVICE_RESPONSE, HEADER_SIZE, MAX_BODY_SIZE, MAX_UNIT_NAME_LEN,
};
use rdd::RddError;

// =============================================================================
// Helper Functions
// =============================================================================

/// Undo the armor of a full query message (command byte first)
fn query_body(message: &[u8]) -> Vec<u8> {
    assert_eq!(message[0], DEVICE_QUERY);
    unarmor(&message[1..]).unwrap()
}

// =============================================================================
// OPEN Query Tests
// =============================================================================

#[test]
fn test_encode_open_tempsensor() {
    let message = encode_open("/dev/tempsensor0", 0x0001).unwrap();
    let body = query_body(&message);

    let mut expected = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    expected.extend_from_slice(b"/dev/tempsensor0");
    expected.push(0x00);
    assert_eq!(body, expected);
}

#[test]
fn test_encode_open_flags_little_endian() {
    let body = encode_query_body(&DeviceQuery::open("x", 0xA1B2)).unwrap();
    assert_eq!(&body[1..3], &[0xB2, 0xA1]);
}

#[test]
fn test_encode_open_payload_is_base64_characters() {
    let message = encode_open("/dev/led", 0).unwrap();
    let body = encode_query_body(&DeviceQuery::open("/dev/led", 0)).unwrap();

    // Every payload byte is a base64 character, not re-packed bits
    assert_eq!(&message[1..], armor(&body).as_slice());
    assert!(message[1..]
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/' || *b == b'='));
}

#[test]
fn test_encode_open_utf8_name() {
    let name = "capteur-température";
    let body = query_body(&encode_open(name, 3).unwrap());
    assert_eq!(&body[HEADER_SIZE..body.len() - 1], name.as_bytes());
    assert_eq!(*body.last().unwrap(), 0);
}

#[test]
fn test_encode_open_roundtrips_header_for_many_lengths() {
    for len in [0usize, 1, 2, 3, 17, 100, 245] {
        let name = "a".repeat(len);
        let flags = len as u16 * 31;
        let body = query_body(&encode_open(&name, flags).unwrap());

        assert_eq!(body.len(), HEADER_SIZE + len + 1);
        assert_eq!(body[0], 0);
        assert_eq!(u16::from_le_bytes([body[1], body[2]]), flags);
        assert_eq!(&body[3..9], &[0u8; 6]);
        assert_eq!(&body[HEADER_SIZE..HEADER_SIZE + len], name.as_bytes());
        assert_eq!(body[HEADER_SIZE + len], 0);
    }
}

#[test]
fn test_encode_open_longest_name_fits() {
    let name = "n".repeat(MAX_UNIT_NAME_LEN);
    let body = query_body(&encode_open(&name, 0).unwrap());
    assert_eq!(body.len(), MAX_BODY_SIZE);
}

#[test]
fn test_encode_open_name_too_long() {
    for len in [MAX_UNIT_NAME_LEN + 1, 300, 1024] {
        let name = "n".repeat(len);
        match encode_open(&name, 0) {
            Err(RddError::PayloadTooLarge { size, max }) => {
                assert_eq!(size, HEADER_SIZE + len + 1);
                assert_eq!(max, MAX_BODY_SIZE);
            }
            other => panic!("Expected PayloadTooLarge, got {:?}", other),
        }
    }
}

// =============================================================================
// READ / WRITE / CLOSE Query Tests
// =============================================================================

#[test]
fn test_encode_read_query() {
    let body = encode_query_body(&DeviceQuery::Read {
        handle: 0x0102,
        register: -2,
        count: 16,
    })
    .unwrap();
    assert_eq!(
        body,
        vec![0x01, 0x02, 0x01, 0xFE, 0xFF, 0x10, 0x00, 0x00, 0x00]
    );
}

#[test]
fn test_encode_write_query_carries_data() {
    let body = encode_query_body(&DeviceQuery::Write {
        handle: 5,
        register: 1,
        data: vec![0xDE, 0xAD],
    })
    .unwrap();
    assert_eq!(
        body,
        vec![0x02, 0x05, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0xDE, 0xAD]
    );
}

#[test]
fn test_encode_write_query_too_large() {
    let query = DeviceQuery::Write {
        handle: 1,
        register: 0,
        data: vec![0; MAX_BODY_SIZE - HEADER_SIZE + 1],
    };
    assert!(matches!(
        encode_query(&query),
        Err(RddError::PayloadTooLarge { .. })
    ));
}

#[test]
fn test_encode_close_query() {
    let body = encode_query_body(&DeviceQuery::Close { handle: 9 }).unwrap();
    assert_eq!(body, vec![0x03, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
}

#[test]
fn test_decode_query_inverts_encode() {
    let queries = vec![
        DeviceQuery::open("/dev/tempsensor0", 1),
        DeviceQuery::Read {
            handle: 3,
            register: -7,
            count: 12,
        },
        DeviceQuery::Write {
            handle: 3,
            register: 4,
            data: b"hello".to_vec(),
        },
        DeviceQuery::Close { handle: 3 },
    ];

    for query in queries {
        let message = encode_query(&query).unwrap();
        assert_eq!(decode_query(&message[1..]).unwrap(), query);
    }
}

#[test]
fn test_decode_query_rejects_unterminated_name() {
    let mut body = vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    body.extend_from_slice(b"abc");
    assert!(matches!(
        decode_query_body(&body),
        Err(RddError::MalformedQuery(_))
    ));
}

#[test]
fn test_decode_query_rejects_unknown_action() {
    let body = vec![0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    assert!(matches!(
        decode_query_body(&body),
        Err(RddError::MalformedQuery(_))
    ));
}

// =============================================================================
// Response Decoding Tests
// =============================================================================

#[test]
fn test_decode_response_eperm() {
    let body = [0x02, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF];
    let response = decode_response(&armor(&body)).unwrap();

    assert_eq!(response.action, 2);
    assert_eq!(response.handle, 7);
    assert_eq!(response.register, 0);
    assert_eq!(response.requested_byte_count, 0);
    assert_eq!(response.status, -1);
    assert_eq!(response.status_code().name, "EPERM");
    assert!(response.data.is_empty());
}

#[test]
fn test_decode_response_inverts_encode() {
    let cases = [
        (0u8, 0u16, 0i16, 0u16, 0i16),
        (ActionCode::Open as u8, 42, 0, 0, 0),
        (ActionCode::Read as u8, 0xFFFF, i16::MIN, u16::MAX, i16::MAX),
        (ActionCode::Write as u8, 1, -1, 256, -110),
        (ActionCode::Close as u8, 0x8000, i16::MAX, 1, -151),
    ];

    for (action, handle, register, count, status) in cases {
        let response = DeviceResponse::new(action, handle, register, count, status);
        let message = encode_response(&response).unwrap();
        assert_eq!(message[0], DEVICE_RESPONSE);

        let decoded = decode_response(&message[1..]).unwrap();
        assert_eq!(
            (
                decoded.action,
                decoded.handle,
                decoded.register,
                decoded.requested_byte_count,
                decoded.status
            ),
            (action, handle, register, count, status)
        );
    }
}

#[test]
fn test_decode_response_keeps_trailing_data() {
    let response = DeviceResponse::new(1, 2, 0, 3, 3).with_data(vec![10, 20, 30]);
    let message = encode_response(&response).unwrap();
    assert_eq!(decode_response(&message[1..]).unwrap(), response);
}

#[test]
fn test_decode_response_short_body() {
    for len in 1..HEADER_SIZE {
        let body = vec![0u8; len];
        match decode_response(&armor(&body)) {
            Err(RddError::MalformedResponse(_)) => {}
            other => panic!("Expected MalformedResponse for {} bytes, got {:?}", len, other),
        }
    }
}

#[test]
fn test_decode_response_empty_payload() {
    assert!(matches!(
        decode_response(&[]),
        Err(RddError::MalformedResponse(_))
    ));
}

#[test]
fn test_decode_response_invalid_base64() {
    assert!(matches!(
        decode_response(b"!!not base64!!"),
        Err(RddError::MalformedResponse(_))
    ));
}
