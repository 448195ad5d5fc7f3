//! Concurrency Tests
//!
//! These tests verify:
//! - Concurrent callers are serialized (one request on the wire at a time)
//! - Each caller gets the response to its own request
//! - Callers waiting for the slot honor their own deadline

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rdd::protocol::{decode_query, encode_response, ActionCode, DeviceQuery, DeviceResponse};
use rdd::{ClientConfig, DeviceDriverClient, MockTransport, RddError};

// =============================================================================
// Helper Functions
// =============================================================================

/// Board that hands out sequential handles and records which unit got which.
/// Sets `overlap` if a query arrives while an earlier response is undelivered.
fn install_recording_board(
    transport: &Arc<MockTransport>,
    assigned: Arc<Mutex<HashMap<u16, String>>>,
    overlap: Arc<AtomicBool>,
) {
    let weak: Weak<MockTransport> = Arc::downgrade(transport);
    let mut queries_seen = 0usize;
    let mut next_handle: u16 = 100;

    transport.set_responder(move |_, payload| {
        if let Some(transport) = weak.upgrade() {
            if transport.delivered_count() != queries_seen {
                overlap.store(true, Ordering::SeqCst);
            }
        }
        queries_seen += 1;

        let response = match decode_query(payload).unwrap() {
            DeviceQuery::Open { unit_name, .. } => {
                let handle = next_handle;
                next_handle += 1;
                assigned.lock().insert(handle, unit_name);
                DeviceResponse::new(ActionCode::Open as u8, handle, 0, 0, 0)
            }
            DeviceQuery::Read {
                handle,
                register,
                count,
            } => {
                // Echo the handle in every data byte
                let data = vec![handle as u8; count as usize];
                DeviceResponse::new(ActionCode::Read as u8, handle, register, count, count as i16)
                    .with_data(data)
            }
            other => DeviceResponse::new(other.action() as u8, other.handle().unwrap_or(0), 0, 0, 0),
        };
        vec![encode_response(&response).unwrap()]
    });
}

fn client_on(transport: &Arc<MockTransport>, timeout_ms: u64) -> Arc<DeviceDriverClient> {
    let config = ClientConfig::builder()
        .transport(transport.clone())
        .request_timeout_ms(timeout_ms)
        .build();
    match DeviceDriverClient::new(config) {
        Ok(client) => Arc::new(client),
        Err(e) => panic!("client construction failed: {}", e),
    }
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[test]
fn test_concurrent_opens_are_serialized() {
    let transport = Arc::new(MockTransport::new().unwrap());
    transport.set_response_delay(Duration::from_millis(10));
    let assigned = Arc::new(Mutex::new(HashMap::new()));
    let overlap = Arc::new(AtomicBool::new(false));
    install_recording_board(&transport, Arc::clone(&assigned), Arc::clone(&overlap));

    let client = client_on(&transport, 5000);

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let unit = format!("/dev/sensor{}", i);
                let handle = client.open(&unit, 0).unwrap();
                (unit, handle)
            })
        })
        .collect();

    let results: Vec<(String, u16)> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert!(!overlap.load(Ordering::SeqCst), "two queries were in flight at once");
    assert_eq!(transport.sent_count(), 8);

    let assigned = assigned.lock();
    for (unit, handle) in &results {
        assert_eq!(assigned.get(handle), Some(unit), "handle {} mismatched", handle);
    }
    assert_eq!(client.open_handles().len(), 8);
}

#[test]
fn test_concurrent_reads_get_their_own_data() {
    let transport = Arc::new(MockTransport::new().unwrap());
    transport.set_response_delay(Duration::from_millis(5));
    let overlap = Arc::new(AtomicBool::new(false));
    install_recording_board(
        &transport,
        Arc::new(Mutex::new(HashMap::new())),
        Arc::clone(&overlap),
    );

    let client = client_on(&transport, 5000);
    let handles: Vec<u16> = (0..4)
        .map(|i| client.open(&format!("/dev/adc{}", i), 0).unwrap())
        .collect();

    let workers: Vec<_> = handles
        .iter()
        .map(|&handle| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let mut buffer = [0u8; 6];
                for _ in 0..5 {
                    let n = client.read(handle, 0, 6, &mut buffer).unwrap();
                    assert_eq!(n, 6);
                    assert!(buffer.iter().all(|&b| b == handle as u8));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert!(!overlap.load(Ordering::SeqCst));
    assert!(!client.is_busy());
}

// =============================================================================
// Deadline Tests
// =============================================================================

#[test]
fn test_waiting_for_slot_times_out() {
    let transport = Arc::new(MockTransport::new().unwrap());
    let client = client_on(&transport, 100);

    // Hold the slot without a response
    let pending = client.submit_open("/dev/first", 0).unwrap();

    let contender = {
        let client = Arc::clone(&client);
        thread::spawn(move || {
            let started = Instant::now();
            let result = client.open("/dev/second", 0);
            (result.map_err(|e| e.to_string()), started.elapsed())
        })
    };

    let (result, elapsed) = contender.join().unwrap();
    assert_eq!(result, Err(RddError::Timeout.to_string()));
    assert!(elapsed >= Duration::from_millis(90));

    // Only the first query reached the wire
    assert_eq!(transport.sent_count(), 1);
    pending.cancel();
    assert!(!client.is_busy());
}

#[test]
fn test_waiter_proceeds_once_cancelled_request_drains() {
    let transport = Arc::new(MockTransport::new().unwrap());
    let client = client_on(&transport, 2000);

    let pending = client.submit_open("/dev/first", 0).unwrap();

    let contender = {
        let client = Arc::clone(&client);
        thread::spawn(move || client.submit_open("/dev/second", 0).map(|p| p.id()).is_ok())
    };

    thread::sleep(Duration::from_millis(50));
    assert_eq!(transport.sent_count(), 1);

    // Cancelling alone keeps the slot until the late response is swallowed
    pending.cancel();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(transport.sent_count(), 1);

    let late = DeviceResponse::new(ActionCode::Open as u8, 1, 0, 0, 0);
    transport.deliver_now(&encode_response(&late).unwrap());
    assert!(contender.join().unwrap());
    assert_eq!(transport.sent_count(), 2);
}
