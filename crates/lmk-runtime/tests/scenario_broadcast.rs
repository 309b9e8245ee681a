//! Scenario: broadcast correctness.
//!
//! # Invariants under test
//!
//! 1. After an emit, every listener registered at emit time receives the
//!    payload exactly once, in registration order.
//! 2. A listener unsubscribed before the emit never receives it; removal
//!    targets the exact registration, not an index.
//! 3. `get_initial_link` immediately after an emit returns the same
//!    payload (`last_payload` and broadcast are atomic in the serialized
//!    timeline).
//! 4. The supplementary payload stream observes emits in order.

use std::sync::{Arc, Mutex};

use tokio_stream::StreamExt;

use lmk_runtime::{LinkMe, LinkPayload};

fn payload(id: &str) -> LinkPayload {
    LinkPayload {
        link_id: Some(id.to_string()),
        is_link_me: Some(true),
        ..Default::default()
    }
}

type Log = Arc<Mutex<Vec<(&'static str, Option<String>)>>>;

fn recording_listener(sdk: &LinkMe, log: &Log, tag: &'static str) -> lmk_runtime::ListenerHandle {
    let log = Arc::clone(log);
    sdk.add_listener(move |p| log.lock().unwrap().push((tag, p.link_id.clone())))
}

// ---------------------------------------------------------------------------
// 1 + 3. Registration order, exactly once, last payload agreement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listeners_receive_in_registration_order_exactly_once() {
    let sdk = LinkMe::new();
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let _l1 = recording_listener(&sdk, &log, "first");
    let _l2 = recording_listener(&sdk, &log, "second");
    let _l3 = recording_listener(&sdk, &log, "third");

    sdk.emit_for_test(payload("p1"));

    // Serialized after the emit: both the read and the handler invocations
    // have happened once this returns.
    assert_eq!(sdk.get_initial_link().await, Some(payload("p1")));
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            ("first", Some("p1".to_string())),
            ("second", Some("p1".to_string())),
            ("third", Some("p1".to_string())),
        ]
    );
}

#[tokio::test]
async fn listener_registered_after_an_emit_sees_only_later_payloads() {
    let sdk = LinkMe::new();
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    sdk.emit_for_test(payload("early"));
    let _l = recording_listener(&sdk, &log, "late-joiner");
    sdk.emit_for_test(payload("later"));

    assert_eq!(sdk.get_initial_link().await, Some(payload("later")));
    assert_eq!(
        *log.lock().unwrap(),
        vec![("late-joiner", Some("later".to_string()))]
    );
}

// ---------------------------------------------------------------------------
// 2. Unsubscription
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsubscribed_listener_never_receives_later_emits() {
    let sdk = LinkMe::new();
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let l1 = recording_listener(&sdk, &log, "gone");
    let _l2 = recording_listener(&sdk, &log, "stays");

    sdk.emit_for_test(payload("p1"));
    l1.unsubscribe();
    sdk.emit_for_test(payload("p2"));

    assert_eq!(sdk.get_initial_link().await, Some(payload("p2")));
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            ("gone", Some("p1".to_string())),
            ("stays", Some("p1".to_string())),
            ("stays", Some("p2".to_string())),
        ]
    );
}

#[tokio::test]
async fn unsubscribing_one_listener_leaves_later_registrations_intact() {
    let sdk = LinkMe::new();
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let l1 = recording_listener(&sdk, &log, "a");
    l1.unsubscribe();
    // Registered after a removal: must not inherit the removed slot.
    let _l2 = recording_listener(&sdk, &log, "b");

    sdk.emit_for_test(payload("p1"));

    assert_eq!(sdk.get_initial_link().await, Some(payload("p1")));
    assert_eq!(*log.lock().unwrap(), vec![("b", Some("p1".to_string()))]);
}

// ---------------------------------------------------------------------------
// 4. Stream surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn payload_stream_observes_emits_in_order() {
    let sdk = LinkMe::new();
    let mut stream = sdk.payload_stream();

    sdk.emit_for_test(payload("p1"));
    sdk.emit_for_test(payload("p2"));
    assert_eq!(sdk.get_initial_link().await, Some(payload("p2")));

    let first = stream.next().await.expect("stream open").expect("no lag");
    let second = stream.next().await.expect("stream open").expect("no lag");
    assert_eq!(first, payload("p1"));
    assert_eq!(second, payload("p2"));
}
