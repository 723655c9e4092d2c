// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use chrono::Utc;
use linkflow_core::test_support::execution_key;
use serde_json::json;

use super::*;
use crate::transport::FakeCallbackTransport;

fn test_config() -> CallbackConfig {
    CallbackConfig {
        callback_secret: Some("shh".to_string()),
        queue_capacity: 4,
        max_retries: 2,
        retry_delay: Duration::from_millis(20),
        request_timeout: Duration::from_secs(1),
    }
}

fn payload(event: &str) -> CallbackPayload {
    let key = execution_key("acme", "wf-1");
    CallbackPayload::new(event, &key, Utc::now(), json!({"n": 1}))
}

#[tokio::test]
async fn notify_sync_delivers_immediately_and_signs_the_request() {
    let transport = Arc::new(FakeCallbackTransport::new());
    let notifier = CallbackNotifier::new(transport.clone(), "http://example.invalid/hook", test_config());

    notifier.notify_sync(payload("execution.started")).await.unwrap();

    let requests = transport.requests.lock();
    assert_eq!(requests.len(), 1);
    let (url, headers, _body) = &requests[0];
    assert_eq!(url, "http://example.invalid/hook");
    assert!(headers.iter().any(|(k, _)| k == "X-LinkFlow-Signature"));
    assert!(headers.iter().any(|(k, v)| k == "X-LinkFlow-Event" && v == "execution.started"));
}

#[tokio::test]
async fn notify_async_delivers_via_the_background_drain() {
    let transport = Arc::new(FakeCallbackTransport::new());
    let notifier = CallbackNotifier::new(transport.clone(), "http://example.invalid/hook", test_config());

    notifier.notify_async(payload("node.completed")).await;

    // Give the background drain task a turn to run.
    for _ in 0..20 {
        if transport.request_count() >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn failed_async_delivery_is_retried_then_succeeds() {
    let transport = Arc::new(FakeCallbackTransport::new());
    transport.fail_next_n(1);
    let notifier = CallbackNotifier::new(transport.clone(), "http://example.invalid/hook", test_config());

    notifier.notify_async(payload("node.failed")).await;

    for _ in 0..50 {
        if transport.request_count() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(transport.request_count(), 2, "one failed attempt plus one successful retry");
}

#[tokio::test]
async fn async_queue_full_falls_back_to_synchronous_send() {
    let transport = Arc::new(FakeCallbackTransport::new());
    // Fail every delivery so the drain task never empties the queue,
    // keeping it full for the fallback assertion below.
    transport.fail_next_n(1000);
    let mut config = test_config();
    config.queue_capacity = 1;
    config.max_retries = 0;
    let notifier = CallbackNotifier::new(transport.clone(), "http://example.invalid/hook", config);

    // Fill the single queue slot, then force a second enqueue attempt while
    // it's still occupied.
    notifier.notify_async(payload("node.started")).await;
    notifier.notify_async(payload("node.started")).await;

    for _ in 0..20 {
        if transport.request_count() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(transport.request_count() >= 2, "the fallback send must still reach the transport");
}
