//! Confirms the reader task's diagnostic logging fires on the paths it's
//! meant to cover, without taking the session down with it. `env_logger` is
//! initialized once per test with `is_test(true)` so `cargo test -- --nocapture`
//! shows the lines without interleaving with other tests' output.

use claude_agent_sdk::{Client, ClientOptions, InMemoryTransport};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn unrecognised_frame_type_is_logged_and_dropped() {
    env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    let (transport, inbound_tx, mut outbound_rx) = InMemoryTransport::pair();
    let client = Arc::new(Client::with_transport(
        ClientOptions::builder().cli_path("claude").build().unwrap(),
        Arc::new(transport),
    ));

    client.start().await.unwrap();

    // Neither a recognised conversation frame nor a control frame — the
    // reader task should log a warning and move on rather than panicking
    // or wedging the session.
    inbound_tx
        .send(Ok(json!({"type": "some_future_frame_kind", "payload": 1})))
        .await
        .unwrap();

    // The session is still usable afterwards: an unrelated control round
    // trip still completes rather than the reader task having wedged.
    let call = tokio::spawn({
        let client = client.clone();
        async move { client.account_info().await }
    });

    let frame = outbound_rx.recv().await.unwrap();
    inbound_tx
        .send(Ok(json!({
            "type": "control_response",
            "response": {"subtype": "success", "request_id": frame["request_id"], "response": null},
        })))
        .await
        .unwrap();

    assert_eq!(call.await.unwrap().unwrap(), None);
}

#[tokio::test]
async fn control_response_for_unknown_request_id_is_logged() {
    env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    let (transport, inbound_tx, mut outbound_rx) = InMemoryTransport::pair();
    let client = Arc::new(Client::with_transport(
        ClientOptions::builder().cli_path("claude").build().unwrap(),
        Arc::new(transport),
    ));

    client.start().await.unwrap();

    // No call ever registered "stray-id" — the correlation table should log
    // and ignore it rather than erroring.
    inbound_tx
        .send(Ok(json!({
            "type": "control_response",
            "response": {"subtype": "success", "request_id": "stray-id", "response": null},
        })))
        .await
        .unwrap();

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.account_info().await }
    });

    let frame = outbound_rx.recv().await.unwrap();
    inbound_tx
        .send(Ok(json!({
            "type": "control_response",
            "response": {"subtype": "success", "request_id": frame["request_id"], "response": null},
        })))
        .await
        .unwrap();

    assert_eq!(call.await.unwrap().unwrap(), None);
}
