//! Dispatcher-level tests: event routing, ignore/acknowledge paths,
//! and the end-of-call persistence flow.

mod common;

use common::{test_state, FakeStore};
use ranchline::api::webhook::dispatch;
use ranchline::memory::types::Role;
use serde_json::json;

#[tokio::test]
async fn unknown_event_type_is_acknowledged() {
    let store = FakeStore::new();
    let (state, _dir) = test_state(store.clone());

    let resp = dispatch(&state, json!({ "message": { "type": "speech-update" } })).await;
    assert_eq!(resp["status"], "acknowledged");
}

#[tokio::test]
async fn malformed_envelope_still_gets_a_response() {
    let store = FakeStore::new();
    let (state, _dir) = test_state(store.clone());

    let resp = dispatch(&state, json!({ "unexpected": [1, 2, 3] })).await;
    assert_eq!(resp["status"], "acknowledged");
}

#[tokio::test]
async fn missing_phone_is_ignored_without_store_mutation() {
    let store = FakeStore::new();
    let (state, _dir) = test_state(store.clone());

    for event_type in ["assistant-request", "end-of-call-report"] {
        let resp = dispatch(
            &state,
            json!({ "message": { "type": event_type, "call": { "id": "abc123" } } }),
        )
        .await;
        assert_eq!(resp["status"], "ignored", "{event_type}");
    }

    let fake = store.state.lock();
    assert_eq!(fake.create_user_calls, 0);
    assert_eq!(fake.create_thread_calls, 0);
    assert_eq!(fake.append_calls, 0);
}

#[tokio::test]
async fn assistant_request_for_new_caller_returns_onboarding_greeting() {
    let store = FakeStore::new();
    let (state, _dir) = test_state(store.clone());

    let resp = dispatch(
        &state,
        json!({
            "message": {
                "type": "assistant-request",
                "call": { "id": "call1", "customer": { "number": "+14065550000" } }
            }
        }),
    )
    .await;

    let first_message = resp["assistant"]["firstMessage"].as_str().unwrap();
    assert!(first_message.contains("new caller"));

    // First touch creates the identity and the call's thread.
    let fake = store.state.lock();
    assert!(fake.users.contains_key("+14065550000"));
    assert_eq!(fake.create_thread_calls, 1);
}

#[tokio::test]
async fn end_of_call_report_persists_normalized_transcript() {
    let store = FakeStore::new();
    let (state, _dir) = test_state(store.clone());

    let resp = dispatch(
        &state,
        json!({
            "message": {
                "type": "end-of-call-report",
                "call": { "id": "abc123", "customer": { "number": "+14065551234" } },
                "messages": [
                    { "role": "user", "message": "hello" },
                    { "role": "bot", "message": "hi there" }
                ]
            }
        }),
    )
    .await;
    assert_eq!(resp["status"], "success");

    let fake = store.state.lock();
    assert!(fake.users.contains_key("+14065551234"));
    drop(fake);

    let thread = store.thread("mfc_+14065551234_abc123").expect("thread reconciled");
    assert_eq!(thread.messages.len(), 2);
    assert_eq!(thread.messages[0].role, Role::Caller);
    assert_eq!(thread.messages[0].content, "hello");
    assert_eq!(thread.messages[1].role, Role::Agent);
    assert_eq!(thread.messages[1].content, "hi there");
}

#[tokio::test]
async fn end_of_call_with_empty_transcript_writes_nothing() {
    let store = FakeStore::new().with_user("+14065551234");
    let (state, _dir) = test_state(store.clone());

    let resp = dispatch(
        &state,
        json!({
            "message": {
                "type": "end-of-call-report",
                "call": { "id": "abc123", "customer": { "number": "+14065551234" } },
                "messages": []
            }
        }),
    )
    .await;
    assert_eq!(resp["status"], "success");
    assert_eq!(store.state.lock().append_calls, 0);
}

#[tokio::test]
async fn end_of_call_acknowledges_even_when_the_store_is_down() {
    let store = FakeStore::new().with_user("+14065551234");
    store.state.lock().fail_append = true;
    let (state, _dir) = test_state(store.clone());

    let resp = dispatch(
        &state,
        json!({
            "message": {
                "type": "end-of-call-report",
                "call": { "id": "abc123", "customer": { "number": "+14065551234" } },
                "messages": [{ "role": "user", "content": "hello" }]
            }
        }),
    )
    .await;

    // The platform has no retry contract; the webhook is still acknowledged.
    assert_eq!(resp["status"], "success");
    // But the transcript was parked for replay.
    assert_eq!(state.outbox.pending().await.unwrap(), 1);
}

#[tokio::test]
async fn memory_tool_call_returns_caller_context() {
    let store = FakeStore::new();
    let (state, _dir) = test_state(store.clone());

    let resp = dispatch(
        &state,
        json!({
            "message": {
                "type": "tool-calls",
                "call": { "id": "call9", "customer": { "number": "+14065559999" } },
                "toolCallList": [
                    { "id": "tc1", "function": { "name": "get_caller_context" } }
                ]
            }
        }),
    )
    .await;

    assert_eq!(resp["results"][0]["toolCallId"], "tc1");
    let result = &resp["results"][0]["result"];
    assert_eq!(result["is_new_caller"], true);
    assert_eq!(result["facts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn tool_call_phone_argument_overrides_envelope() {
    let store = FakeStore::new();
    let (state, _dir) = test_state(store.clone());

    dispatch(
        &state,
        json!({
            "message": {
                "type": "tool-calls",
                "call": { "customer": { "number": "+14060000000" } },
                "toolCallList": [{
                    "id": "tc1",
                    "function": {
                        "name": "get_caller_context",
                        "arguments": { "phone_number": "+14067777777" }
                    }
                }]
            }
        }),
    )
    .await;

    let fake = store.state.lock();
    assert!(fake.users.contains_key("+14067777777"));
    assert!(!fake.users.contains_key("+14060000000"));
}

#[tokio::test]
async fn unsupported_tool_gets_a_stub_result() {
    let store = FakeStore::new();
    let (state, _dir) = test_state(store.clone());

    let resp = dispatch(
        &state,
        json!({
            "message": {
                "type": "function-call",
                "toolCalls": [{ "id": "tc2", "function": { "name": "book_delivery" } }]
            }
        }),
    )
    .await;

    assert_eq!(resp["results"][0]["toolCallId"], "tc2");
    assert_eq!(resp["results"][0]["result"], "not implemented");
    assert_eq!(store.state.lock().create_user_calls, 0);
}

#[tokio::test]
async fn tool_event_without_tool_calls_is_ignored() {
    let store = FakeStore::new();
    let (state, _dir) = test_state(store.clone());

    let resp = dispatch(&state, json!({ "message": { "type": "tool-calls" } })).await;
    assert_eq!(resp["status"], "ignored");
}
