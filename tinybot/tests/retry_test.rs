use scripted_transport::ScriptedTransport;
use serde_json::json;
use std::time::Duration;
use tinybot::{
    Api, ApiConfig, RequestError,
    api::retry::{RetryPolicy, Retrying},
};

mod scripted_transport;

fn api(transport: ScriptedTransport) -> Api<ScriptedTransport> {
    Api::new(transport, ApiConfig::telegram("test-bot", "123:abc"))
}

#[tokio::test(start_paused = true)]
async fn test_retry_succeeds_within_budget() {
    let api = api(
        ScriptedTransport::new()
            .fail("timeout")
            .respond(json!({"ok": false, "description": "Too Many Requests"}))
            .respond_ok(json!({"message_id": 1})),
    );
    let retrying = Retrying::new(&api, RetryPolicy::new(3, Duration::from_secs(1)));

    let sent = retrying.method("sendMessage").invoke(json!({"chat_id": 1})).await.unwrap();

    assert_eq!(sent.get("message_id").unwrap(), 1);
    assert_eq!(api.transport().call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_returns_last_failure_when_exhausted() {
    let api = api(
        ScriptedTransport::new()
            .fail("timeout")
            .respond(json!({"ok": false, "description": "Too Many Requests"}))
            .respond_ok(json!({"message_id": 1})),
    );
    let retrying = Retrying::new(&api, RetryPolicy::new(2, Duration::from_secs(1)));

    let err = retrying.method("sendMessage").invoke(()).await.unwrap_err();

    assert!(matches!(
        err,
        RequestError::Remote { ref description, .. } if description == "Too Many Requests"
    ));
    assert_eq!(api.transport().call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_waits_between_attempts() {
    let api = api(ScriptedTransport::new().fail("a").fail("b").respond_ok(json!(true)));
    let retrying = Retrying::new(&api, RetryPolicy::new(3, Duration::from_secs(5)));

    let started = tokio::time::Instant::now();
    retrying.method("getMe").invoke(()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_zero_attempts_still_calls_once() {
    let api = api(ScriptedTransport::new().fail("down"));
    let retrying = Retrying::new(&api, RetryPolicy::new(0, Duration::from_secs(1)));

    assert!(retrying.method("getMe").invoke(()).await.is_err());
    assert_eq!(api.transport().call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_each_attempt_resends_the_same_arguments() {
    let api = api(ScriptedTransport::new().fail("reset").respond_ok(json!(true)));
    let retrying = Retrying::new(&api, RetryPolicy::default());

    retrying
        .method("sendMessage")
        .invoke(json!({"chat_id": 3, "text": "again"}))
        .await
        .unwrap();

    let calls = api.transport().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
}
