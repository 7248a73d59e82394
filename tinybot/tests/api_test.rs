use futures_util::future::join_all;
use scripted_transport::ScriptedTransport;
use serde_json::json;
use std::{
    io,
    sync::{Arc, Mutex},
};
use tinybot::{Api, ApiConfig, RequestError, ViewError, transport::TransportError};

mod scripted_transport;

fn api(transport: ScriptedTransport) -> Api<ScriptedTransport> {
    Api::new(transport, ApiConfig::telegram("test-bot", "123:abc"))
}

#[tokio::test]
async fn test_chaining_performs_no_calls() {
    let api = api(ScriptedTransport::new().respond_ok(json!(true)));

    let call = api.method("a").chain("b").chain("c");
    assert_eq!(call.name(), "a.b.c");
    assert_eq!(api.transport().call_count(), 0);

    call.invoke(()).await.unwrap();

    let calls = api.transport().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "a.b.c");
}

#[tokio::test]
async fn test_invoke_sends_arguments_and_returns_result() {
    let api = api(
        ScriptedTransport::new().respond_ok(json!({"message_id": 10, "chat": {"id": 7}})),
    );

    let sent = api
        .method("sendMessage")
        .invoke(json!({"chat_id": 7, "text": "hi"}))
        .await
        .unwrap();

    assert_eq!(sent.get("message_id").unwrap(), 10);
    assert_eq!(sent.get("chat").unwrap().get("id").unwrap(), 7);

    let (method, args) = &api.transport().calls()[0];
    assert_eq!(method, "sendMessage");
    assert_eq!(args["chat_id"], 7);
    assert_eq!(args["text"], "hi");
}

#[tokio::test]
async fn test_result_errors_carry_the_result_path() {
    let api = api(ScriptedTransport::new().respond_ok(json!({"id": 1})));

    let me = api.method("getMe").invoke(()).await.unwrap();
    let err = me.get("username").unwrap_err();

    assert_eq!(
        err,
        ViewError::NoSuchElement {
            path: ".result.username".to_string()
        }
    );
}

#[tokio::test]
async fn test_invoke_accepts_serializable_structs() {
    #[derive(serde::Serialize)]
    struct SendMessage<'a> {
        chat_id: i64,
        text: &'a str,
    }

    let api = api(ScriptedTransport::new().respond_ok(json!({})));

    api.method("sendMessage")
        .invoke(SendMessage {
            chat_id: 1,
            text: "typed",
        })
        .await
        .unwrap();

    let (_, args) = &api.transport().calls()[0];
    assert_eq!(args["text"], "typed");
}

#[tokio::test]
async fn test_invalid_arguments_are_rejected_before_the_call() {
    let api = api(ScriptedTransport::new());

    let err = api
        .method("sendMessage")
        .invoke(json!([1, 2]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RequestError::InvalidArguments { ref method, .. } if method == "sendMessage"
    ));
    assert_eq!(api.transport().call_count(), 0);
}

#[tokio::test]
async fn test_predefined_arguments_override_call_arguments() {
    let config = ApiConfig::telegram("test-bot", "t")
        .with_predefined_arg("parse_mode", "HTML")
        .with_predefined_arg("chat_id", 1);
    let api = Api::new(ScriptedTransport::new().respond_ok(json!(true)), config);

    api.method("sendMessage")
        .invoke(json!({"chat_id": 2, "text": "x"}))
        .await
        .unwrap();

    let (_, args) = &api.transport().calls()[0];
    assert_eq!(args["parse_mode"], "HTML");
    assert_eq!(args["chat_id"], 1);
    assert_eq!(args["text"], "x");
}

#[tokio::test]
async fn test_envelope_failures() {
    let api = api(
        ScriptedTransport::new()
            .respond(json!({"ok": false, "description": "boom"}))
            .respond(json!({})),
    );

    let remote = api.method("getChat").invoke(()).await.unwrap_err();
    assert!(matches!(
        remote,
        RequestError::Remote { ref method, ref description }
            if method == "getChat" && description == "boom"
    ));

    let malformed = api.method("getChat").invoke(()).await.unwrap_err();
    assert!(matches!(
        malformed,
        RequestError::MalformedResponse { ref response, .. } if *response == json!({})
    ));
}

#[tokio::test]
async fn test_transport_failures_carry_the_method() {
    let api = api(ScriptedTransport::new().fail("connection reset"));

    let err = api.method("getMe").invoke(()).await.unwrap_err();

    assert_eq!(err.method(), "getMe");
    assert!(matches!(
        err,
        RequestError::Transport {
            source: TransportError::Other(_),
            ..
        }
    ));
    assert!(err.to_string().contains("getMe"));
}

#[tokio::test]
async fn test_concurrent_calls() {
    let api = api(
        ScriptedTransport::new()
            .respond_ok(json!(1))
            .respond_ok(json!(2))
            .respond_ok(json!(3)),
    );

    let results =
        join_all((0..3).map(|i| api.method("sendMessage").invoke(json!({"n": i})))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(api.transport().call_count(), 3);
}

#[tokio::test]
async fn test_spawned_calls_share_the_transport() {
    let api = api(
        ScriptedTransport::new()
            .respond_ok(json!(true))
            .respond_ok(json!(true)),
    );

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let api = api.clone();
            tokio::spawn(async move { api.method("sendChatAction").invoke(()).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(api.transport().call_count(), 2);
}

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn take(&self) -> String {
        String::from_utf8(std::mem::take(&mut *self.0.lock().unwrap())).unwrap()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_quiet_methods_are_not_traced() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let api = api(
        ScriptedTransport::new()
            .respond_ok(json!([]))
            .respond_ok(json!({"message_id": 1})),
    );

    api.method("getUpdates").invoke(json!({"offset": 1})).await.unwrap();
    let quiet = logs.take();
    assert!(!quiet.contains("calling method"), "{quiet}");
    assert!(!quiet.contains("received answer"), "{quiet}");

    api.method("sendMessage").invoke(json!({"chat_id": 1})).await.unwrap();
    let traced = logs.take();
    assert!(traced.contains("calling method"), "{traced}");
    assert!(traced.contains("received answer"), "{traced}");
    assert!(traced.contains("sendMessage"), "{traced}");
}
