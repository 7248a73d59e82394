#![allow(dead_code)]

use serde_json::{Map, Value, json};
use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tinybot::transport::{Transport, TransportError};

/// A transport replaying queued responses and recording every call it receives.
///
/// Every call yields to the scheduler once before answering, so concurrent calls interleave.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, String>>>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    count: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw decoded response.
    pub fn respond(self, response: Value) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queues a successful envelope around `result`.
    pub fn respond_ok(self, result: Value) -> Self {
        self.respond(json!({ "ok": true, "result": result }))
    }

    /// Queues a transport failure.
    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    async fn call(&self, method: &str, args: Map<String, Value>) -> Result<Value, TransportError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.calls.lock().unwrap().push((method.to_string(), args));

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::other(message)),
            None => Err(TransportError::other(format!(
                "no scripted response left for '{method}'"
            ))),
        }
    }
}
