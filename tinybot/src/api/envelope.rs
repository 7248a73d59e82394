//! # Response Envelope
//!
//! Every response of the remote service is wrapped as `{"ok": true, "result": ...}` on success
//! or `{"ok": false, "description": "..."}` on failure. The field names are part of the wire
//! contract and must not change.
use super::RequestError;
use crate::view::Node;
use serde_json::Value;

const OK: &str = "ok";
const RESULT: &str = "result";
const DESCRIPTION: &str = "description";

/// Validates a decoded response and extracts its `result` subtree.
///
/// # Returns
///
/// * `Ok(Node)` - `ok` is `true` and `result` is present and not `null`.
/// * `Err(RequestError::Remote)` - `ok` is `false` or absent and a `description` is present.
/// * `Err(RequestError::MalformedResponse)` - Anything else, carrying the raw response.
pub fn unwrap_envelope(method: &str, response: Value) -> Result<Node, RequestError> {
    let envelope = Node::new(response);
    let ok = envelope.get(OK).is_ok_and(|ok| ok == true);

    if ok && let Ok(result) = envelope.get(RESULT) {
        return Ok(result);
    }

    if !ok && let Ok(description) = envelope.get(DESCRIPTION) {
        let description = match description.as_str() {
            Ok(text) => text.to_string(),
            Err(_) => description.to_string(),
        };
        return Err(RequestError::Remote {
            method: method.to_string(),
            description,
        });
    }

    Err(RequestError::MalformedResponse {
        method: method.to_string(),
        response: envelope.into_value(),
    })
}
