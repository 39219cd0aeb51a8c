//! JSON-RPC 2.0 envelopes for the `tasks/send` method.
//!
//! Transport-neutral: both the outbound link and the inbound gateway build
//! and read envelopes through these functions.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{DelegationError, DelegationResult};
use crate::task::{TaskRequest, TaskResult};

pub const JSONRPC_VERSION: &str = "2.0";
pub const TASKS_SEND: &str = "tasks/send";

/// Code for a body that is not valid JSON.
pub const PARSE_ERROR: i64 = -32700;

/// Build the `tasks/send` request envelope.
pub fn tasks_send_request(rpc_id: &str, request: &TaskRequest) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": rpc_id,
        "method": TASKS_SEND,
        "params": {
            "id": request.task_id,
            "sessionId": request.session_id,
            "message": {
                "role": "user",
                "parts": [{ "type": "text", "text": request.message }],
            },
        },
    })
}

/// Read an inbound `tasks/send` envelope.
///
/// A missing task id or session id is replaced by a fresh UUID; a missing
/// method, another method, or a missing text part is rejected.
pub fn parse_tasks_send(body: &Value) -> DelegationResult<TaskRequest> {
    if !body.is_object() {
        return Err(DelegationError::MalformedRequest(
            "request body must be a JSON object".into(),
        ));
    }
    let method = body
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| DelegationError::MalformedRequest("Missing method".into()))?;
    if method != TASKS_SEND {
        return Err(DelegationError::UnsupportedMethod(method.to_string()));
    }

    let params = body.get("params").unwrap_or(&Value::Null);
    let text = params
        .pointer("/message/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            DelegationError::MalformedRequest("params.message.parts[0].text is required".into())
        })?;

    let task_id = non_empty_str(params.get("id")).unwrap_or_else(|| Uuid::new_v4().to_string());
    let session_id =
        non_empty_str(params.get("sessionId")).unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(TaskRequest::new(task_id, session_id, text))
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `params.id` exactly as the caller sent it, so the reply keeps its JSON type.
pub fn caller_task_id(body: &Value) -> Option<Value> {
    body.pointer("/params/id")
        .filter(|id| id.is_number() || id.as_str().is_some_and(|s| !s.is_empty()))
        .cloned()
}

/// The request id to echo back, `null` when the caller sent none.
pub fn request_id(body: &Value) -> Value {
    body.get("id").cloned().unwrap_or(Value::Null)
}

pub fn success_response(id: Value, result: &TaskResult) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result.raw,
    })
}

pub fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": { "code": code, "message": message },
    })
}

/// Extract the task result from a peer's response body.
///
/// An `error` member or a body without `result` is a protocol violation.
pub fn read_task_response(url: &str, body: &Value) -> DelegationResult<TaskResult> {
    if let Some(err) = body.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(DelegationError::protocol(url, format!("peer returned error: {message}")));
    }
    match body.get("result") {
        Some(result) if result.is_object() => Ok(TaskResult::from_value(result.clone())),
        Some(_) => Err(DelegationError::protocol(url, "result member is not an object")),
        None => Err(DelegationError::protocol(url, "response lacks a result member")),
    }
}
