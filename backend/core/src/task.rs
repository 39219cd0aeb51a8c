use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// State reported for a task. Results are synchronous, so a healthy peer
/// answers `Completed`; `Unknown` marks a response without a usable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Submitted,
    Completed,
    Failed,
    Canceled,
    Unknown,
    InputRequired,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
            TaskState::Unknown => "unknown",
            TaskState::InputRequired => "input_required",
        }
    }

    /// Lenient parse; anything unrecognised is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "submitted" => TaskState::Submitted,
            "completed" => TaskState::Completed,
            "failed" => TaskState::Failed,
            "canceled" => TaskState::Canceled,
            "input_required" => TaskState::InputRequired,
            _ => TaskState::Unknown,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One task handed to an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    /// Caller-generated, unique per call.
    pub task_id: String,
    /// Opaque conversation tag, forwarded untouched.
    pub session_id: String,
    pub message: String,
}

impl TaskRequest {
    pub fn new(
        task_id: impl Into<String>,
        session_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            session_id: session_id.into(),
            message: message.into(),
        }
    }

    /// A request with a fresh task id.
    pub fn fresh(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), session_id, message)
    }
}

/// Outcome of one task as carried in the JSON-RPC `result` member.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub task_id: Option<String>,
    pub state: TaskState,
    pub output: String,
    /// The `result` member exactly as received (or as it will be sent).
    pub raw: Value,
}

impl TaskResult {
    pub fn new(task_id: impl Into<String>, state: TaskState, output: impl Into<String>) -> Self {
        let task_id = task_id.into();
        let output = output.into();
        let raw = json!({
            "id": task_id,
            "status": { "state": state },
            "output": output,
        });
        Self {
            task_id: Some(task_id),
            state,
            output,
            raw,
        }
    }

    pub fn completed(task_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(task_id, TaskState::Completed, output)
    }

    pub fn failed(task_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(task_id, TaskState::Failed, output)
    }

    /// Replace the `id` sent on the wire, keeping `task_id` as is.
    pub fn with_wire_id(mut self, id: Value) -> Self {
        if let Value::Object(map) = &mut self.raw {
            map.insert("id".to_string(), id);
        }
        self
    }

    /// Read a peer's `result` member. Missing pieces fall back to
    /// `Unknown`/empty rather than failing.
    pub fn from_value(raw: Value) -> Self {
        let state = raw
            .pointer("/status/state")
            .and_then(Value::as_str)
            .map(TaskState::parse)
            .unwrap_or(TaskState::Unknown);
        let task_id = match raw.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let output = match raw.get("output") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self {
            task_id,
            state,
            output,
            raw,
        }
    }
}
