//! The single shape every `call_model` returns.

use crate::message::{Message, Role};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Terminal state of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    /// The child exited non-zero.
    ApplicationError,
    Timeout,
    /// Anything else that went wrong while building, running or parsing.
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResponse {
    pub message: Message,
    /// Diagnostics: `returncode`/`stdout`/`stderr` for completed runs,
    /// an `error` tag otherwise.
    pub raw_response: Value,
    pub outcome: CallOutcome,
}

impl ModelResponse {
    pub fn success(content: String, returncode: i32, stdout: String, stderr: String) -> Self {
        Self {
            message: Message::new(Role::Assistant, content),
            raw_response: json!({
                "stdout": stdout,
                "stderr": stderr,
                "returncode": returncode,
            }),
            outcome: CallOutcome::Success,
        }
    }

    pub fn application_error(label: &str, returncode: i32, stdout: String, stderr: String) -> Self {
        let detail = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        Self {
            message: Message::new(
                Role::Assistant,
                format!("{label} error (code {returncode}): {detail}"),
            ),
            raw_response: json!({
                "returncode": returncode,
                "stderr": stderr,
                "stdout": stdout,
            }),
            outcome: CallOutcome::ApplicationError,
        }
    }

    pub fn timeout(label: &str, timeout_secs: u64) -> Self {
        Self {
            message: Message::new(
                Role::Assistant,
                format!("{label} timed out after {timeout_secs} seconds."),
            ),
            raw_response: json!({
                "error": "timeout",
                "timeout": timeout_secs,
            }),
            outcome: CallOutcome::Timeout,
        }
    }

    pub fn internal_error(label: &str, error: &dyn std::fmt::Display) -> Self {
        let description = error.to_string();
        Self {
            message: Message::new(
                Role::Assistant,
                format!("{label} execution error: {description}"),
            ),
            raw_response: json!({ "error": description }),
            outcome: CallOutcome::InternalError,
        }
    }

    pub fn content(&self) -> String {
        self.message.text_content()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == CallOutcome::Success
    }

    /// `raw_response.returncode`, when the child ran to completion.
    pub fn returncode(&self) -> Option<i64> {
        self.raw_response.get("returncode").and_then(Value::as_i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub metadata: Map<String, Value>,
}

impl TokenUsage {
    /// Zero counts, flagged as unavailable. CLIs do not report usage.
    pub fn unavailable(provider: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert("provider".to_owned(), Value::from(provider));
        metadata.insert(
            "note".to_owned(),
            Value::from("Token usage not available from CLI"),
        );
        Self {
            metadata,
            ..Self::default()
        }
    }
}
