//! Structural extraction of the answer from captured stdout.
//!
//! Nothing here fails: when the output does not have the expected shape the
//! raw text is handed back untouched.

use crate::config::OutputFormat;
use serde_json::Value;

/// Keys probed, in order, on a JSON object.
const CONTENT_KEYS: [&str; 3] = ["content", "result", "message"];

pub fn parse_output(format: OutputFormat, stdout: &str) -> String {
    match format {
        OutputFormat::Text => stdout.trim().to_owned(),
        OutputFormat::Json => parse_json(stdout),
        OutputFormat::Jsonl => parse_jsonl(stdout),
    }
}

fn parse_json(stdout: &str) -> String {
    serde_json::from_str::<Value>(stdout)
        .ok()
        .as_ref()
        .and_then(extract_content)
        .unwrap_or_else(|| stdout.to_owned())
}

fn parse_jsonl(stdout: &str) -> String {
    let mut fragments = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => fragments.extend(extract_content(&value)),
            Err(_) => fragments.push(line.to_owned()),
        }
    }

    if fragments.is_empty() {
        stdout.to_owned()
    } else {
        fragments.join("\n")
    }
}

fn extract_content(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    CONTENT_KEYS
        .iter()
        .filter_map(|key| object.get(*key))
        .find(|v| !v.is_null())
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}
