//! Pulling JSON out of free-form model replies.
//!
//! Models wrap JSON in code fences or surround it with prose. The fenced
//! body is preferred; failing a direct parse, the widest `{...}` or `[...]`
//! span is tried.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").expect("fence regex should compile")
});
static OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("object span regex should compile"));
static ARRAY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("array span regex should compile"));

fn unfenced(reply: &str) -> &str {
    let text = reply.trim();
    FENCED
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str().trim())
}

fn find<T>(reply: &str, span: &Regex, accept: impl Fn(Value) -> Option<T>) -> Option<T> {
    let text = unfenced(reply);
    if let Some(found) = serde_json::from_str(text).ok().and_then(&accept) {
        return Some(found);
    }
    let span = span.find(text)?;
    serde_json::from_str(span.as_str()).ok().and_then(accept)
}

/// The JSON object in a model reply, if there is one.
pub fn extract_json_object(reply: &str) -> Option<Map<String, Value>> {
    find(reply, &OBJECT_SPAN, |value| match value {
        Value::Object(map) => Some(map),
        _ => None,
    })
}

/// The JSON array in a model reply, if there is one.
pub fn extract_json_array(reply: &str) -> Option<Vec<Value>> {
    find(reply, &ARRAY_SPAN, |value| match value {
        Value::Array(items) => Some(items),
        _ => None,
    })
}
