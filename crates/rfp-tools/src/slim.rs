//! Argument clipping and output slimming shared by every tool handler
//! (`spec.md` §4.4: "all tool arguments are clipped to maximum string
//! lengths; all outputs are slimmed").
//!
//! The recursive depth check here is the same shape as
//! `abp_json_guard::exceeds_depth`, just transforming instead of only
//! validating.

use serde_json::Value;

/// Maximum nesting depth a slimmed output may retain before deeper
/// structure is collapsed into a summary string.
pub const MAX_OUTPUT_DEPTH: usize = 3;
/// Maximum list items kept per array before the rest is replaced by a
/// `<truncated:n>` marker.
pub const MAX_LIST_ITEMS: usize = 20;
/// Clip width for the long free-text fields the model tends to dump into
/// (`rawText`, `content`, `html`, `body`): 1.2-1.8 kB of UTF-8, expressed
/// here as a character count since every such field is plain text.
pub const LONG_FIELD_CLIP_CHARS: usize = 1500;
/// Safety-net clip width for any other string, so a single huge leaf can't
/// blow past the list/depth budget.
pub const GENERAL_STRING_CLIP_CHARS: usize = 4000;
/// Maximum length of any single argument string passed into a tool call.
pub const MAX_ARG_STRING_CHARS: usize = 2000;

const LONG_FIELDS: &[&str] = &["rawText", "content", "html", "body"];

fn clip_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut clipped: String = s.chars().take(max_chars).collect();
        clipped.push_str("...<clipped>");
        clipped
    }
}

/// Recursively clips every string argument to [`MAX_ARG_STRING_CHARS`].
/// Structure (depth, list length) is left untouched — arguments are
/// caller-supplied and already narrow by schema.
pub fn clip_args(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(clip_chars(s, MAX_ARG_STRING_CHARS)),
        Value::Array(items) => Value::Array(items.iter().map(clip_args).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), clip_args(v))).collect()),
        other => other.clone(),
    }
}

/// Recursively slims a tool's successful output: depth beyond
/// [`MAX_OUTPUT_DEPTH`] collapses into a summary string, lists beyond
/// [`MAX_LIST_ITEMS`] truncate with a `<truncated:n>` marker, and named
/// long fields clip tighter than other strings.
pub fn slim_output(value: &Value) -> Value {
    slim_at(value, 0)
}

fn slim_at(value: &Value, depth: usize) -> Value {
    match value {
        Value::Object(map) => {
            if depth >= MAX_OUTPUT_DEPTH {
                return Value::String(format!("<object:{}keys>", map.len()));
            }
            let slimmed = map
                .iter()
                .map(|(k, v)| {
                    let slimmed_v = if LONG_FIELDS.contains(&k.as_str()) {
                        match v {
                            Value::String(s) => Value::String(clip_chars(s, LONG_FIELD_CLIP_CHARS)),
                            other => slim_at(other, depth + 1),
                        }
                    } else {
                        slim_at(v, depth + 1)
                    };
                    (k.clone(), slimmed_v)
                })
                .collect();
            Value::Object(slimmed)
        }
        Value::Array(items) => {
            if depth >= MAX_OUTPUT_DEPTH {
                return Value::String(format!("<array:{}items>", items.len()));
            }
            let mut slimmed: Vec<Value> = items.iter().take(MAX_LIST_ITEMS).map(|v| slim_at(v, depth + 1)).collect();
            if items.len() > MAX_LIST_ITEMS {
                slimmed.push(Value::String(format!("<truncated:{}>", items.len() - MAX_LIST_ITEMS)));
            }
            Value::Array(slimmed)
        }
        Value::String(s) => Value::String(clip_chars(s, GENERAL_STRING_CLIP_CHARS)),
        other => other.clone(),
    }
}
