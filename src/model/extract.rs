//! Pull structured data out of free-form model text.

use serde_json::Value;

/// Remove a surrounding ``` fence (with optional `json` tag).
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.trim_start_matches('`');
        if body.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            body = &body[4..];
        }
        body = body.trim();
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest.trim();
    }
    body
}

/// Best-effort JSON extraction. Tries, in order: the whole (unfenced) text,
/// the span from the first `{` to the last `}`, and the whole text with
/// single quotes swapped for double quotes.
pub fn extract_json(text: &str) -> Option<Value> {
    let cleaned = strip_code_fence(text);
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(v) = serde_json::from_str::<Value>(cleaned) {
        return Some(v);
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}'))
        && end > start
        && let Ok(v) = serde_json::from_str::<Value>(&cleaned[start..=end])
    {
        return Some(v);
    }

    serde_json::from_str::<Value>(&cleaned.replace('\'', "\"")).ok()
}

/// Like [`extract_json`] but only accepts an object (or a list whose first
/// element is an object).
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    match extract_json(text)? {
        Value::Object(map) => Some(map),
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

/// Body of the fenced code block spanning the first and last ``` markers.
/// The language tag on the opening fence is dropped.
pub fn extract_code_block(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let end = text.rfind("```")?;
    if end <= start + 3 {
        return None;
    }
    let inner = &text[start + 3..end];
    let body = match inner.find('\n') {
        Some(nl) if !inner[..nl].trim().contains(' ') => &inner[nl + 1..],
        _ => inner,
    };
    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}
