use crate::agent::AgentError;
use serde_json::Value;

/// Pull the storyboard JSON object out of free-form model output.
///
/// Tries, in order: the whole text as JSON; a JSON string holding the document (unwrapped once);
/// the first balanced `{...}` span that parses as an object.
pub fn extract_document(text: &str) -> Result<Value, AgentError> {
    extract(text, true)
}

fn extract(text: &str, unwrap_string: bool) -> Result<Value, AgentError> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(v @ Value::Object(_)) => return Ok(v),
        Ok(Value::String(inner)) if unwrap_string => return extract(&inner, false),
        _ => {}
    }
    first_object(text).ok_or(AgentError::NoDocument)
}

/// Opening braces tried as object starts before giving up.
const MAX_CANDIDATES: usize = 64;

/// First `{...}` span that parses as a JSON object. Braces inside string literals are skipped.
///
/// Only the first [`MAX_CANDIDATES`] opening braces are tried.
fn first_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut from = 0;
    for _ in 0..MAX_CANDIDATES {
        let offset = text[from..].find('{')?;
        let start = from + offset;
        if let Some(end) = balanced_end(&bytes[start..]) {
            let candidate = &text[start..start + end];
            if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
                return Some(v);
            }
        }
        from = start + 1;
    }
    tracing::debug!(tried = MAX_CANDIDATES, "no JSON object among the first candidates");
    None
}

/// Byte length of the balanced brace group starting at `s[0] == b'{'`, if it closes.
fn balanced_end(s: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in s.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Replace a wrapper document whose only scene carries the real storyboard JSON in its
/// `description` with that inner storyboard.
///
/// The inner document inherits the outer `title` and `description` when it lacks them. Anything
/// else is returned unchanged.
pub fn unwrap_embedded(doc: Value) -> Value {
    let inner = match doc.get("scenes").and_then(Value::as_array) {
        Some(scenes) if scenes.len() == 1 => scenes[0]
            .get("description")
            .and_then(Value::as_str)
            .and_then(|s| serde_json::from_str::<Value>(s.trim()).ok()),
        _ => None,
    };
    let Some(Value::Object(mut inner)) = inner else {
        return doc;
    };
    if !inner.get("scenes").is_some_and(Value::is_array) {
        return doc;
    }
    for key in ["title", "description"] {
        if !inner.contains_key(key)
            && let Some(v) = doc.get(key)
        {
            inner.insert(key.to_owned(), v.clone());
        }
    }
    tracing::debug!("unwrapped storyboard embedded in scene description");
    Value::Object(inner)
}

#[cfg(test)]
#[path = "../../tests/unit/agent/extract.rs"]
mod tests;
