//! Recovering a JSON document from free-form model output.

use serde_json::Value;

/// Strip a surrounding Markdown code fence, preferring a ```` ```json ```` block.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    for opener in ["```json", "```JSON", "```"] {
        if let Some(start) = text.find(opener) {
            let body = &text[start + opener.len()..];
            let body = match body.find("```") {
                Some(end) => &body[..end],
                None => body,
            };
            return body.trim();
        }
    }
    text
}

/// Parse the JSON document inside `text`.
///
/// The trimmed text is tried as-is first, since string values may contain
/// Markdown fences of their own. Only then the fenced body and finally the
/// outermost `{...}` span.
///
/// # Errors
///
/// The `serde_json` error of the first attempt when nothing parses.
pub fn parse_document(text: &str) -> Result<Value, serde_json::Error> {
    let first = match serde_json::from_str(text.trim()) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    let body = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str(body) {
        return Ok(value);
    }
    match (body.find('{'), body.rfind('}')) {
        (Some(open), Some(close)) if open < close => {
            serde_json::from_str(&body[open..=close]).map_err(|_| first)
        }
        _ => Err(first),
    }
}
