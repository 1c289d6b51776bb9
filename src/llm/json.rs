//! Locating a JSON object inside free-form backend output.
//!
//! Backends wrap JSON in markdown fences or surround it with prose. The
//! review parser and the Claude envelope both go through [`extract_json`].

use serde_json::Value;

/// Extract the first JSON object from `response`.
///
/// Tries, in order: a ` ```json ` fenced block, a bare fenced block whose
/// content starts with `{`, then the first `{` from which a complete object
/// can be decoded (trailing text is ignored). Falls back to the trimmed
/// input so the caller's parse error shows what the backend said.
pub fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(inner) = fenced_block(trimmed, "```json") {
        return inner.to_string();
    }
    if let Some(inner) = fenced_block(trimmed, "```")
        && inner.starts_with('{')
    {
        return inner.to_string();
    }

    first_object(trimmed).unwrap_or_else(|| trimmed.to_string())
}

fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let end = text[start..].find("```")?;
    Some(text[start..start + end].trim())
}

fn first_object(text: &str) -> Option<String> {
    text.match_indices('{').find_map(|(idx, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[idx..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value @ Value::Object(_))) => Some(value.to_string()),
            _ => None,
        }
    })
}
