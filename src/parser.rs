use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{0000}-\x{001F}\x{007F}-\x{009F}]").unwrap());

static GREEDY_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

/// Replace control characters with spaces.
///
/// LLMs routinely put raw newlines inside JSON string values, which makes the
/// document invalid. Outside of strings a space is valid whitespace, so the
/// substitution never breaks an otherwise valid object.
pub fn sanitize(text: &str) -> String {
    CONTROL_CHARS.replace_all(text, " ").into_owned()
}

/// Extract the first JSON object from a string that may contain surrounding text.
///
/// Handles the usual LLM reply shapes:
/// - Clean JSON: `{"key": "value"}`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prefix/suffix text: `Here is the plan:\n{"key": "value"}\nGood luck!`
pub fn extract_json(text: &str) -> Result<String> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && is_json_object(trimmed) {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if is_json_object(&json_str) {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = balanced_objects(trimmed)
        .into_iter()
        .find(|candidate| is_json_object(candidate))
    {
        return Ok(json_str.to_string());
    }

    // Widest span from the first `{` to the last `}`
    if let Some(found) = GREEDY_OBJECT.find(trimmed) {
        if is_json_object(found.as_str()) {
            return Ok(found.as_str().to_string());
        }
    }

    Err(anyhow!(
        "No valid JSON object found in response (length={})",
        text.len()
    ))
}

fn is_json_object(candidate: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(candidate),
        Ok(serde_json::Value::Object(_))
    )
}

/// Extract JSON from a markdown code block (```json ... ``` or ``` ... ```)
fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json", "```JSON", "```"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let json_start = start + marker.len();
            if let Some(end) = text[json_start..].find("```") {
                let extracted = text[json_start..json_start + end].trim();
                return Some(extracted.to_string());
            }
        }
    }

    None
}

/// Every top-level balanced `{ ... }` span in the text, in order.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' if depth > 0 => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        found.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    found
}

/// Parse a typed value out of free-form LLM text.
pub fn parse_llm_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let cleaned = sanitize(text);
    let json_str = extract_json(&cleaned)?;
    serde_json::from_str(&json_str).map_err(|e| anyhow!("Failed to parse LLM JSON: {e}"))
}

/// Parse LLM text into `T`, substituting `fallback()` when it cannot be parsed.
///
/// The boolean is `true` when the fallback was used.
pub fn parse_or_fallback<T, F>(agent: &str, text: &str, fallback: F) -> (T, bool)
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match parse_llm_json(text) {
        Ok(value) => (value, false),
        Err(e) => {
            log::warn!("[{}] JSON parsing failed, using fallback data: {}", agent, e);
            (fallback(), true)
        }
    }
}
