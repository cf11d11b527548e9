//! Response normalisation: raw model text → one [`ExtractedRecord`].
//!
//! Even when told "no triple backticks, no extra text", vision models
//! sometimes wrap their JSON in a ```` ```json ```` fence. This module undoes
//! exactly that and nothing more:
//!
//! 1. Trim surrounding whitespace.
//! 2. If the text starts with a fence (optionally language-tagged) AND ends
//!    with one, drop that single pair. Fences are only recognised at the two
//!    ends; a fence-like run in the middle is content.
//! 3. Parse what is left with `serde_json` as exactly one value, which must
//!    be an object.
//!
//! A record buried in prose is rejected, never dug out. Accepting it would
//! hide a model that is not following the instruction.

use crate::error::ExtractError;
use crate::output::ExtractedRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```$").unwrap()
});

/// Trim and strip one outer fence pair. Returns the text the parser sees.
pub fn clean_answer(raw: &str) -> &str {
    let trimmed = raw.trim();
    match RE_OUTER_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Parse `raw` into a record.
///
/// # Errors
/// [`ExtractError::ResponseFormat`] carrying `raw`, the cleaned text and the
/// reason, when the cleaned text is not valid JSON or not a JSON object.
pub fn normalize_answer(raw: &str) -> Result<ExtractedRecord, ExtractError> {
    let cleaned = clean_answer(raw);
    let fail = |reason: String| ExtractError::ResponseFormat {
        reason,
        raw: raw.to_string(),
        cleaned: cleaned.to_string(),
    };

    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => Ok(ExtractedRecord::from(map)),
        Ok(other) => Err(fail(format!("expected a JSON object, got {}", kind(&other)))),
        Err(e) => Err(fail(e.to_string())),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
