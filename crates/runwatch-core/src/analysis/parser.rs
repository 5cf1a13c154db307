//! Decoding of stored run payloads
//!
//! Extracted trace files either hold the run itself or wrap it in an
//! envelope `{"trace": {...}, ...}` alongside extraction metadata.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::Run;

/// Envelope key wrapping the run payload
pub const ENVELOPE_KEY: &str = "trace";

/// Deepest JSON nesting accepted from a trace document.
///
/// Each `child_runs` level adds two (the array and the run object), so this
/// admits traces about 500 runs deep, past the default walk depth.
pub const MAX_NESTING: usize = 1024;

/// Parse a run from JSON text.
///
/// Returns `Ok(None)` when the document carries no run (an empty or null
/// envelope, or an object that is neither envelope nor run).
///
/// Documents nested deeper than [`MAX_NESTING`] are a parse error. Anything
/// shallower is decoded without serde_json's default recursion limit, so
/// deep traces reach the walker and its own bounds.
pub fn parse_run_str(source_name: &str, text: &str) -> Result<Option<Run>> {
    let depth = nesting_depth(text);
    if depth > MAX_NESTING {
        return Err(Error::parse(
            source_name,
            format!("nesting depth {depth} exceeds {MAX_NESTING}"),
        ));
    }

    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(&mut deserializer).map_err(|e| Error::parse(source_name, e))?;
    deserializer.end().map_err(|e| Error::parse(source_name, e))?;

    parse_run_value(source_name, value)
}

/// Deepest array/object nesting in a JSON text, ignoring brackets in strings
fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// Parse a run from an already-decoded JSON value
pub fn parse_run_value(source_name: &str, value: Value) -> Result<Option<Run>> {
    let Value::Object(mut map) = value else {
        return Err(Error::parse(source_name, "expected a JSON object"));
    };

    let payload = match map.remove(ENVELOPE_KEY) {
        Some(Value::Null) => return Ok(None),
        Some(inner) => inner,
        None if map.contains_key("id") => Value::Object(map),
        None => return Ok(None),
    };

    serde_json::from_value(payload)
        .map(Some)
        .map_err(|e| Error::parse(source_name, e))
}

/// Read and parse a run file
pub fn load_run_file(path: &Path) -> Result<Option<Run>> {
    let text = std::fs::read_to_string(path)?;
    parse_run_str(&path.display().to_string(), &text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Enveloped trace `levels` runs deep whose innermost run is a failing scraper
    pub(crate) fn deep_trace(levels: usize) -> String {
        let mut json = String::from(
            r#"{"id": "leaf", "trace_id": "run-0", "name": "zenrows_scraper", "status": "error", "error": "Read timed out"}"#,
        );
        for level in (0..levels.saturating_sub(1)).rev() {
            json = format!(
                r#"{{"id": "run-{level}", "trace_id": "run-0", "name": "agent", "status": "success", "child_runs": [{json}]}}"#
            );
        }
        format!(r#"{{"trace": {json}}}"#)
    }

    #[test]
    fn test_unwraps_envelope() {
        let run = parse_run_value(
            "t.json",
            json!({"trace": {"id": "r1", "name": "agent"}, "extracted_at": "2025-08-29"}),
        )
        .unwrap()
        .unwrap();
        assert_eq!(run.id, "r1");
        assert!(!run.other.contains_key("extracted_at"));
    }

    #[test]
    fn test_bare_run_is_accepted() {
        let run = parse_run_str("t.json", r#"{"id": "r2", "name": "agent"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(run.id, "r2");
    }

    #[test]
    fn test_missing_payload_is_no_data() {
        assert!(parse_run_value("t.json", json!({"trace": null})).unwrap().is_none());
        assert!(parse_run_value("t.json", json!({"summary": {"count": 3}}))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_run_str("broken.json", "{not json").unwrap_err();
        assert!(matches!(err, Error::Parse { ref source_name, .. } if source_name == "broken.json"));
    }

    #[test]
    fn test_nesting_depth_ignores_brackets_in_strings() {
        assert_eq!(nesting_depth(r#"{"a": [1, {"b": "]]}}[[\\\"{"}]}"#), 3);
        assert_eq!(nesting_depth("42"), 0);
    }

    #[test]
    fn test_trace_deeper_than_default_recursion_limit_parses() {
        let run = parse_run_str("deep.json", &deep_trace(80)).unwrap().unwrap();
        assert_eq!(run.id, "run-0");

        let mut depth = 0;
        let mut node = &run;
        while let Some(child) = node.children().first() {
            node = child;
            depth += 1;
        }
        assert_eq!(depth, 79);
        assert_eq!(node.id, "leaf");
    }

    #[test]
    fn test_excessive_nesting_is_parse_error() {
        let text = format!("{}{}", "[".repeat(MAX_NESTING + 1), "]".repeat(MAX_NESTING + 1));
        let err = parse_run_str("nested.json", &text).unwrap_err();
        assert!(matches!(err, Error::Parse { ref reason, .. } if reason.contains("nesting depth")));
    }

    #[test]
    fn test_non_object_is_parse_error() {
        assert!(parse_run_value("t.json", json!([1, 2])).is_err());
    }
}
