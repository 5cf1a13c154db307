//! Run data model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One recorded execution unit (a span) of a captured trace.
///
/// Only the fields the analysis reads are typed; everything else the
/// tracing API returned (`run_type`, `session_id`, `dotted_order`, `tags`,
/// ...) is kept verbatim in [`Run::other`] so reports can pass it through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier
    #[serde(default)]
    pub id: String,

    /// Trace this run belongs to; equals `id` on the root run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Parent run ID (`None` for a root run)
    #[serde(default)]
    pub parent_run_id: Option<String>,

    /// Free-text operation label
    #[serde(default)]
    pub name: String,

    /// Free-text status, compared case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Start timestamp as captured (format varies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    /// End timestamp as captured (format varies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    /// Error message, if the run failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Run inputs
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub inputs: Value,

    /// Run outputs
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub outputs: Value,

    /// Run metadata
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,

    /// Extra tracer-provided data
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub extra: Value,

    /// Nested child runs; absent and `null` both mean "no children"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_runs: Option<Vec<Run>>,

    /// Fields not consumed by the analysis, preserved as-is
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Run {
    /// Whether this run has no parent
    pub fn is_root(&self) -> bool {
        self.parent_run_id.is_none()
    }

    /// Whether the status reads "error", ignoring case
    pub fn is_error(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("error"))
    }

    /// The run's trace ID, or an empty string when absent
    pub fn trace_id(&self) -> &str {
        self.trace_id.as_deref().unwrap_or_default()
    }

    /// Child runs, empty when absent or `null`
    pub fn children(&self) -> &[Run] {
        self.child_runs.as_deref().unwrap_or_default()
    }

    /// Error message with the `"Unknown error"` default applied
    pub fn error_message(&self) -> &str {
        match self.error.as_deref() {
            Some(message) if !message.is_empty() => message,
            _ => "Unknown error",
        }
    }

    /// Scraped URL, trying `inputs.input`, `inputs.url`, `inputs.target_url` in turn
    pub fn target_url(&self) -> Option<String> {
        ["input", "url", "target_url"]
            .iter()
            .filter_map(|key| self.inputs.get(*key))
            .find_map(|value| match value {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
    }

    /// Depth marker `extra.metadata.ls_run_depth`, when the tracer recorded one
    pub fn run_depth(&self) -> Option<u64> {
        self.extra
            .get("metadata")
            .and_then(|metadata| metadata.get("ls_run_depth"))
            .and_then(Value::as_u64)
    }
}
