//! Failure records derived from walked traces

use serde::{Deserialize, Serialize};

use super::Run;

/// Literal used when no crypto symbol could be resolved
pub const UNKNOWN_SYMBOL: &str = "Unknown";

/// A failing run found by the error walker.
///
/// Carries both the basic fields (status, end time) and the detail field
/// (target URL) so one walk serves both report flavours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRun {
    /// ID of the failing run
    pub id: String,
    /// Trace the failing run belongs to
    pub trace_id: String,
    /// Operation name
    pub name: String,
    /// Status as captured
    pub status: String,
    /// Error message (`"Unknown error"` when absent)
    pub error: String,
    /// Start timestamp as captured
    pub start_time: Option<String>,
    /// End timestamp as captured
    pub end_time: Option<String>,
    /// Scraped URL, when the inputs carried one
    pub target_url: Option<String>,
}

impl From<&Run> for FailedRun {
    fn from(run: &Run) -> Self {
        Self {
            id: run.id.clone(),
            trace_id: run.trace_id().to_string(),
            name: run.name.clone(),
            status: run.status.clone().unwrap_or_default(),
            error: run.error_message().to_string(),
            start_time: run.start_time.clone(),
            end_time: run.end_time.clone(),
            target_url: run.target_url(),
        }
    }
}

/// A failure attributed to its root trace and crypto symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// ID of the failing run
    pub trace_id: String,
    /// ID of the resolved root run
    pub root_trace_id: String,
    /// Uppercase ticker, or [`UNKNOWN_SYMBOL`]
    pub crypto_symbol: String,
    /// Error message
    pub error_message: String,
    /// Start timestamp of the failing run
    pub start_time: Option<String>,
    /// Scraped URL, when known
    pub target_url: Option<String>,
    /// Operation name of the failing run
    pub name: String,
    /// Error category, when the caller classified it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ErrorDetail {
    /// Attribute a failed run to a root and symbol
    pub fn new(
        failure: FailedRun,
        root_trace_id: impl Into<String>,
        crypto_symbol: impl Into<String>,
    ) -> Self {
        Self {
            trace_id: failure.id,
            root_trace_id: root_trace_id.into(),
            crypto_symbol: crypto_symbol.into(),
            error_message: failure.error,
            start_time: failure.start_time,
            target_url: failure.target_url,
            name: failure.name,
            category: None,
        }
    }
}
