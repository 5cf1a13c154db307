//! Detail reports: the symbol/root hierarchy as JSON

use serde::Serialize;

use crate::error::Result;
use crate::models::Hierarchy;

/// Pretty-printed `{symbol: {root_trace_id: ...}}` document
pub fn render_detail_json(hierarchy: &Hierarchy) -> Result<String> {
    Ok(serde_json::to_string_pretty(hierarchy)?)
}

/// Per-symbol totals for console summaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolSummary {
    /// Crypto symbol
    pub symbol: String,
    /// Distinct root traces with failures
    pub roots: usize,
    /// Failures across those roots
    pub errors: usize,
}

/// Summaries ordered by error count, most failures first
pub fn summarize(hierarchy: &Hierarchy) -> Vec<SymbolSummary> {
    let mut summaries: Vec<SymbolSummary> = hierarchy
        .iter()
        .map(|(symbol, roots)| SymbolSummary {
            symbol: symbol.clone(),
            roots: roots.len(),
            errors: roots.values().map(|entry| entry.errors().len()).sum(),
        })
        .collect();
    summaries.sort_by(|a, b| b.errors.cmp(&a.errors).then_with(|| a.symbol.cmp(&b.symbol)));
    summaries
}
