//! Per-date failure statistics

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-date stats keyed by `YYYY-MM-DD`; iteration is chronological
pub type DailyStats = BTreeMap<String, DailyStat>;

/// Error rate as a percentage (0–100) rounded to one decimal place.
///
/// Both the single-project and the merged multi-project paths produce this
/// representation; [`ErrorRate::fraction`] gives the 0–1 view.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorRate(f64);

impl ErrorRate {
    /// Rate of `errors` over `total`; zero when `total` is zero
    pub fn from_counts(errors: u64, total: u64) -> Self {
        if total == 0 {
            return Self(0.0);
        }
        let percent = errors as f64 / total as f64 * 100.0;
        // halves go to the even digit: 0.25 reads 0.2, 12.25 reads 12.2
        Self((percent * 10.0).round_ties_even() / 10.0)
    }

    /// Percentage value
    pub fn percent(self) -> f64 {
        self.0
    }

    /// Value in the 0–1 range
    pub fn fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl fmt::Display for ErrorRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Failure counts for one date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStat {
    /// Root runs seen on the date (the denominator)
    pub total_traces: u64,
    /// Matching failures across root and descendant runs
    pub zenrows_errors: u64,
    /// `zenrows_errors / total_traces` as a percentage
    pub error_rate: ErrorRate,
    /// Failures per category, when categorization was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeMap<String, u64>>,
}

impl DailyStat {
    /// Recompute `error_rate` from the current counts
    pub fn refresh_rate(&mut self) {
        self.error_rate = ErrorRate::from_counts(self.zenrows_errors, self.total_traces);
    }

    /// Count recorded for `category`, zero when absent
    pub fn category_count(&self, category: &str) -> u64 {
        self.categories
            .as_ref()
            .and_then(|categories| categories.get(category))
            .copied()
            .unwrap_or(0)
    }
}
