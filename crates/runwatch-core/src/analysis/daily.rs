//! Per-date failure rates and category breakdowns
//!
//! The denominator is the number of root runs on a date; the numerator is
//! every matching failure on that date, root or descendant. Counting all
//! runs as traces would inflate the denominator and understate the rate.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::category::{ErrorClassifier, ErrorContext};
use super::dates::date_key;
use super::walker::ErrorWalker;
use crate::models::{DailyStat, DailyStats, Run};

/// Computes [`DailyStats`] from runs grouped by date
#[derive(Debug, Clone, Default)]
pub struct DailyAggregator {
    walker: ErrorWalker,
    classifier: Option<ErrorClassifier>,
    project: Option<String>,
}

impl DailyAggregator {
    /// Create an aggregator using `walker` to find failures
    pub fn new(walker: ErrorWalker) -> Self {
        Self {
            walker,
            classifier: None,
            project: None,
        }
    }

    /// Break failures down by category
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Project name recorded with unrecognized errors
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Stats for every date in `runs_by_date`
    pub fn analyze(&self, runs_by_date: &BTreeMap<String, Vec<Run>>) -> DailyStats {
        runs_by_date
            .iter()
            .map(|(date, runs)| (date.clone(), self.analyze_date(runs)))
            .collect()
    }

    /// Stats for the runs of a single date
    pub fn analyze_date(&self, runs: &[Run]) -> DailyStat {
        let mut stat = DailyStat {
            categories: self.classifier.as_ref().map(|classifier| {
                classifier
                    .table()
                    .column_order()
                    .into_iter()
                    .map(|name| (name.to_string(), 0))
                    .collect()
            }),
            ..DailyStat::default()
        };

        for run in runs {
            if run.is_root() {
                stat.total_traces += 1;
            }

            let outcome = self.walker.find_errors(run);
            stat.zenrows_errors += outcome.errors.len() as u64;

            if let (Some(classifier), Some(categories)) = (&self.classifier, stat.categories.as_mut()) {
                for failure in &outcome.errors {
                    let context = ErrorContext {
                        project: self.project.as_deref(),
                        trace_id: Some(&failure.id),
                    };
                    let category = classifier.categorize_with_context(&failure.error, context);
                    *categories.entry(category.to_string()).or_insert(0) += 1;
                }
            }
        }

        stat.refresh_rate();
        debug!(
            runs = runs.len(),
            total_traces = stat.total_traces,
            errors = stat.zenrows_errors,
            "Analyzed date"
        );
        stat
    }
}

/// Group runs by the calendar date of their `start_time`.
///
/// Runs without a usable start time are skipped with a warning.
pub fn group_by_date(runs: impl IntoIterator<Item = Run>) -> BTreeMap<String, Vec<Run>> {
    let mut grouped: BTreeMap<String, Vec<Run>> = BTreeMap::new();
    for run in runs {
        match run.start_time.as_deref().and_then(date_key) {
            Some(date) => grouped.entry(date).or_default().push(run),
            None => warn!(run = %run.id, start_time = ?run.start_time, "Run has no usable start date"),
        }
    }
    grouped
}

/// Merge per-project stats into one view.
///
/// Counts are summed per date and category, and each rate is recomputed
/// from the merged counts rather than averaged.
pub fn merge_daily_stats(parts: impl IntoIterator<Item = DailyStats>) -> DailyStats {
    let mut merged = DailyStats::new();

    for part in parts {
        for (date, stat) in part {
            let target = merged.entry(date).or_default();
            target.total_traces += stat.total_traces;
            target.zenrows_errors += stat.zenrows_errors;

            if let Some(categories) = stat.categories {
                let target_categories = target.categories.get_or_insert_with(BTreeMap::new);
                for (name, count) in categories {
                    *target_categories.entry(name).or_insert(0) += count;
                }
            }
        }
    }

    for stat in merged.values_mut() {
        stat.refresh_rate();
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::category::UNKNOWN_CATEGORY;
    use crate::models::ErrorRate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn root(id: &str, status: &str) -> Run {
        Run {
            id: id.to_string(),
            trace_id: Some(id.to_string()),
            name: "crypto_agent".to_string(),
            status: Some(status.to_string()),
            start_time: Some("2025-08-29T10:00:00.000000Z".to_string()),
            ..Run::default()
        }
    }

    fn scraper(id: &str, parent: &str, status: &str, error: &str) -> Run {
        Run {
            id: id.to_string(),
            trace_id: Some(parent.to_string()),
            parent_run_id: Some(parent.to_string()),
            name: "zenrows_scraper".to_string(),
            status: Some(status.to_string()),
            error: Some(error.to_string()),
            start_time: Some("2025-08-29 10:00:05.123456".to_string()),
            ..Run::default()
        }
    }

    #[test]
    fn test_root_with_failing_child() {
        let runs = vec![root("r1", "success"), scraper("c1", "r1", "error", "HTTP 429")];
        let stats = DailyAggregator::default().analyze(&group_by_date(runs));

        let stat = &stats["2025-08-29"];
        assert_eq!(stat.total_traces, 1);
        assert_eq!(stat.zenrows_errors, 1);
        assert_eq!(stat.error_rate.percent(), 100.0);
        assert!(stat.categories.is_none());
    }

    #[test]
    fn test_no_roots_means_zero_rate() {
        let stat = DailyAggregator::default().analyze_date(&[scraper("c1", "r1", "error", "x")]);
        assert_eq!(stat.total_traces, 0);
        assert_eq!(stat.zenrows_errors, 1);
        assert_eq!(stat.error_rate, ErrorRate::default());
    }

    #[test]
    fn test_categories_always_listed() {
        let aggregator = DailyAggregator::default().with_classifier(ErrorClassifier::default());
        let stat = aggregator.analyze_date(&[
            root("r1", "success"),
            scraper("c1", "r1", "error", "ReadTimeout: HTTPSConnectionPool(host='x'): Read timed out"),
            scraper("c2", "r1", "error", "HTTP 429"),
        ]);

        let categories = stat.categories.as_ref().unwrap();
        assert_eq!(categories.len(), 7);
        assert_eq!(categories["read_timeout"], 1);
        assert_eq!(categories[UNKNOWN_CATEGORY], 1);
        assert_eq!(categories["http_404_not_found"], 0);
    }

    #[test]
    fn test_group_by_date_skips_undated_runs() {
        let mut undated = root("r2", "success");
        undated.start_time = None;
        let mut next_day = root("r3", "success");
        next_day.start_time = Some("2025-08-30T00:00:01+00:00".to_string());

        let grouped = group_by_date(vec![root("r1", "success"), undated, next_day]);
        let dates: Vec<&str> = grouped.keys().map(String::as_str).collect();
        assert_eq!(dates, vec!["2025-08-29", "2025-08-30"]);
    }

    #[test]
    fn test_merge_recomputes_rate() {
        let aggregator = DailyAggregator::default().with_classifier(ErrorClassifier::default());
        let first = aggregator.analyze(&group_by_date(vec![
            root("r1", "success"),
            scraper("c1", "r1", "error", "HTTP 429"),
        ]));
        let second = aggregator.analyze(&group_by_date(vec![
            root("r2", "success"),
            root("r3", "success"),
            root("r4", "success"),
        ]));

        let merged = merge_daily_stats([first, second]);
        let stat = &merged["2025-08-29"];
        assert_eq!(stat.total_traces, 4);
        assert_eq!(stat.zenrows_errors, 1);
        // 1/4, not the mean of 100% and 0%
        assert_eq!(stat.error_rate.percent(), 25.0);
        assert_eq!(stat.category_count(UNKNOWN_CATEGORY), 1);
    }

    fn arb_runs() -> impl Strategy<Value = Vec<Run>> {
        prop::collection::vec(
            (any::<bool>(), any::<bool>(), 0usize..4),
            0..40,
        )
        .prop_map(|shapes| {
            shapes
                .into_iter()
                .enumerate()
                .map(|(i, (is_root, failed, message))| {
                    let error = ["404 Client Error", "Read timed out", "HTTP 429", "bad request"][message];
                    let status = if failed { "error" } else { "success" };
                    let mut run = scraper(&format!("run-{i}"), "r0", status, error);
                    if is_root {
                        run.parent_run_id = None;
                    }
                    run
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_total_traces_counts_roots_only(runs in arb_runs()) {
            let expected = runs.iter().filter(|run| run.parent_run_id.is_none()).count() as u64;
            let stat = DailyAggregator::default().analyze_date(&runs);
            prop_assert_eq!(stat.total_traces, expected);
        }

        #[test]
        fn prop_categories_sum_to_errors(runs in arb_runs()) {
            let aggregator = DailyAggregator::default().with_classifier(ErrorClassifier::default());
            let stat = aggregator.analyze_date(&runs);
            let sum: u64 = stat.categories.as_ref().map(|c| c.values().sum()).unwrap_or(0);
            prop_assert_eq!(sum, stat.zenrows_errors);
        }
    }
}
