//! Grouping of failures by crypto symbol and root trace

use std::collections::HashMap;

use tracing::debug;

use super::category::{ErrorClassifier, ErrorContext};
use super::symbol::resolve_symbol;
use super::walker::ErrorWalker;
use crate::models::{ErrorDetail, Hierarchy, HierarchyEntry, HierarchyReport, RootResolution, Run};

/// Builds `symbol -> root -> errors` hierarchies for detail reports
#[derive(Debug, Clone, Default)]
pub struct HierarchyAggregator {
    walker: ErrorWalker,
    classifier: Option<ErrorClassifier>,
    project: Option<String>,
}

impl HierarchyAggregator {
    /// Create an aggregator using `walker` to find failures
    pub fn new(walker: ErrorWalker) -> Self {
        Self {
            walker,
            classifier: None,
            project: None,
        }
    }

    /// Attach a category to every error
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Project name recorded with unrecognized errors
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Build the hierarchy for `traces`.
    ///
    /// Each error is filed under the symbol of its trace's root, not the
    /// symbol of the failing run. Traces without errors add nothing.
    pub fn build(&self, traces: &[Run], include_metadata: bool) -> HierarchyReport {
        let lookup: HashMap<&str, &Run> = traces.iter().map(|run| (run.id.as_str(), run)).collect();
        let mut report = HierarchyReport::default();

        for trace in traces {
            let outcome = self.walker.find_errors(trace);
            if outcome.errors.is_empty() {
                continue;
            }

            let resolution = resolve_root(&lookup, trace);
            let root = resolution.run();
            let symbol = resolve_symbol(root);

            debug!(
                trace = %trace.id,
                root = %root.id,
                confirmed = resolution.is_confirmed(),
                errors = outcome.errors.len(),
                "Filing trace errors"
            );

            for failure in outcome.errors {
                let mut detail = ErrorDetail::new(failure, root.id.clone(), symbol.clone());
                if let Some(classifier) = &self.classifier {
                    let context = ErrorContext {
                        project: self.project.as_deref(),
                        trace_id: Some(&detail.trace_id),
                    };
                    detail.category = Some(
                        classifier
                            .categorize_with_context(&detail.error_message, context)
                            .to_string(),
                    );
                }

                if resolution.is_confirmed() {
                    report.confirmed_roots += 1;
                } else {
                    report.fallback_roots += 1;
                }

                report
                    .hierarchy
                    .entry(symbol.clone())
                    .or_default()
                    .entry(root.id.clone())
                    .or_insert_with(|| HierarchyEntry::for_root(root, include_metadata))
                    .push(detail);
            }
        }

        report
    }
}

/// Resolve the root run for `trace`.
///
/// The run named by `trace.trace_id` counts as the root only when it is
/// among the supplied traces and marks itself as depth 0; otherwise the
/// trace itself stands in as its own root.
pub fn resolve_root<'a>(lookup: &HashMap<&str, &'a Run>, trace: &'a Run) -> RootResolution<'a> {
    match lookup.get(trace.trace_id()) {
        Some(&candidate) if candidate.run_depth() == Some(0) => RootResolution::Confirmed(candidate),
        _ => RootResolution::Fallback(trace),
    }
}

/// Build a hierarchy with the default detail walker and no categorization
pub fn build_hierarchy(traces: &[Run], include_metadata: bool) -> Hierarchy {
    HierarchyAggregator::new(ErrorWalker::detail(&Default::default()))
        .build(traces, include_metadata)
        .hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNKNOWN_SYMBOL;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn root(id: &str, symbol: &str) -> Run {
        Run {
            id: id.to_string(),
            trace_id: Some(id.to_string()),
            name: "crypto_agent".to_string(),
            status: Some("success".to_string()),
            start_time: Some("2025-08-29T10:00:00Z".to_string()),
            inputs: json!({"input_data": {"crypto_symbol": symbol}}),
            extra: json!({"metadata": {"ls_run_depth": 0}}),
            ..Run::default()
        }
    }

    fn failing(id: &str, trace_id: &str, error: &str) -> Run {
        Run {
            id: id.to_string(),
            trace_id: Some(trace_id.to_string()),
            parent_run_id: Some(trace_id.to_string()),
            name: "zenrows_scraper".to_string(),
            status: Some("error".to_string()),
            error: Some(error.to_string()),
            start_time: Some("2025-08-29T10:01:00Z".to_string()),
            inputs: json!({"url": format!("https://coins.example/{id}")}),
            metadata: json!({"symbol": "ETH"}),
            extra: json!({"metadata": {"ls_run_depth": 1}}),
            ..Run::default()
        }
    }

    #[test]
    fn test_children_of_one_root_share_an_entry() {
        let traces = vec![
            root("r1", "btc"),
            failing("c1", "r1", "HTTP 429"),
            failing("c2", "r1", "503 Server Error"),
        ];

        let report = HierarchyAggregator::default().build(&traces, false);

        assert_eq!(report.hierarchy.len(), 1);
        let roots = &report.hierarchy["BTC"];
        assert_eq!(roots.len(), 1);
        let ids: Vec<&str> = roots["r1"].errors().iter().map(|e| e.trace_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(report.confirmed_roots, 2);
        assert_eq!(report.fallback_roots, 0);
    }

    #[test]
    fn test_symbol_comes_from_root_not_failing_run() {
        let traces = vec![root("r1", "sol"), failing("c1", "r1", "HTTP 429")];
        let hierarchy = build_hierarchy(&traces, false);

        assert!(hierarchy.contains_key("SOL"));
        assert!(!hierarchy.contains_key("ETH"));
    }

    #[test]
    fn test_missing_root_falls_back_to_trace() {
        let traces = vec![failing("c1", "gone", "HTTP 429")];
        let report = HierarchyAggregator::default().build(&traces, false);

        // the failing run's own metadata now supplies the symbol
        let entry = &report.hierarchy["ETH"]["c1"];
        assert_eq!(entry.errors()[0].root_trace_id, "c1");
        assert_eq!(report.fallback_roots, 1);
    }

    #[test]
    fn test_root_without_depth_zero_is_not_confirmed() {
        let mut unverified = root("r1", "btc");
        unverified.extra = json!({});
        let traces = vec![unverified, failing("c1", "r1", "HTTP 429")];

        let lookup: HashMap<&str, &Run> = traces.iter().map(|r| (r.id.as_str(), r)).collect();
        let resolution = resolve_root(&lookup, &traces[1]);

        assert!(!resolution.is_confirmed());
        assert_eq!(resolution.run().id, "c1");
    }

    #[test]
    fn test_metadata_mode_and_categories() {
        let mut tree = root("r1", "ada");
        tree.child_runs = Some(vec![failing(
            "c1",
            "r1",
            "HTTPError('404 Client Error: Not Found for url: https://x.com/')",
        )]);

        let report = HierarchyAggregator::default()
            .with_classifier(ErrorClassifier::default())
            .build(&[tree], true);

        match &report.hierarchy["ADA"]["r1"] {
            HierarchyEntry::WithMeta {
                errors,
                start_time,
                name,
            } => {
                assert_eq!(name, "crypto_agent");
                assert_eq!(start_time.as_deref(), Some("2025-08-29T10:00:00Z"));
                assert_eq!(errors[0].category.as_deref(), Some("http_404_not_found"));
                assert_eq!(errors[0].target_url.as_deref(), Some("https://coins.example/c1"));
            }
            other => panic!("expected metadata entry, got {other:?}"),
        }
    }

    #[test]
    fn test_error_free_traces_add_nothing() {
        let hierarchy = build_hierarchy(&[root("r1", "btc")], true);
        assert!(hierarchy.is_empty());
    }

    #[test]
    fn test_unresolvable_symbol_filed_as_unknown() {
        let mut bare = failing("c1", "c1", "HTTP 429");
        bare.metadata = json!({});
        let hierarchy = build_hierarchy(&[bare], false);
        assert!(hierarchy.contains_key(UNKNOWN_SYMBOL));
    }
}
