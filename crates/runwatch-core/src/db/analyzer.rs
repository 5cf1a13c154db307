//! Database-backed analysis

use chrono::NaiveDate;
use tracing::{info, warn};

use super::postgres::{RunRepository, TraceGroup};
use crate::analysis::{
    group_by_date, parse_run_value, reconstruct, DailyAggregator, ErrorClassifier, ErrorWalker,
    HierarchyAggregator,
};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::models::{DailyStats, HierarchyReport, Run};

/// Rebuild one trace from its stored payloads.
///
/// Payloads that fail to decode are skipped with a warning.
pub fn trace_from_group(group: TraceGroup) -> Run {
    let source = format!("trace {}", group.trace_id);
    let records: Vec<Run> = group
        .runs
        .into_iter()
        .filter_map(|payload| match parse_run_value(&source, payload) {
            Ok(run) => run,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable run payload");
                None
            }
        })
        .collect();
    reconstruct(records)
}

/// Runs the analysis engine over runs stored in PostgreSQL
#[derive(Clone)]
pub struct DbAnalyzer {
    repo: RunRepository,
    analysis: AnalysisConfig,
    classifier: ErrorClassifier,
}

impl DbAnalyzer {
    /// Create an analyzer
    pub fn new(repo: RunRepository, analysis: AnalysisConfig, classifier: ErrorClassifier) -> Self {
        Self {
            repo,
            analysis,
            classifier,
        }
    }

    /// Reconstructed trees for every trace of a project and date
    pub async fn traces(&self, project: &str, date: NaiveDate) -> Result<Vec<Run>> {
        let groups = self.repo.trace_groups(project, date).await?;
        Ok(groups
            .into_iter()
            .map(trace_from_group)
            .filter(|trace| !trace.id.is_empty())
            .collect())
    }

    /// Detail hierarchy for a project and date
    pub async fn detail_hierarchy(
        &self,
        project: &str,
        date: NaiveDate,
        include_metadata: bool,
    ) -> Result<HierarchyReport> {
        let traces = self.traces(project, date).await?;
        let report = HierarchyAggregator::new(ErrorWalker::detail(&self.analysis))
            .with_classifier(self.classifier.clone())
            .with_project(project)
            .build(&traces, include_metadata);

        info!(
            project,
            %date,
            traces = traces.len(),
            errors = report.error_count(),
            "Built detail hierarchy from database"
        );
        Ok(report)
    }

    /// Daily stats over stored runs, grouped by each run's start date
    pub async fn daily_stats(
        &self,
        project: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyStats> {
        if start > end {
            return Err(Error::validation(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let payloads = self.repo.runs_between(project, start, end).await?;
        let runs = payloads.into_iter().filter_map(|payload| {
            parse_run_value("stored run", payload)
                .map_err(|e| warn!(error = %e, "Skipping undecodable run payload"))
                .ok()
                .flatten()
        });

        let mut aggregator = DailyAggregator::new(ErrorWalker::basic(&self.analysis))
            .with_classifier(self.classifier.clone());
        if let Some(project) = project {
            aggregator = aggregator.with_project(project);
        }
        Ok(aggregator.analyze(&group_by_date(runs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trace_from_group_skips_bad_payloads() {
        let group = TraceGroup {
            trace_id: "r1".to_string(),
            runs: vec![
                json!({"id": "c1", "trace_id": "r1", "parent_run_id": "r1", "name": "zenrows_scraper"}),
                json!("not a run"),
                json!({"id": "r1", "trace_id": "r1", "name": "crypto_agent"}),
            ],
        };

        let tree = trace_from_group(group);
        assert_eq!(tree.id, "r1");
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].id, "c1");
    }

    #[test]
    fn test_empty_group_yields_empty_run() {
        let tree = trace_from_group(TraceGroup {
            trace_id: "r1".to_string(),
            runs: Vec::new(),
        });
        assert!(tree.id.is_empty());
    }
}
