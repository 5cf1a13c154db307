//! Report generation from extracted trace files
//!
//! A [`ReportGenerator`] loads runs for a project (or every project) over a
//! date or date range, runs the analysis engine, and renders daily CSV rate
//! reports or JSON detail reports.

mod csv;
mod detail;
mod loader;

pub use csv::{render_daily_csv, BASE_COLUMNS};
pub use detail::{render_detail_json, summarize, SymbolSummary};
pub use loader::TraceSource;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use indicatif::ProgressBar;
use tracing::info;

use crate::analysis::dates::date_range;
use crate::analysis::{
    merge_daily_stats, CategoryTable, DailyAggregator, ErrorClassifier, ErrorWalker,
    FileUnknownErrorLog, HierarchyAggregator,
};
use crate::config::{AnalysisConfig, Config};
use crate::error::{Error, Result};
use crate::models::{DailyStats, HierarchyReport};

/// What a report covers: one project or all, over one date or a range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRequest {
    /// Project to report on; `None` covers every project
    pub project: Option<String>,
    /// Single date
    pub date: Option<NaiveDate>,
    /// First date of a range (inclusive)
    pub start_date: Option<NaiveDate>,
    /// Last date of a range (inclusive)
    pub end_date: Option<NaiveDate>,
}

impl ReportRequest {
    /// Request for a single date
    pub fn for_date(project: Option<&str>, date: NaiveDate) -> Self {
        Self {
            project: project.map(str::to_string),
            date: Some(date),
            ..Self::default()
        }
    }

    /// Request for an inclusive date range
    pub fn for_range(project: Option<&str>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            project: project.map(str::to_string),
            start_date: Some(start),
            end_date: Some(end),
            ..Self::default()
        }
    }

    /// The dates covered.
    ///
    /// Fails with [`Error::Validation`] unless exactly one of a single date
    /// or a complete, ordered start/end pair was given.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        match (self.date, self.start_date, self.end_date) {
            (Some(date), None, None) => Ok(vec![date]),
            (None, Some(start), Some(end)) if start <= end => Ok(date_range(start, end)),
            (None, Some(start), Some(end)) => Err(Error::validation(format!(
                "start date {start} is after end date {end}"
            ))),
            (Some(_), _, _) => Err(Error::validation(
                "give either a single date or a start/end range, not both",
            )),
            _ => Err(Error::validation(
                "a date or both a start date and an end date are required",
            )),
        }
    }

    /// Base file name for this report, without extension
    pub fn file_stem(&self) -> Result<String> {
        let dates = self.dates()?;
        let project = self.project.as_deref().unwrap_or("all");
        Ok(match (dates.first(), dates.last()) {
            (Some(first), Some(last)) if first != last => {
                format!("zenrows_errors_{project}_{first}_{last}")
            }
            (Some(first), _) => format!("zenrows_errors_{project}_{first}"),
            _ => format!("zenrows_errors_{project}"),
        })
    }
}

/// Builds reports from a [`TraceSource`]
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    source: TraceSource,
    analysis: AnalysisConfig,
    classifier: ErrorClassifier,
    categorize: bool,
    output_dir: PathBuf,
    progress: ProgressBar,
}

impl ReportGenerator {
    /// Create a generator from configuration; unknown errors are logged
    /// under `reports.unknown_errors_dir`
    pub fn new(config: &Config) -> Self {
        let sink = Arc::new(FileUnknownErrorLog::new(&config.reports.unknown_errors_dir));
        Self {
            source: TraceSource::new(&config.reports.base_dir),
            analysis: config.analysis.clone(),
            classifier: ErrorClassifier::new(CategoryTable::default(), sink),
            categorize: config.reports.categorize,
            output_dir: config.reports.output_dir.clone(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Use a different classifier
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Report loading progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// The trace source reports are built from
    pub fn source(&self) -> &TraceSource {
        &self.source
    }

    fn projects(&self, request: &ReportRequest) -> Result<Vec<String>> {
        match &request.project {
            Some(project) => Ok(vec![project.clone()]),
            None => self.source.projects(),
        }
    }

    /// Per-date stats; with no project, each project is analyzed on its own
    /// and the results merged
    pub fn daily_stats(&self, request: &ReportRequest) -> Result<DailyStats> {
        let dates = self.dates_checked(request)?;
        let projects = self.projects(request)?;
        self.progress.set_length((dates.len() * projects.len()) as u64);

        let mut parts = Vec::with_capacity(projects.len());
        for project in &projects {
            let runs_by_date = self.source.load_dates(project, &dates, &self.progress)?;

            let mut aggregator =
                DailyAggregator::new(ErrorWalker::basic(&self.analysis)).with_project(project);
            if self.categorize {
                aggregator = aggregator.with_classifier(self.classifier.clone());
            }
            parts.push(aggregator.analyze(&runs_by_date));
        }
        self.progress.finish_and_clear();

        let merged = merge_daily_stats(parts);
        info!(projects = projects.len(), dates = merged.len(), "Built daily stats");
        Ok(merged)
    }

    /// Daily stats rendered as CSV
    pub fn daily_csv(&self, request: &ReportRequest) -> Result<String> {
        let stats = self.daily_stats(request)?;
        let table = self.classifier.table();
        let columns = if self.categorize {
            table.column_order()
        } else {
            Vec::new()
        };
        Ok(render_daily_csv(&stats, &columns))
    }

    /// Symbol/root hierarchy of every failure in the requested range
    pub fn detail_hierarchy(
        &self,
        request: &ReportRequest,
        include_metadata: bool,
    ) -> Result<HierarchyReport> {
        let dates = self.dates_checked(request)?;
        let projects = self.projects(request)?;
        self.progress.set_length((dates.len() * projects.len()) as u64);

        let mut report = HierarchyReport::default();
        for project in &projects {
            let runs: Vec<_> = self
                .source
                .load_dates(project, &dates, &self.progress)?
                .into_values()
                .flatten()
                .collect();

            let mut aggregator = HierarchyAggregator::new(ErrorWalker::detail(&self.analysis))
                .with_project(project);
            if self.categorize {
                aggregator = aggregator.with_classifier(self.classifier.clone());
            }
            report.merge(aggregator.build(&runs, include_metadata));
        }
        self.progress.finish_and_clear();

        info!(
            errors = report.error_count(),
            confirmed_roots = report.confirmed_roots,
            fallback_roots = report.fallback_roots,
            "Built detail hierarchy"
        );
        Ok(report)
    }

    /// Detail hierarchy rendered as JSON
    pub fn detail_json(&self, request: &ReportRequest, include_metadata: bool) -> Result<String> {
        render_detail_json(&self.detail_hierarchy(request, include_metadata)?.hierarchy)
    }

    /// Write `contents` to `file_name` in the output directory
    pub fn write_report(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        std::fs::write(&path, contents)?;
        info!(path = %path.display(), "Report written");
        Ok(path)
    }

    fn dates_checked(&self, request: &ReportRequest) -> Result<Vec<NaiveDate>> {
        let dates = request.dates()?;
        if dates.is_empty() {
            return Err(Error::internal("resolved date range is empty"));
        }
        Ok(dates)
    }
}
