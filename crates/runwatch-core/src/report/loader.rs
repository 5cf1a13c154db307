//! File-based trace source
//!
//! Extracted traces live at `<base_dir>/<project>/<YYYY-MM-DD>/*.json`.
//! Files whose name starts with `_` are summary sidecars and are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use indicatif::ProgressBar;
use tracing::{debug, warn};

use crate::analysis::parser::load_run_file;
use crate::error::{Error, Result};
use crate::models::Run;

/// Reads extracted trace files from a directory tree
#[derive(Debug, Clone)]
pub struct TraceSource {
    base_dir: PathBuf,
}

impl TraceSource {
    /// Create a source rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Root directory of the trace tree
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Project directories under the base directory, sorted by name
    pub fn projects(&self) -> Result<Vec<String>> {
        if !self.base_dir.is_dir() {
            return Err(Error::not_found(
                "Trace directory",
                self.base_dir.display().to_string(),
            ));
        }

        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    projects.push(name.to_string());
                }
            }
        }
        projects.sort();
        Ok(projects)
    }

    /// Trace files for one project and date, sorted by name.
    ///
    /// A missing date directory yields no files.
    pub fn trace_files(&self, project: &str, date: NaiveDate) -> Result<Vec<PathBuf>> {
        let dir = self.base_dir.join(project).join(date.to_string());
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "No trace directory for date");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if is_trace_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse every trace file for one project and date.
    ///
    /// Unreadable or malformed files are skipped with a warning.
    pub fn load_date(&self, project: &str, date: NaiveDate) -> Result<Vec<Run>> {
        let files = self.trace_files(project, date)?;
        let mut runs = Vec::with_capacity(files.len());

        for path in &files {
            match load_run_file(path) {
                Ok(Some(run)) => runs.push(run),
                Ok(None) => debug!(file = %path.display(), "Trace file carries no run"),
                Err(e) => warn!(file = %path.display(), error = %e, "Skipping unreadable trace file"),
            }
        }

        debug!(project, %date, files = files.len(), runs = runs.len(), "Loaded traces");
        Ok(runs)
    }

    /// Load several dates, keyed by `YYYY-MM-DD`; dates without runs are omitted
    pub fn load_dates(
        &self,
        project: &str,
        dates: &[NaiveDate],
        progress: &ProgressBar,
    ) -> Result<BTreeMap<String, Vec<Run>>> {
        let mut by_date = BTreeMap::new();
        for date in dates {
            progress.set_message(format!("{project} {date}"));
            let runs = self.load_date(project, *date)?;
            if !runs.is_empty() {
                by_date.insert(date.to_string(), runs);
            }
            progress.inc(1);
        }
        Ok(by_date)
    }
}

fn is_trace_file(path: &Path) -> bool {
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let is_sidecar = path
        .file_name()
        .and_then(|name| name.to_str())
        .map_or(true, |name| name.starts_with('_'));
    is_json && !is_sidecar && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parser::tests::deep_trace;
    use crate::analysis::{ErrorWalker, NameMatcher, WalkLimits};
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_lists_projects_sorted() {
        let base = tempfile::tempdir().unwrap();
        fs::create_dir_all(base.path().join("zeta")).unwrap();
        fs::create_dir_all(base.path().join("alpha")).unwrap();
        fs::write(base.path().join("notes.txt"), "x").unwrap();

        let source = TraceSource::new(base.path());
        assert_eq!(source.projects().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_missing_base_dir_is_not_found() {
        let source = TraceSource::new("/nonexistent/traces");
        assert!(matches!(source.projects(), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_skips_sidecars_and_bad_files() {
        let base = tempfile::tempdir().unwrap();
        let day = base.path().join("crypto/2025-08-29");
        write(&day, "a.json", r#"{"trace": {"id": "r1", "name": "agent"}}"#);
        write(&day, "b.json", r#"{"id": "r2", "name": "agent"}"#);
        write(&day, "_summary.json", r#"{"id": "nope"}"#);
        write(&day, "broken.json", "{");
        write(&day, "empty.json", r#"{"trace": null}"#);
        write(&day, "readme.md", "ignored");

        let source = TraceSource::new(base.path());
        let runs = source.load_date("crypto", date("2025-08-29")).unwrap();
        let ids: Vec<&str> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[test]
    fn test_deep_trace_file_reaches_the_walker() {
        let base = tempfile::tempdir().unwrap();
        write(&base.path().join("crypto/2025-08-29"), "deep.json", &deep_trace(80));

        let source = TraceSource::new(base.path());
        let runs = source.load_date("crypto", date("2025-08-29")).unwrap();
        assert_eq!(runs.len(), 1);

        let outcome = ErrorWalker::default().find_errors(&runs[0]);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].id, "leaf");
        assert!(!outcome.truncated);

        let capped = ErrorWalker::new(
            NameMatcher::zenrows_scraper(),
            WalkLimits {
                max_depth: 40,
                max_nodes: 100_000,
            },
        )
        .find_errors(&runs[0]);
        assert!(capped.truncated);
        assert_eq!(capped.visited, 41);
        assert!(capped.errors.is_empty());
    }

    #[test]
    fn test_load_dates_omits_empty_days() {
        let base = tempfile::tempdir().unwrap();
        write(
            &base.path().join("crypto/2025-08-30"),
            "a.json",
            r#"{"id": "r1", "name": "agent"}"#,
        );

        let source = TraceSource::new(base.path());
        let loaded = source
            .load_dates(
                "crypto",
                &[date("2025-08-29"), date("2025-08-30")],
                &ProgressBar::hidden(),
            )
            .unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["2025-08-30"]);
    }
}
