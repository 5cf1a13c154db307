//! Error categorization
//!
//! Categories are matched by case-insensitive substring patterns in table
//! order, so the table order is the match priority. Messages matching no
//! category are counted as [`UNKNOWN_CATEGORY`] and written to an
//! append-only log so new failure patterns can be added later.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, warn};

/// Category name for messages matching no pattern
pub const UNKNOWN_CATEGORY: &str = "unknown_errors";

/// File name of the unknown-error log inside its directory
pub const UNKNOWN_ERRORS_FILE: &str = "unknown_errors.log";

/// One error category
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// Category name, used as CSV column and map key
    pub name: String,
    /// Lowercased substring patterns
    pub patterns: Vec<String>,
    /// Human-readable description
    pub description: String,
    /// Share of production errors (percent); orders report columns only
    pub frequency: f64,
}

/// Ordered, immutable set of categories.
///
/// Cloning is cheap; [`CategoryTable::with_category`] returns a new table
/// and leaves the original untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    categories: Arc<[Category]>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(vec![
            category(
                "http_404_not_found",
                &["404 client error", "not found for url"],
                "Target page does not exist (HTTP 404)",
                41.0,
            ),
            category(
                "http_503_service_unavailable",
                &["503 server error", "service unavailable"],
                "Scraping service temporarily unavailable (HTTP 503)",
                22.0,
            ),
            category(
                "http_422_unprocessable",
                &["422 client error", "unprocessable entity"],
                "Request rejected as unprocessable (HTTP 422)",
                12.0,
            ),
            category(
                "http_413_too_large",
                &["413 client error", "request entity too large", "payload too large"],
                "Response or request body too large (HTTP 413)",
                7.0,
            ),
            category(
                "http_400_bad_request",
                &["400 client error", "bad request"],
                "Malformed scrape request (HTTP 400)",
                5.0,
            ),
            category(
                "read_timeout",
                &["readtimeout", "read timed out", "timed out"],
                "Connection opened but the response never arrived",
                13.0,
            ),
        ])
    }
}

fn category(name: &str, patterns: &[&str], description: &str, frequency: f64) -> Category {
    Category {
        name: name.to_string(),
        patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
        description: description.to_string(),
        frequency,
    }
}

impl CategoryTable {
    /// Create a table from categories in priority order
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories: categories.into(),
        }
    }

    /// A new table with `name` appended at the lowest priority
    pub fn with_category(
        &self,
        name: &str,
        patterns: &[&str],
        description: &str,
        frequency: f64,
    ) -> Self {
        let mut categories = self.categories.to_vec();
        categories.push(category(name, patterns, description, frequency));
        Self::new(categories)
    }

    /// Categories in priority order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// First category whose pattern occurs in `message`
    pub fn matching(&self, message: &str) -> Option<&Category> {
        let message = message.to_lowercase();
        self.categories.iter().find(|category| {
            category
                .patterns
                .iter()
                .any(|pattern| message.contains(pattern.as_str()))
        })
    }

    /// Report column order: by frequency descending (ties keep table order),
    /// then [`UNKNOWN_CATEGORY`]
    pub fn column_order(&self) -> Vec<&str> {
        let mut ordered: Vec<&Category> = self.categories.iter().collect();
        ordered.sort_by(|a, b| b.frequency.total_cmp(&a.frequency));
        ordered
            .into_iter()
            .map(|category| category.name.as_str())
            .chain(std::iter::once(UNKNOWN_CATEGORY))
            .collect()
    }
}

/// Context recorded alongside an unrecognized message
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorContext<'a> {
    /// Project the trace came from
    pub project: Option<&'a str>,
    /// Failing run ID
    pub trace_id: Option<&'a str>,
}

/// Destination for messages no category recognized.
///
/// Implementations must not fail the caller; errors are logged and dropped.
pub trait UnknownErrorSink: Send + Sync {
    /// Record one unrecognized message
    fn record(&self, context: ErrorContext<'_>, message: &str);
}

/// Discards unknown errors
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUnknownErrorSink;

impl UnknownErrorSink for NullUnknownErrorSink {
    fn record(&self, _context: ErrorContext<'_>, _message: &str) {}
}

/// Appends `timestamp | project | trace_id | message` lines to a log file
#[derive(Debug)]
pub struct FileUnknownErrorLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileUnknownErrorLog {
    /// Log to [`UNKNOWN_ERRORS_FILE`] inside `dir`; the directory is created on first write
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(UNKNOWN_ERRORS_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl UnknownErrorSink for FileUnknownErrorLog {
    fn record(&self, context: ErrorContext<'_>, message: &str) {
        let line = format!(
            "{} | {} | {} | {}",
            Utc::now().to_rfc3339(),
            context.project.unwrap_or("unknown"),
            context.trace_id.unwrap_or("unknown"),
            message.replace('\n', " "),
        );

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = self.append(&line) {
            warn!(path = %self.path.display(), error = %e, "Failed to log unknown error");
        }
    }
}

/// Maps error messages to categories
#[derive(Clone)]
pub struct ErrorClassifier {
    table: CategoryTable,
    sink: Arc<dyn UnknownErrorSink>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(CategoryTable::default(), Arc::new(NullUnknownErrorSink))
    }
}

impl std::fmt::Debug for ErrorClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorClassifier")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl ErrorClassifier {
    /// Create a classifier over `table`, reporting unknown messages to `sink`
    pub fn new(table: CategoryTable, sink: Arc<dyn UnknownErrorSink>) -> Self {
        Self { table, sink }
    }

    /// The category table in use
    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Categorize `message` without context
    pub fn categorize(&self, message: &str) -> &str {
        self.categorize_with_context(message, ErrorContext::default())
    }

    /// Categorize `message`, recording it with `context` when unrecognized
    pub fn categorize_with_context(&self, message: &str, context: ErrorContext<'_>) -> &str {
        match self.table.matching(message) {
            Some(category) => category.name.as_str(),
            None => {
                debug!(trace_id = ?context.trace_id, "Unrecognized error message");
                self.sink.record(context, message);
                UNKNOWN_CATEGORY
            }
        }
    }
}
