//! Analysis engine - failure discovery and aggregation over captured traces
//!
//! Flat run records are rebuilt into trees, walked for failing scraper runs,
//! attributed to a crypto symbol and root trace, categorized, and folded
//! into per-date statistics or per-symbol hierarchies. Nothing here performs
//! I/O apart from the best-effort unknown-error log.

pub mod category;
pub mod daily;
pub mod dates;
pub mod hierarchy;
pub mod parser;
pub mod reconstruct;
pub mod symbol;
pub mod walker;

pub use category::{
    Category, CategoryTable, ErrorClassifier, ErrorContext, FileUnknownErrorLog,
    NullUnknownErrorSink, UnknownErrorSink, UNKNOWN_CATEGORY,
};
pub use daily::{group_by_date, merge_daily_stats, DailyAggregator};
pub use dates::date_key;
pub use hierarchy::{build_hierarchy, resolve_root, HierarchyAggregator};
pub use parser::{load_run_file, parse_run_str, parse_run_value};
pub use reconstruct::reconstruct;
pub use symbol::resolve_symbol;
pub use walker::{ErrorWalker, NameMatcher, WalkLimits, WalkOutcome};
