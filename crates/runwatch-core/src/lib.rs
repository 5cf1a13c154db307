//! # Runwatch
//!
//! Failure analysis for captured scraper traces.
//!
//! Runwatch reads runs exported from a tracing API, rebuilds each trace tree,
//! finds failing `zenrows_scraper` runs, attributes them to the crypto symbol
//! the trace worked on, classifies the error, and reports daily failure
//! rates and per-symbol detail.
//!
//! ## Architecture
//!
//! - **Analysis**: trace reconstruction, error walking, symbol attribution,
//!   categorization and aggregation; pure, in-memory, no shared state
//! - **Report**: file-based trace loading plus CSV/JSON rendering
//! - **Database**: read path over runs stored in PostgreSQL
//!
//! ## Quick Start
//!
//! ```bash
//! # Daily error rates with category columns
//! runwatch daily --project crypto --date 2025-08-29
//!
//! # Per-symbol detail for a date range across all projects
//! runwatch details --start-date 2025-08-25 --end-date 2025-08-29 --metadata
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]

pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;

pub use crate::config::Config;
pub use crate::error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::analysis::{
        build_hierarchy, reconstruct, resolve_symbol, CategoryTable, DailyAggregator,
        ErrorClassifier, ErrorWalker, HierarchyAggregator,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::report::{ReportGenerator, ReportRequest};
}
