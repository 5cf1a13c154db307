//! Database layer for Runwatch
//!
//! Read-only access to stored runs. Each row holds one run as
//! `(run_id, trace_id, project, run_date, data jsonb, created_at)`.

mod analyzer;
mod postgres;

pub use analyzer::{trace_from_group, DbAnalyzer};
pub use postgres::{PostgresPool, RunRepository, TraceGroup};
