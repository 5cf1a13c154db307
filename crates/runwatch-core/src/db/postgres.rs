//! PostgreSQL connection and run queries

use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Row;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// PostgreSQL connection pool
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Create a new PostgreSQL connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Stored payloads of one trace, in creation order
#[derive(Debug, Clone)]
pub struct TraceGroup {
    /// Shared trace ID
    pub trace_id: String,
    /// Raw run payloads
    pub runs: Vec<serde_json::Value>,
}

/// Repository for stored runs
#[derive(Clone)]
pub struct RunRepository {
    pool: PgPool,
}

impl RunRepository {
    /// Create a new run repository
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool.clone(),
        }
    }

    /// Runs of one project and date, grouped by trace
    pub async fn trace_groups(&self, project: &str, date: NaiveDate) -> Result<Vec<TraceGroup>> {
        let rows = sqlx::query(
            r#"
            SELECT trace_id, array_agg(data ORDER BY created_at) AS runs
            FROM runs
            WHERE project = $1 AND run_date = $2
            GROUP BY trace_id
            ORDER BY MIN(created_at) ASC
            "#,
        )
        .bind(project)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        let groups = rows
            .iter()
            .map(|row| -> Result<TraceGroup> {
                let runs: Vec<Json<serde_json::Value>> = row.try_get("runs")?;
                Ok(TraceGroup {
                    trace_id: row.try_get("trace_id")?,
                    runs: runs.into_iter().map(|payload| payload.0).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(project, %date, traces = groups.len(), "Fetched trace groups");
        Ok(groups)
    }

    /// Run payloads between two dates (inclusive), optionally for one project
    pub async fn runs_between(
        &self,
        project: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<serde_json::Value>> {
        let rows = sqlx::query(
            r#"
            SELECT data
            FROM runs
            WHERE run_date BETWEEN $1 AND $2
              AND ($3::text IS NULL OR project = $3)
            ORDER BY created_at ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(project)
        .fetch_all(&self.pool)
        .await?;

        let runs = rows
            .iter()
            .map(|row| row.try_get::<Json<serde_json::Value>, _>("data").map(|payload| payload.0))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(?project, %start, %end, runs = runs.len(), "Fetched runs");
        Ok(runs)
    }
}
