//! Runwatch CLI
//!
//! Command-line interface for the Runwatch trace failure reports.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use runwatch::analysis::{CategoryTable, ErrorClassifier, FileUnknownErrorLog};
use runwatch::db::{DbAnalyzer, PostgresPool, RunRepository};
use runwatch::report::{
    render_daily_csv, render_detail_json, summarize, ReportGenerator, ReportRequest,
};
use runwatch::Config;

/// Runwatch - failure reports for captured scraper traces
#[derive(Parser)]
#[command(name = "runwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "RUNWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily error rates from extracted trace files (CSV)
    Daily {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        output: OutputArgs,

        /// Leave out the per-category columns
        #[arg(long)]
        no_categories: bool,
    },

    /// Failures grouped by crypto symbol and root trace (JSON)
    Details {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        output: OutputArgs,

        /// Include root start time and name with each group
        #[arg(long)]
        metadata: bool,
    },

    /// Detail report built from runs stored in the database
    DbDetails {
        /// Project name
        #[arg(long)]
        project: String,

        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Include root start time and name with each group
        #[arg(long)]
        metadata: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Daily error rates from runs stored in the database (CSV)
    DbDaily {
        /// Project name (all projects if omitted)
        #[arg(long)]
        project: Option<String>,

        /// First date (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,

        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        end_date: NaiveDate,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List error categories in report column order
    Categories,
}

/// Which traces a file-based report covers
#[derive(Args)]
struct Selection {
    /// Project name (all projects if omitted)
    #[arg(long)]
    project: Option<String>,

    /// Single date (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["start_date", "end_date"])]
    date: Option<NaiveDate>,

    /// First date of a range (YYYY-MM-DD)
    #[arg(long, requires = "end_date")]
    start_date: Option<NaiveDate>,

    /// Last date of a range (YYYY-MM-DD)
    #[arg(long, requires = "start_date")]
    end_date: Option<NaiveDate>,
}

impl From<Selection> for ReportRequest {
    fn from(selection: Selection) -> Self {
        Self {
            project: selection.project,
            date: selection.date,
            start_date: selection.start_date,
            end_date: selection.end_date,
        }
    }
}

/// Where a report goes
#[derive(Args)]
struct OutputArgs {
    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the report to the configured output directory
    #[arg(long, conflicts_with = "output")]
    save: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config, cli.verbose);

    let result = match cli.command {
        Commands::Daily {
            selection,
            output,
            no_categories,
        } => run_daily(config, selection.into(), &output, no_categories),
        Commands::Details {
            selection,
            output,
            metadata,
        } => run_details(&config, &selection.into(), &output, metadata),
        Commands::DbDetails {
            project,
            date,
            metadata,
            output,
        } => run_db_details(&config, &project, date, metadata, &output).await,
        Commands::DbDaily {
            project,
            start_date,
            end_date,
            output,
        } => run_db_daily(&config, project.as_deref(), start_date, end_date, &output).await,
        Commands::Categories => {
            run_categories();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let log_level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn progress_bar() -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg:24} [{bar:30.cyan/blue}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

fn classifier(config: &Config) -> ErrorClassifier {
    ErrorClassifier::new(
        CategoryTable::default(),
        Arc::new(FileUnknownErrorLog::new(&config.reports.unknown_errors_dir)),
    )
}

fn emit(
    config: &Config,
    output: &OutputArgs,
    default_name: impl FnOnce() -> anyhow::Result<String>,
    contents: &str,
) -> anyhow::Result<()> {
    let path = match (&output.output, output.save) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(config.reports.output_dir.join(default_name()?)),
        (None, false) => None,
    };

    match path {
        Some(path) => {
            write_file(&path, contents)?;
            info!(path = %path.display(), "Report written");
            println!("Report written to {}", path.display());
        }
        None => print!("{contents}"),
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

fn run_daily(
    mut config: Config,
    request: ReportRequest,
    output: &OutputArgs,
    no_categories: bool,
) -> anyhow::Result<()> {
    if no_categories {
        config.reports.categorize = false;
    }

    let generator = ReportGenerator::new(&config).with_progress(progress_bar()?);
    let csv = generator.daily_csv(&request)?;

    emit(&config, output, || Ok(format!("{}.csv", request.file_stem()?)), &csv)
}

fn run_details(
    config: &Config,
    request: &ReportRequest,
    output: &OutputArgs,
    metadata: bool,
) -> anyhow::Result<()> {
    let generator = ReportGenerator::new(config).with_progress(progress_bar()?);
    let report = generator.detail_hierarchy(request, metadata)?;

    for summary in summarize(&report.hierarchy) {
        info!(
            symbol = %summary.symbol,
            roots = summary.roots,
            errors = summary.errors,
            "Symbol summary"
        );
    }

    let json = render_detail_json(&report.hierarchy)?;
    emit(
        config,
        output,
        || Ok(format!("{}_details.json", request.file_stem()?)),
        &json,
    )
}

async fn connect(config: &Config) -> anyhow::Result<DbAnalyzer> {
    let pool = PostgresPool::new(&config.database).await?;
    pool.health_check().await?;
    info!("Database connection healthy");

    Ok(DbAnalyzer::new(
        RunRepository::new(&pool),
        config.analysis.clone(),
        classifier(config),
    ))
}

async fn run_db_details(
    config: &Config,
    project: &str,
    date: NaiveDate,
    metadata: bool,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let analyzer = connect(config).await?;
    let report = analyzer.detail_hierarchy(project, date, metadata).await?;
    let json = render_detail_json(&report.hierarchy)?;

    emit(
        config,
        output,
        || Ok(format!("zenrows_errors_{project}_{date}_db_details.json")),
        &json,
    )
}

async fn run_db_daily(
    config: &Config,
    project: Option<&str>,
    start: NaiveDate,
    end: NaiveDate,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let analyzer = connect(config).await?;
    let stats = analyzer.daily_stats(project, start, end).await?;

    let table = CategoryTable::default();
    let csv = render_daily_csv(&stats, &table.column_order());

    emit(
        config,
        output,
        || {
            Ok(format!(
                "zenrows_errors_{}_{start}_{end}_db.csv",
                project.unwrap_or("all")
            ))
        },
        &csv,
    )
}

fn run_categories() {
    let table = CategoryTable::default();
    println!("{:<32} {:>9}  {}", "CATEGORY", "FREQUENCY", "PATTERNS");
    for name in table.column_order() {
        match table.categories().iter().find(|category| category.name == name) {
            Some(category) => println!(
                "{:<32} {:>8.1}%  {}",
                category.name,
                category.frequency,
                category.patterns.join(" | ")
            ),
            None => println!("{name:<32} {:>9}  (no pattern matched)", "-"),
        }
    }
}
