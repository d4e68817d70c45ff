//! CLI entry point for the data cleaning pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use lex_cleaning::{CleanerConfig, CleaningPipeline, OutlierModelKind, PipelineRun, SqliteStore};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};

/// Rows shown in each table preview.
const PREVIEW_ROWS: usize = 10;

/// CLI-compatible outlier model enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierModel {
    /// Random isolation trees (seeded)
    IsolationForest,
    /// Largest absolute z-score of each row
    ZScore,
}

impl From<CliOutlierModel> for OutlierModelKind {
    fn from(cli: CliOutlierModel) -> Self {
        match cli {
            CliOutlierModel::IsolationForest => OutlierModelKind::IsolationForest,
            CliOutlierModel::ZScore => OutlierModelKind::ZScore,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Duplicate and outlier cleaning for relational tables",
    long_about = "Loads a table, reports duplicates and outliers, and writes a cleaned copy.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  DATABASE_URL    Store connection string (also read from .env)\n\n\
                  EXAMPLES:\n  \
                  # Clean the default customer table and export CSV\n  \
                  lex-cleaning --database-url sqlite://customers.db\n\n  \
                  # Custom duplicate keys, drop outliers, write back to the store\n  \
                  lex-cleaning --keys name,email --remove-outliers --persist\n\n  \
                  # Machine-readable run report\n  \
                  lex-cleaning --json | jq .cleaning"
)]
struct Args {
    /// Store connection string, e.g. sqlite://customers.db
    ///
    /// Falls back to the DATABASE_URL environment variable
    #[arg(long)]
    database_url: Option<String>,

    /// JSON configuration file; command line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Table to load
    #[arg(long)]
    source_table: Option<String>,

    /// Table replaced with the cleaned records when --persist is set
    #[arg(long)]
    target_table: Option<String>,

    /// Duplicate key fields, comma separated
    #[arg(short, long, value_delimiter = ',')]
    keys: Option<Vec<String>>,

    /// Expected outlier fraction (0.01 - 0.5)
    #[arg(long)]
    contamination: Option<f64>,

    /// Outlier scoring model
    #[arg(long, value_enum)]
    model: Option<CliOutlierModel>,

    /// Seed for the outlier model
    #[arg(long)]
    seed: Option<u64>,

    /// Keep duplicate records
    #[arg(long)]
    no_dedup: bool,

    /// Leave missing text values empty
    #[arg(long)]
    no_fill_text: bool,

    /// Leave missing numeric values empty
    #[arg(long)]
    no_fill_numeric: bool,

    /// Drop rows labelled as outliers
    #[arg(long)]
    remove_outliers: bool,

    /// Replace the target table with the cleaned records
    #[arg(long)]
    persist: bool,

    /// Skip the CSV export
    #[arg(long)]
    no_export: bool,

    /// CSV export path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the summary)
    #[arg(short, long)]
    quiet: bool,

    /// Output the run report as JSON to stdout instead of the summary
    ///
    /// Disables all logs; only the JSON report is written.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Merge the configuration file (or defaults) with command line overrides.
fn build_config(args: &Args) -> Result<CleanerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            CleanerConfig::from_json_file(path)?
        }
        None => CleanerConfig::default(),
    };

    if let Some(ref table) = args.source_table {
        config.source_table = table.clone();
    }
    if let Some(ref table) = args.target_table {
        config.target_table = table.clone();
    }
    if let Some(ref keys) = args.keys {
        config.duplicate_key_fields = keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
    }
    if let Some(contamination) = args.contamination {
        config.contamination = contamination;
    }
    if let Some(model) = args.model {
        config.outlier_model = model.into();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(ref output) = args.output {
        config.export_path = output.clone();
    }

    if args.no_dedup {
        config.remove_duplicates = false;
    }
    if args.no_fill_text {
        config.fill_missing_text = false;
    }
    if args.no_fill_numeric {
        config.fill_missing_numeric = false;
    }
    if args.remove_outliers {
        config.remove_outliers = true;
    }
    if args.persist {
        config.persist_to_store = true;
    }
    if args.no_export {
        config.export_csv = false;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (disabled if --json is set)
    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    let config = build_config(&args)?;

    let database_url = args
        .database_url
        .clone()
        .or_else(|| env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow!("No database given: pass --database-url or set DATABASE_URL"))?;

    let store = SqliteStore::connect(&database_url).await?;
    let pipeline = CleaningPipeline::new(config)?;
    let result = pipeline.run(&store).await;
    store.close().await;

    let run = match result {
        Ok(run) => run,
        Err(e) => {
            error!("Cleaning run failed: {}", e);
            return Err(anyhow!("Cleaning run failed: {}", e));
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
        return Ok(());
    }

    print_human_readable_summary(&run);
    Ok(())
}

/// Print the previews and the run summary.
///
/// Uses `println!` on purpose: this is the primary output and must be visible
/// regardless of the log level.
fn print_human_readable_summary(run: &PipelineRun) {
    let report = &run.report;
    let session = &run.session;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING RUN: {}", report.source_table);
    println!("{}", "=".repeat(80));
    println!();

    println!("LOADED TABLE ({} rows)", report.rows_loaded);
    println!("{}", "-".repeat(40));
    println!("{}", session.table().head(Some(PREVIEW_ROWS)));
    println!();

    println!("FIELDS");
    println!("{}", "-".repeat(40));
    println!(
        "{:<20} {:<10} {:<16} {:<8} {:<10}",
        "Field", "Type", "Role", "Missing", "Missing %"
    );
    println!("{}", "-".repeat(70));
    for field in session.field_profiles() {
        println!(
            "{:<20} {:<10} {:<16} {:<8} {:<10.1}",
            truncate_str(&field.name, 19),
            field.dtype,
            format!("{:?}", field.role),
            field.null_count,
            field.null_percentage
        );
    }
    println!();

    println!("DUPLICATES (keys: {})", session.key_fields().join(", "));
    println!("{}", "-".repeat(40));
    match session.duplicate_report() {
        Some(duplicates) if duplicates.is_empty() => println!("  No duplicate rows found"),
        Some(duplicates) => {
            println!(
                "  {} duplicate rows in {} groups",
                duplicates.duplicate_count(),
                duplicates.group_count
            );
            println!("{}", duplicates.rows.head(Some(PREVIEW_ROWS)));
        }
        None => println!("  Not computed"),
    }
    println!();

    println!("OUTLIERS");
    println!("{}", "-".repeat(40));
    match session.outlier_report() {
        Some(outliers) => {
            println!(
                "  Model: {} over [{}], contamination {:.2}",
                outliers.model,
                outliers.fields.join(", "),
                outliers.contamination
            );
            for (field, mean) in &outliers.imputed_means {
                println!("  Imputed mean for {}: {:.2}", field, mean);
            }
            println!("  Rows flagged: {:?}", outliers.outlier_positions());
        }
        None => println!("  Not computed"),
    }
    println!();

    if let Some(ref summary) = report.cleaning {
        println!("CLEANING");
        println!("{}", "-".repeat(40));
        println!("  Rows: {} -> {}", summary.rows_before, summary.rows_after);
        for step in &summary.steps {
            println!("  - {}", step);
        }
        if let Some(ref cleaned) = run.cleaned {
            println!("{}", cleaned.head(Some(PREVIEW_ROWS)));
        }
        println!();
    }

    if !report.sinks.is_empty() {
        println!("OUTPUTS");
        println!("{}", "-".repeat(40));
        for sink in &report.sinks {
            match (&sink.error, sink.rows_written) {
                (Some(err), _) => println!("  [{}] {} FAILED: {}", sink.sink, sink.destination, err),
                (None, Some(rows)) => {
                    println!("  [{}] {} ({} rows)", sink.sink, sink.destination, rows)
                }
                (None, None) => println!("  [{}] {}", sink.sink, sink.destination),
            }
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("WARNINGS");
        println!("{}", "-".repeat(40));
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
