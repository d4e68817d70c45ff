//! One non-interactive pass over the whole pipeline.

use super::CleaningSession;
use crate::config::CleanerConfig;
use crate::error::{CleaningError, Result, ResultExt};
use crate::export::write_delimited_file;
use crate::store::{TableSink, TableSource};
use crate::types::{RunReport, SinkOutcome};
use chrono::Local;
use polars::prelude::DataFrame;
use tracing::{error, info, warn};

/// Everything a run produced, for display and further use.
#[derive(Debug)]
pub struct PipelineRun {
    pub report: RunReport,
    /// Session over the loaded table, holding the latest analyses.
    pub session: CleaningSession,
    /// Cleaned table, absent when the cleaning stage was paused.
    pub cleaned: Option<DataFrame>,
}

/// Fetch, analyse, clean, then persist and export.
pub struct CleaningPipeline {
    config: CleanerConfig,
}

impl CleaningPipeline {
    pub fn new(config: CleanerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Run every stage once.
    ///
    /// Connection and query failures end the run with an error. Stage-local
    /// failures (bad key selection, missing fields, no outlier analysis) and
    /// sink failures are recorded in the report and the remaining stages
    /// still run.
    pub async fn run<S>(&self, store: &S) -> Result<PipelineRun>
    where
        S: TableSource + TableSink,
    {
        info!("{}", "=".repeat(60));
        info!("Starting cleaning run for '{}'", self.config.source_table);

        let table = store
            .fetch_all(&self.config.source_table)
            .await
            .context("Loading source table")?;

        let mut session = CleaningSession::new(table, self.config.clone())?;
        let mut report = RunReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            source_table: self.config.source_table.clone(),
            rows_loaded: session.table().height(),
            missing_values: session.missing_value_counts(),
            duplicate_rows: None,
            outlier_rows: None,
            cleaning: None,
            sinks: Vec::new(),
            warnings: Vec::new(),
        };

        match session.run_duplicate_scan() {
            Ok(duplicates) => report.duplicate_rows = Some(duplicates.duplicate_count()),
            Err(e) => pause_stage("duplicate detection", e, &mut report)?,
        }

        match session.run_outlier_analysis(self.config.contamination) {
            Ok(outliers) => report.outlier_rows = Some(outliers.outlier_count()),
            Err(e) => pause_stage("outlier detection", e, &mut report)?,
        }

        let cleaned = match session.apply_cleaning() {
            Ok(outcome) => {
                report.cleaning = Some(outcome.summary);
                Some(outcome.table)
            }
            Err(e) => {
                pause_stage("cleaning", e, &mut report)?;
                None
            }
        };

        if let Some(table) = &cleaned {
            if self.config.persist_to_store {
                report.sinks.push(self.persist(store, table).await?);
            }
            if self.config.export_csv {
                report.sinks.push(self.export(table)?);
            }
        }

        info!("Cleaning run finished");
        Ok(PipelineRun {
            report,
            session,
            cleaned,
        })
    }

    async fn persist<S: TableSink>(&self, store: &S, table: &DataFrame) -> Result<SinkOutcome> {
        let target = &self.config.target_table;
        match store.replace_table(target, table).await {
            Ok(rows) => Ok(SinkOutcome {
                sink: store.sink_name().to_string(),
                destination: target.clone(),
                success: true,
                rows_written: Some(rows),
                error: None,
            }),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("Could not write '{}': {}", target, e);
                Ok(SinkOutcome {
                    sink: store.sink_name().to_string(),
                    destination: target.clone(),
                    success: false,
                    rows_written: None,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    fn export(&self, table: &DataFrame) -> Result<SinkOutcome> {
        let destination = self.config.export_path.display().to_string();
        match write_delimited_file(&self.config.export_path, table) {
            Ok(_) => Ok(SinkOutcome {
                sink: "csv".to_string(),
                destination,
                success: true,
                rows_written: Some(table.height()),
                error: None,
            }),
            Err(CleaningError::Io(e)) => {
                error!("Could not export to {}: {}", destination, e);
                Ok(SinkOutcome {
                    sink: "csv".to_string(),
                    destination,
                    success: false,
                    rows_written: None,
                    error: Some(e.to_string()),
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Record a stage-local error and keep going; anything else ends the run.
fn pause_stage(stage: &str, e: CleaningError, report: &mut RunReport) -> Result<()> {
    if !e.is_recoverable() {
        return Err(e);
    }
    warn!("Skipping {}: {}", stage, e);
    report.warnings.push(format!("{}: {}", stage, e));
    Ok(())
}
