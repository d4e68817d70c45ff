//! SQLite store.
//!
//! Connection strings follow sqlx: `sqlite::memory:` for an in-memory database,
//! `sqlite://path/to/file.db` for a file (created when missing).
//!
//! SQLite is dynamically typed, so each value is decoded by its own storage
//! class and every column takes the widest type seen in it: any text makes the
//! column String, otherwise any real makes it Float64, otherwise Int64. A
//! column holding only NULLs is String.

use super::{OUTPUT_SCHEMA, TableSink, TableSource, is_valid_identifier};
use crate::error::{CleaningError, Result};
use async_trait::async_trait;
use polars::prelude::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::{debug, info};

/// One decoded SQLite value.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Handle on one SQLite database.
///
/// The handle is opened by [`SqliteStore::connect`] and ends with
/// [`SqliteStore::close`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    url: String,
}

impl SqliteStore {
    /// Open the database and check that it answers.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| CleaningError::Connection(format!("invalid database url: {}", e)))?
            .create_if_missing(true);

        // A single long-lived connection; an in-memory database lives only as
        // long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| CleaningError::Connection(e.to_string()))?;

        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| CleaningError::Connection(e.to_string()))?;

        info!("Connected to {}", url);
        Ok(Self {
            pool,
            url: url.to_string(),
        })
    }

    /// Run a statement outside of the table operations, e.g. to seed data.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected())
    }

    /// Close the handle.
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Closed {}", self.url);
    }

    async fn column_names(&self, table_name: &str) -> Result<Vec<String>> {
        let pragma = format!("PRAGMA table_info('{}')", table_name);
        let rows = sqlx::query(&pragma)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        if rows.is_empty() {
            return Err(CleaningError::Query(format!(
                "table '{}' does not exist",
                table_name
            )));
        }

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(query_error))
            .collect()
    }
}

#[async_trait]
impl TableSource for SqliteStore {
    async fn fetch_all(&self, table_name: &str) -> Result<DataFrame> {
        if !is_valid_identifier(table_name) {
            return Err(CleaningError::Query(format!(
                "invalid table name '{}'",
                table_name
            )));
        }

        let names = self.column_names(table_name).await?;
        let select = format!(
            "SELECT {} FROM \"{}\"",
            names
                .iter()
                .map(|n| format!("\"{}\"", n.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(", "),
            table_name
        );
        let rows = sqlx::query(&select)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        let mut cells: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for row in &rows {
            for (idx, column) in cells.iter_mut().enumerate() {
                column.push(decode_cell(row, idx)?);
            }
        }

        let columns: Vec<Column> = names
            .iter()
            .zip(cells)
            .map(|(name, values)| build_series(name, values).into_column())
            .collect();
        let df = DataFrame::new(columns)?;

        info!(
            "Loaded {} rows and {} fields from '{}'",
            df.height(),
            df.width(),
            table_name
        );
        Ok(df)
    }
}

#[async_trait]
impl TableSink for SqliteStore {
    fn sink_name(&self) -> &'static str {
        "sqlite"
    }

    async fn replace_table(&self, table_name: &str, table: &DataFrame) -> Result<usize> {
        if !is_valid_identifier(table_name) {
            return Err(CleaningError::Write(format!(
                "invalid table name '{}'",
                table_name
            )));
        }

        let columns: Vec<Option<&Column>> = OUTPUT_SCHEMA
            .iter()
            .map(|(name, _)| table.column(name).ok())
            .collect();
        let create = format!(
            "CREATE TABLE \"{}\" ({})",
            table_name,
            OUTPUT_SCHEMA
                .iter()
                .map(|(name, sql_type)| format!("{} {}", name, sql_type))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let insert = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table_name,
            OUTPUT_SCHEMA
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", "),
            vec!["?"; OUTPUT_SCHEMA.len()].join(", ")
        );

        // Dropping the transaction without commit rolls everything back
        let mut tx = self.pool.begin().await.map_err(write_error)?;

        sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", table_name))
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;
        sqlx::query(&create)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;

        for row in 0..table.height() {
            let mut query = sqlx::query(&insert);
            for column in &columns {
                query = match column {
                    Some(column) => match encode_cell(column, row)? {
                        Cell::Null => query.bind(None::<String>),
                        Cell::Integer(v) => query.bind(v),
                        Cell::Real(v) => query.bind(v),
                        Cell::Text(v) => query.bind(v),
                    },
                    None => query.bind(None::<String>),
                };
            }
            query.execute(&mut *tx).await.map_err(write_error)?;
        }

        tx.commit().await.map_err(write_error)?;

        info!("Wrote {} rows to '{}'", table.height(), table_name);
        Ok(table.height())
    }
}

fn query_error(e: sqlx::Error) -> CleaningError {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            CleaningError::Connection(e.to_string())
        }
        _ => CleaningError::Query(e.to_string()),
    }
}

fn write_error(e: sqlx::Error) -> CleaningError {
    CleaningError::Write(e.to_string())
}

fn decode_cell(row: &SqliteRow, idx: usize) -> Result<Cell> {
    let raw = row.try_get_raw(idx).map_err(query_error)?;
    if raw.is_null() {
        return Ok(Cell::Null);
    }
    let storage = raw.type_info().name().to_string();

    let cell = match storage.as_str() {
        "INTEGER" => Cell::Integer(row.try_get::<i64, _>(idx).map_err(query_error)?),
        "REAL" => Cell::Real(row.try_get::<f64, _>(idx).map_err(query_error)?),
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(idx).map_err(query_error)?;
            Cell::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Cell::Text(row.try_get::<String, _>(idx).map_err(query_error)?),
    };
    Ok(cell)
}

fn build_series(name: &str, values: Vec<Cell>) -> Series {
    let has_text = values.iter().any(|c| matches!(c, Cell::Text(_)));
    let has_real = values.iter().any(|c| matches!(c, Cell::Real(_)));
    let all_null = values.iter().all(|c| matches!(c, Cell::Null));

    if has_text || all_null {
        let chunked: StringChunked = values
            .into_iter()
            .map(|c| match c {
                Cell::Null => None,
                Cell::Integer(v) => Some(v.to_string()),
                Cell::Real(v) => Some(v.to_string()),
                Cell::Text(v) => Some(v),
            })
            .collect();
        chunked.with_name(name.into()).into_series()
    } else if has_real {
        let chunked: Float64Chunked = values
            .into_iter()
            .map(|c| match c {
                Cell::Integer(v) => Some(v as f64),
                Cell::Real(v) => Some(v),
                _ => None,
            })
            .collect();
        chunked.with_name(name.into()).into_series()
    } else {
        let chunked: Int64Chunked = values
            .into_iter()
            .map(|c| match c {
                Cell::Integer(v) => Some(v),
                _ => None,
            })
            .collect();
        chunked.with_name(name.into()).into_series()
    }
}

/// Convert one table value into something SQLite can store.
fn encode_cell(column: &Column, row: usize) -> Result<Cell> {
    let value = column.get(row)?;
    let cell = match value {
        AnyValue::Null => Cell::Null,
        AnyValue::Boolean(v) => Cell::Integer(v as i64),
        AnyValue::Int8(v) => Cell::Integer(v as i64),
        AnyValue::Int16(v) => Cell::Integer(v as i64),
        AnyValue::Int32(v) => Cell::Integer(v as i64),
        AnyValue::Int64(v) => Cell::Integer(v),
        AnyValue::UInt8(v) => Cell::Integer(v as i64),
        AnyValue::UInt16(v) => Cell::Integer(v as i64),
        AnyValue::UInt32(v) => Cell::Integer(v as i64),
        AnyValue::Float32(v) => Cell::Real(v as f64),
        AnyValue::Float64(v) => Cell::Real(v),
        AnyValue::String(v) => Cell::Text(v.to_string()),
        AnyValue::StringOwned(v) => Cell::Text(v.to_string()),
        other => {
            return Err(CleaningError::Write(format!(
                "unsupported value {} in column '{}'",
                other.dtype(),
                column.name()
            )));
        }
    };
    Ok(cell)
}
