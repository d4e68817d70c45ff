//! Relational store access.
//!
//! The pipeline only sees two capabilities: reading a whole table
//! ([`TableSource`]) and replacing one ([`TableSink`]). [`SqliteStore`]
//! implements both on top of `sqlx`.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use regex::Regex;

/// Schema of the cleaned table written back to the store, in column order.
pub const OUTPUT_SCHEMA: [(&str, &str); 5] = [
    ("id", "INTEGER"),
    ("name", "VARCHAR(100)"),
    ("email", "VARCHAR(200)"),
    ("age", "FLOAT"),
    ("salary", "FLOAT"),
];

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Check that a table name can be interpolated into SQL as-is.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Source of full-table reads.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Read every row of `table_name` in store order.
    ///
    /// Fails with `Connection` when the store is unreachable and with `Query`
    /// when the table does not exist or the name is not a plain identifier.
    async fn fetch_all(&self, table_name: &str) -> Result<DataFrame>;
}

/// Destination that replaces a whole table.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Short name used in reports.
    fn sink_name(&self) -> &'static str;

    /// Drop and recreate `table_name` with [`OUTPUT_SCHEMA`] and insert every
    /// row. Either the whole replacement is visible afterwards or none of it.
    ///
    /// Returns the number of rows written.
    async fn replace_table(&self, table_name: &str, table: &DataFrame) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("customer_data"));
        assert!(is_valid_identifier("_t1"));
        assert!(!is_valid_identifier("1table"));
        assert!(!is_valid_identifier("users; DROP TABLE x"));
        assert!(!is_valid_identifier("a\"b"));
        assert!(!is_valid_identifier(""));
    }
}
