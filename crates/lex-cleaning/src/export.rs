//! Delimited-text export of a table.

use crate::error::{Result, ResultExt};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tracing::info;

/// Encode the table as UTF-8 CSV: a header line with the field names in table
/// order, then one line per record. Missing values are empty fields.
pub fn to_delimited_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    // CsvWriter needs a mutable frame
    let mut table = df.clone();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut table)
        .context("Failed to encode table as CSV")?;
    Ok(buf)
}

/// Write the CSV encoding of the table to `path`, creating parent directories.
pub fn write_delimited_file(path: impl AsRef<Path>, df: &DataFrame) -> Result<usize> {
    let path = path.as_ref();
    let bytes = to_delimited_bytes(df)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &bytes)?;

    info!("Exported {} rows to {}", df.height(), path.display());
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn cleaned() -> DataFrame {
        df![
            "id" => [1i64, 2],
            "name" => ["Ann", "Bob"],
            "email" => [Some("ann@x.com"), None],
            "age" => [30.5, 41.25],
        ]
        .unwrap()
    }

    #[test]
    fn test_header_and_missing_values() {
        let bytes = to_delimited_bytes(&cleaned()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id,name,email,age");
        assert_eq!(lines[1], "1,Ann,ann@x.com,30.5");
        assert_eq!(lines[2], "2,Bob,,41.25");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            to_delimited_bytes(&cleaned()).unwrap(),
            to_delimited_bytes(&cleaned()).unwrap()
        );
    }

    #[test]
    fn test_parses_back_to_same_table() {
        let table = df![
            "id" => [1i64, 2, 3],
            "name" => ["Smith, J", "Bob", "Ann"],
            "email" => [Some("ann@x.com"), None, Some("c@x.com")],
            "age" => [30.5, 41.25, 28.0],
        ]
        .unwrap();

        let bytes = to_delimited_bytes(&table).unwrap();
        let parsed = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .unwrap();

        assert!(parsed.equals_missing(&table));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("lex_cleaning_export_{}", std::process::id()));
        let path = dir.join("nested").join("out.csv");

        let written = write_delimited_file(&path, &cleaned()).unwrap();
        let on_disk = fs::read(&path).unwrap();
        assert_eq!(on_disk.len(), written);
        assert_eq!(on_disk, to_delimited_bytes(&cleaned()).unwrap());

        fs::remove_dir_all(&dir).unwrap();
    }
}
