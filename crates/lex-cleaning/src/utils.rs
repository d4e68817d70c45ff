//! Shared helpers for working with tables.

use crate::error::{CleaningError, Result};
use polars::prelude::*;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Fail with `ColumnNotFound` for the first field missing from the table.
pub fn require_columns(df: &DataFrame, fields: &[String]) -> Result<()> {
    match fields.iter().find(|f| !has_column(df, f)) {
        Some(missing) => Err(CleaningError::ColumnNotFound(missing.clone())),
        None => Ok(()),
    }
}

/// Values of a column as `f64`, with unparseable or missing entries as `None`.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| CleaningError::ColumnNotFound(name.to_string()))?;
    let floats = column.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Mean over the non-missing values, `None` when every value is missing.
pub fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Fill null values in a numeric Series with a specific value.
///
/// The result is always Float64.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let floats = series.cast(&DataType::Float64)?;
    let filled: Float64Chunked = floats
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(filled.with_name(series.name().clone()).into_series())
}

/// Fill null values in a Series with a string literal.
///
/// The result is always String.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let strings = series.cast(&DataType::String)?;
    let filled: StringChunked = strings
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(filled.with_name(series.name().clone()).into_series())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_columns() {
        let df = df!["name" => ["a"], "age" => [1.0]].unwrap();
        assert!(require_columns(&df, &["name".to_string()]).is_ok());

        let err = require_columns(&df, &["name".to_string(), "salary".to_string()]).unwrap_err();
        assert!(matches!(err, CleaningError::ColumnNotFound(f) if f == "salary"));
    }

    #[test]
    fn test_float_values_from_text() {
        let df = df!["age" => [Some("30"), Some("abc"), None, Some("41.5")]].unwrap();
        let values = float_values(&df, "age").unwrap();
        assert_eq!(values, vec![Some(30.0), None, None, Some(41.5)]);
    }

    #[test]
    fn test_mean_of() {
        assert_eq!(mean_of(&[Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean_of(&[None, None]), None);
        assert_eq!(mean_of(&[]), None);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("age".into(), [Some(1i64), None, Some(3)]);
        let filled = fill_numeric_nulls(&series, 2.0).unwrap();

        assert_eq!(filled.name().as_str(), "age");
        assert_eq!(filled.null_count(), 0);
        let values: Vec<Option<f64>> = filled.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("email".into(), [Some("a@x.com"), None]);
        let filled = fill_string_nulls(&series, "unknown@gmail.com").unwrap();

        let values: Vec<Option<&str>> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("a@x.com"), Some("unknown@gmail.com")]);
    }
}
