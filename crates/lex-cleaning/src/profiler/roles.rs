//! Field role classification.

use crate::types::{FieldRole, IDENTIFIER_FIELD};
use polars::prelude::*;

/// Classify a field by name.
pub fn classify_field(name: &str, numeric_fields: &[String]) -> FieldRole {
    if name == IDENTIFIER_FIELD {
        FieldRole::Identifier
    } else if numeric_fields.iter().any(|f| f == name) {
        FieldRole::NumericAnalysis
    } else {
        FieldRole::GroupingKey
    }
}

/// Every field that may be selected as a duplicate key, in table order.
pub fn duplicate_key_candidates(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .filter(|c| c.as_str() != IDENTIFIER_FIELD)
        .map(|c| c.to_string())
        .collect()
}

/// The requested key fields that are valid candidates in this table, in
/// requested order.
pub fn available_key_fields(df: &DataFrame, requested: &[String]) -> Vec<String> {
    let candidates = duplicate_key_candidates(df);
    requested
        .iter()
        .filter(|f| candidates.contains(f))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_field() {
        let numeric = vec!["age".to_string()];
        assert_eq!(classify_field("id", &numeric), FieldRole::Identifier);
        assert_eq!(classify_field("age", &numeric), FieldRole::NumericAnalysis);
        assert_eq!(classify_field("name", &numeric), FieldRole::GroupingKey);
    }

    #[test]
    fn test_candidates_exclude_identifier() {
        let df = df![
            "id" => [1i64],
            "name" => ["a"],
            "city" => ["x"],
        ]
        .unwrap();
        assert_eq!(duplicate_key_candidates(&df), ["name", "city"]);
    }

    #[test]
    fn test_available_key_fields_intersects_schema() {
        let df = df![
            "id" => [1i64],
            "salary" => [1.0],
            "name" => ["a"],
            "city" => ["x"],
        ]
        .unwrap();
        let requested: Vec<String> = ["name", "email", "id", "salary"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(available_key_fields(&df, &requested), ["name", "salary"]);
    }
}
