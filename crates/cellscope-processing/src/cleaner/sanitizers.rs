//! Detection of columns that carry no data.

use once_cell::sync::Lazy;
use polars::prelude::*;

// Header patterns left behind by spreadsheet exports and trailing commas
static ARTIFACT_COLUMN_PATTERNS: Lazy<Vec<regex::Regex>> = Lazy::new(|| {
    vec![
        regex::Regex::new(r"^Unnamed: \d+$").expect("Invalid regex: pandas index artifact"),
        regex::Regex::new(r"^column_\d+$").expect("Invalid regex: polars generated name"),
        regex::Regex::new(r"^\s*$").expect("Invalid regex: blank header"),
    ]
});

/// Whether a header looks like an export artifact rather than a real column.
pub(crate) fn is_artifact_column_name(name: &str) -> bool {
    ARTIFACT_COLUMN_PATTERNS.iter().any(|re| re.is_match(name))
}

/// Whether every value in a non-empty series is null.
pub(crate) fn is_fully_empty(series: &Series) -> bool {
    !series.is_empty() && series.null_count() == series.len()
}

/// Render a label cell for an error message.
pub(crate) fn describe_label(value: Option<&str>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<empty>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names() {
        assert!(is_artifact_column_name("Unnamed: 32"));
        assert!(is_artifact_column_name("column_33"));
        assert!(is_artifact_column_name(""));
        assert!(is_artifact_column_name("  "));
        assert!(!is_artifact_column_name("radius_mean"));
        assert!(!is_artifact_column_name("Unnamed"));
    }

    #[test]
    fn test_fully_empty() {
        let empty = Series::new("x".into(), &[None::<f64>, None]);
        let partial = Series::new("y".into(), &[Some(1.0f64), None]);
        let no_rows = Series::new_empty("z".into(), &DataType::Float64);
        assert!(is_fully_empty(&empty));
        assert!(!is_fully_empty(&partial));
        assert!(!is_fully_empty(&no_rows));
    }

    #[test]
    fn test_describe_label() {
        assert_eq!(describe_label(Some("X")), "X");
        assert_eq!(describe_label(None), "<empty>");
    }
}
