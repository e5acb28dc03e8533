use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::CompareError;
use crate::tolerance::Tolerance;
use crate::value_type::CompareType;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Options shared by the grid and time-series comparators.
///
/// ```toml
/// tolerance = "0.1;1%:3"
/// compare_type = "double"
/// columns = ["Cell", "Message"]
/// key_column = 0
/// row_names = true
///
/// [time_range]
/// start = "2024-01-01T00:00:00Z"
/// end = "2024-01-02T00:00:00Z"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default)]
    pub tolerance: String,
    #[serde(default)]
    pub compare_type: Option<String>,
    /// Display columns for the rendered table; all when absent.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub key_column: usize,
    /// When false there is no row-name column and every column is compared.
    #[serde(default = "default_true")]
    pub row_names: bool,
    #[serde(default)]
    pub time_range: Option<TimeRangeConfig>,
}

fn default_true() -> bool {
    true
}

/// Inclusive bounds for time-series subsetting. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct TimeRangeConfig {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Parsing and validation
// ---------------------------------------------------------------------------

impl ComparisonConfig {
    pub fn from_toml(input: &str) -> Result<Self, CompareError> {
        let config: ComparisonConfig =
            toml::from_str(input).map_err(|e| CompareError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        Tolerance::parse(&self.tolerance).map_err(|e| {
            CompareError::ConfigValidation(format!("tolerance '{}': {e}", self.tolerance))
        })?;

        if let Some(name) = &self.compare_type {
            name.parse::<CompareType>()
                .map_err(|e| CompareError::ConfigValidation(e.to_string()))?;
        }

        if let Some(columns) = &self.columns {
            if columns.iter().any(|c| c.trim().is_empty()) {
                return Err(CompareError::ConfigValidation(
                    "columns must not contain empty names".into(),
                ));
            }
        }

        if let Some(TimeRangeConfig {
            start: Some(start),
            end: Some(end),
        }) = self.time_range
        {
            if start > end {
                return Err(CompareError::ConfigValidation(format!(
                    "time_range start {} is after end {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                )));
            }
        }

        Ok(())
    }

    pub fn tolerance(&self) -> Result<Tolerance, CompareError> {
        Tolerance::parse(&self.tolerance)
    }

    pub fn compare_type(&self) -> Result<Option<CompareType>, CompareError> {
        self.compare_type
            .as_deref()
            .map(str::parse::<CompareType>)
            .transpose()
    }

    /// Display column names as borrowed slices, ready for `do_table`.
    pub fn column_refs(&self) -> Option<Vec<&str>> {
        self.columns
            .as_ref()
            .map(|columns| columns.iter().map(String::as_str).collect())
    }

    /// The row-name column, or `None` when row names are disabled.
    pub fn key_column(&self) -> Option<usize> {
        self.row_names.then_some(self.key_column)
    }

    pub fn time_bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self.time_range {
            Some(range) => (range.start, range.end),
            None => (None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = ComparisonConfig::from_toml(
            r#"
tolerance = "0.1;1%:3"
compare_type = "Double"
columns = ["Cell", "Message"]
key_column = 1

[time_range]
start = "2024-01-01T00:00:00Z"
end = "2024-01-02T00:00:00Z"
"#,
        )
        .unwrap();

        assert_eq!(config.tolerance().unwrap().specs().len(), 2);
        assert_eq!(config.compare_type().unwrap(), Some(CompareType::Double));
        assert_eq!(config.column_refs(), Some(vec!["Cell", "Message"]));
        assert_eq!(config.key_column(), Some(1));
        let (start, end) = config.time_bounds();
        assert!(start.unwrap() < end.unwrap());
    }

    #[test]
    fn defaults() {
        let config = ComparisonConfig::from_toml("").unwrap();
        assert_eq!(config.tolerance().unwrap(), Tolerance::parse("").unwrap());
        assert_eq!(config.compare_type().unwrap(), None);
        assert_eq!(config.column_refs(), None);
        assert_eq!(config.key_column(), Some(0));
        assert_eq!(config.time_bounds(), (None, None));
    }

    #[test]
    fn row_names_off_disables_key_column() {
        let config = ComparisonConfig::from_toml("row_names = false\nkey_column = 2").unwrap();
        assert_eq!(config.key_column(), None);
    }

    #[test]
    fn rejects_bad_tolerance() {
        let err = ComparisonConfig::from_toml(r#"tolerance = "1;x%""#).unwrap_err();
        assert!(matches!(err, CompareError::ConfigValidation(_)));
        assert!(err.to_string().contains("1;x%"));
    }

    #[test]
    fn rejects_unknown_type() {
        let err = ComparisonConfig::from_toml(r#"compare_type = "datetime""#).unwrap_err();
        assert_eq!(
            err,
            CompareError::ConfigValidation("type not recognized: datetime".into())
        );
    }

    #[test]
    fn rejects_inverted_time_range() {
        let err = ComparisonConfig::from_toml(
            r#"
[time_range]
start = "2024-02-01T00:00:00Z"
end = "2024-01-01T00:00:00Z"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CompareError::ConfigValidation(_)));
    }

    #[test]
    fn parse_error_is_reported() {
        let err = ComparisonConfig::from_toml("tolerance = ").unwrap_err();
        assert!(matches!(err, CompareError::ConfigParse(_)));
    }
}
