//! Report table rendering.
//!
//! A [`TableRenderer`] is a declared list of named columns, each a plain
//! function from a record to a [`ReportCell`]. Callers pick a subset of the
//! columns by name (case-insensitive) or take them all.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::CompareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pass,
    Fail,
    /// Informational cell, neither pass nor fail.
    Report,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered cell. Displays as `status:text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportCell {
    pub status: ReportStatus,
    pub text: String,
}

impl ReportCell {
    pub fn new(status: ReportStatus, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    pub fn report(text: impl Into<String>) -> Self {
        Self::new(ReportStatus::Report, text)
    }
}

impl fmt::Display for ReportCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.status, self.text)
    }
}

pub type CellFn<T> = fn(&T) -> ReportCell;

pub struct TableRenderer<T> {
    columns: Vec<(&'static str, CellFn<T>)>,
}

impl<T> TableRenderer<T> {
    pub fn new(columns: Vec<(&'static str, CellFn<T>)>) -> Self {
        Self { columns }
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(name, _)| *name).collect()
    }

    /// Render `records` with the `desired` columns, in the order given.
    /// `None` or an empty list selects every column in declared order.
    pub fn render<'a, I>(
        &self,
        records: I,
        desired: Option<&[&str]>,
    ) -> Result<RenderedTable, CompareError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let selected = self.select(desired)?;

        let header = selected.iter().map(|(name, _)| name.to_string()).collect();
        let rows = records
            .into_iter()
            .map(|record| selected.iter().map(|(_, cell)| cell(record)).collect())
            .collect();

        Ok(RenderedTable { header, rows })
    }

    fn select(&self, desired: Option<&[&str]>) -> Result<Vec<(&'static str, CellFn<T>)>, CompareError> {
        let desired = match desired {
            Some(names) if !names.is_empty() => names,
            _ => return Ok(self.columns.clone()),
        };

        let by_name: HashMap<String, (&'static str, CellFn<T>)> = self
            .columns
            .iter()
            .map(|&(name, cell)| (name.to_lowercase(), (name, cell)))
            .collect();

        desired
            .iter()
            .map(|requested| {
                by_name
                    .get(&requested.trim().to_lowercase())
                    .copied()
                    .ok_or_else(|| CompareError::UnknownColumn {
                        requested: requested.to_string(),
                        valid: self.column_names().into_iter().map(String::from).collect(),
                    })
            })
            .collect()
    }
}

/// Header plus one row of cells per record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<ReportCell>>,
}

impl RenderedTable {
    /// Flatten to strings: the header row first, then `status:text` cells.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(
                self.rows
                    .iter()
                    .map(|row| row.iter().map(ToString::to_string).collect()),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        name: &'static str,
        ok: bool,
    }

    fn renderer() -> TableRenderer<Pair> {
        let mut columns: Vec<(&'static str, CellFn<Pair>)> = Vec::new();
        columns.push(("Name", |p| ReportCell::report(p.name)));
        columns.push(("Result", |p| {
            let status = if p.ok { ReportStatus::Pass } else { ReportStatus::Fail };
            ReportCell::new(status, if p.ok { "ok" } else { "bad" })
        }));
        TableRenderer::new(columns)
    }

    fn records() -> Vec<Pair> {
        vec![Pair { name: "a", ok: true }, Pair { name: "b", ok: false }]
    }

    #[test]
    fn renders_all_columns_by_default() {
        let records = records();
        let table = renderer().render(&records, None).unwrap();
        assert_eq!(
            table.to_rows(),
            vec![
                vec!["Name".to_string(), "Result".to_string()],
                vec!["report:a".to_string(), "pass:ok".to_string()],
                vec!["report:b".to_string(), "fail:bad".to_string()],
            ]
        );
        assert_eq!(renderer().render(&records, Some(&[])).unwrap(), table);
    }

    #[test]
    fn selects_case_insensitively_in_requested_order() {
        let records = records();
        let table = renderer().render(&records, Some(&["result", "NAME"])).unwrap();
        assert_eq!(table.header, vec!["Result", "Name"]);
        assert_eq!(table.rows[1][0].to_string(), "fail:bad");
    }

    #[test]
    fn unknown_column_lists_valid_names() {
        let records = records();
        let err = renderer().render(&records, Some(&["Name", "Bogus"])).unwrap_err();
        assert_eq!(
            err,
            CompareError::UnknownColumn {
                requested: "Bogus".into(),
                valid: vec!["Name".into(), "Result".into()],
            }
        );
    }

    #[test]
    fn empty_record_set_renders_header_only() {
        let table = renderer().render(&Vec::<Pair>::new(), None).unwrap();
        assert_eq!(table.to_rows().len(), 1);
    }
}
