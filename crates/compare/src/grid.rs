//! Row/column comparison of two tables.
//!
//! The header row is compared first, then every data cell up to the larger of
//! the two tables' extents. Cells are addressed by position: a row or column
//! present in only one table yields Missing/Surplus cells. One column (by
//! default column 0) holds row names; its cells are compared only when both
//! tables have the row, so an absent row is reported once per value cell.
//!
//! Only failing cells are kept. Results are computed on the first query and
//! cached until [`CsvComparison::invalidate`] or [`CsvComparison::reload`].

use std::collections::HashSet;

use serde::Serialize;

use crate::config::ComparisonConfig;
use crate::error::CompareError;
use crate::evaluation::Evaluation;
use crate::render::{CellFn, RenderedTable, ReportCell, ReportStatus, TableRenderer};
use crate::summary::{compute_summary, ComparisonSummary};
use crate::tolerance::Tolerance;
use crate::value::{CompareContext, ValueComparison};
use crate::value_type::CompareType;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A header row plus data rows. Rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Read CSV text; the first record is the header row.
    pub fn from_csv_str(text: &str) -> Result<Self, CompareError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| CompareError::Csv(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| CompareError::Csv(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn header(&self, column: usize) -> Option<&str> {
        self.headers.get(column).map(String::as_str)
    }

    /// Data cell, `None` outside the table.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest of the header row and every data row.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .fold(self.headers.len(), usize::max)
    }
}

// ---------------------------------------------------------------------------
// Cell results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellComparison {
    /// Data row index; `None` for the header row.
    pub row: Option<usize>,
    pub row_name: String,
    pub column: usize,
    pub column_name: String,
    pub comparison: ValueComparison,
}

impl CellComparison {
    /// 1-based data row number; the header row is 0.
    pub fn row_number(&self) -> usize {
        self.row.map_or(0, |r| r + 1)
    }

    pub fn column_number(&self) -> usize {
        self.column + 1
    }

    /// Spreadsheet-style reference with the header on row 1 (`B1`, `B2`, ...).
    pub fn cell_reference(&self) -> String {
        format!("{}{}", col_to_letters(self.column), self.row_number() + 1)
    }

    /// Position identity used to diff two runs.
    pub fn key(&self) -> (Option<usize>, usize) {
        (self.row, self.column)
    }
}

/// 0 → A, 25 → Z, 26 → AA.
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Failures present in one run but not the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorDelta {
    pub only_in_first: Vec<CellComparison>,
    pub only_in_second: Vec<CellComparison>,
}

impl ErrorDelta {
    pub fn is_empty(&self) -> bool {
        self.only_in_first.is_empty() && self.only_in_second.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct GridRun {
    errors: Vec<CellComparison>,
    cells_compared: usize,
}

pub struct CsvComparison {
    base: CsvTable,
    compared: CsvTable,
    tolerance: Option<Tolerance>,
    key_column: Option<usize>,
    compare_type: Option<CompareType>,
    run: Evaluation<GridRun>,
}

impl CsvComparison {
    pub fn new(base: CsvTable, compared: CsvTable, tolerance: Option<Tolerance>) -> Self {
        Self {
            base,
            compared,
            tolerance,
            key_column: Some(0),
            compare_type: None,
            run: Evaluation::Unevaluated,
        }
    }

    pub fn from_config(
        base: CsvTable,
        compared: CsvTable,
        config: &ComparisonConfig,
    ) -> Result<Self, CompareError> {
        Ok(Self::new(base, compared, Some(config.tolerance()?))
            .with_key_column(config.key_column())
            .with_compare_type(config.compare_type()?))
    }

    /// Row-name column, excluded from the data pass. `None` compares every column.
    pub fn with_key_column(mut self, key_column: Option<usize>) -> Self {
        self.key_column = key_column;
        self.run.invalidate();
        self
    }

    /// Force every cell to be compared as one type instead of inferring per cell.
    pub fn with_compare_type(mut self, compare_type: Option<CompareType>) -> Self {
        self.compare_type = compare_type;
        self.run.invalidate();
        self
    }

    pub fn base(&self) -> &CsvTable {
        &self.base
    }

    pub fn compared(&self) -> &CsvTable {
        &self.compared
    }

    pub fn tolerance(&self) -> Option<&Tolerance> {
        self.tolerance.as_ref()
    }

    fn evaluate(&mut self) -> &GridRun {
        let Self {
            base,
            compared,
            tolerance,
            key_column,
            compare_type,
            run,
        } = self;
        run.get_or_evaluate(|| compare_tables(base, compared, tolerance.as_ref(), *key_column, *compare_type))
    }

    /// Failing cells, header first, then data cells in row-major order.
    pub fn query(&mut self) -> &[CellComparison] {
        &self.evaluate().errors
    }

    pub fn error_count(&mut self) -> usize {
        self.evaluate().errors.len()
    }

    /// Cells examined in the last run, header cells included.
    pub fn cells_compared(&mut self) -> usize {
        self.evaluate().cells_compared
    }

    pub fn summary(&mut self) -> ComparisonSummary {
        let run = self.evaluate();
        compute_summary(
            run.cells_compared,
            run.errors.iter().map(|e| e.comparison.outcome()),
        )
    }

    pub fn do_table(&mut self, columns: Option<&[&str]>) -> Result<RenderedTable, CompareError> {
        grid_renderer().render(self.query(), columns)
    }

    pub fn invalidate(&mut self) {
        if self.run.is_evaluated() {
            log::debug!("grid comparison invalidated");
        }
        self.run.invalidate();
    }

    /// Drop the cached results and compare again.
    pub fn rerun(&mut self) -> &[CellComparison] {
        self.invalidate();
        self.query()
    }

    pub fn reload(&mut self, base: CsvTable, compared: CsvTable) {
        self.base = base;
        self.compared = compared;
        self.invalidate();
    }

    /// Cells failing in only one of `self` and `other`, matched by position.
    pub fn error_delta(&mut self, other: &mut CsvComparison) -> ErrorDelta {
        let first = self.query();
        let second = other.query();

        let first_keys: HashSet<_> = first.iter().map(CellComparison::key).collect();
        let second_keys: HashSet<_> = second.iter().map(CellComparison::key).collect();

        ErrorDelta {
            only_in_first: first
                .iter()
                .filter(|e| !second_keys.contains(&e.key()))
                .cloned()
                .collect(),
            only_in_second: second
                .iter()
                .filter(|e| !first_keys.contains(&e.key()))
                .cloned()
                .collect(),
        }
    }
}

fn compare_tables(
    base: &CsvTable,
    compared: &CsvTable,
    tolerance: Option<&Tolerance>,
    key_column: Option<usize>,
    compare_type: Option<CompareType>,
) -> GridRun {
    let columns = base.column_count().max(compared.column_count());
    let rows = base.row_count().max(compared.row_count());
    let column_name = |c: usize| {
        base.header(c)
            .or_else(|| compared.header(c))
            .unwrap_or_default()
            .to_string()
    };
    let key_header = key_column.map(column_name).unwrap_or_default();

    let mut run = GridRun::default();

    // Header names compare as plain text.
    let header_ctx = CompareContext::new().with_compare_type(Some(CompareType::String));
    for column in 0..columns {
        run.cells_compared += 1;
        let comparison = ValueComparison::compare(base.header(column), compared.header(column), header_ctx);
        if !comparison.is_ok() {
            log::trace!("header {}: {}", col_to_letters(column), comparison.value_message());
            run.errors.push(CellComparison {
                row: None,
                row_name: key_header.clone(),
                column,
                column_name: column_name(column),
                comparison,
            });
        }
    }

    let ctx = CompareContext::new()
        .with_tolerance(tolerance)
        .with_compare_type(compare_type);
    for row in 0..rows {
        let row_name = key_column
            .and_then(|k| base.cell(row, k).or_else(|| compared.cell(row, k)))
            .unwrap_or_default()
            .to_string();

        for column in 0..columns {
            let (expected, actual) = (base.cell(row, column), compared.cell(row, column));
            if Some(column) == key_column && (expected.is_none() || actual.is_none()) {
                continue;
            }
            run.cells_compared += 1;
            let comparison = ValueComparison::compare(expected, actual, ctx);
            if comparison.is_ok() {
                continue;
            }
            let cell = CellComparison {
                row: Some(row),
                row_name: row_name.clone(),
                column,
                column_name: column_name(column),
                comparison,
            };
            log::trace!("{}: {}", cell.cell_reference(), cell.comparison.value_message());
            run.errors.push(cell);
        }
    }

    log::debug!(
        "grid comparison: {} cells compared, {} errors ({} x {} extent)",
        run.cells_compared,
        run.errors.len(),
        rows,
        columns
    );
    run
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn grid_renderer() -> TableRenderer<CellComparison> {
    let mut columns: Vec<(&'static str, CellFn<CellComparison>)> = Vec::new();
    columns.push(("Row", |c| ReportCell::report(c.row_number().to_string())));
    columns.push(("Row Name", |c| ReportCell::report(c.row_name.as_str())));
    columns.push(("Column", |c| ReportCell::report(c.column_number().to_string())));
    columns.push(("Column Name", |c| ReportCell::report(c.column_name.as_str())));
    columns.push(("Cell", |c| ReportCell::report(c.cell_reference())));
    columns.push(("Expected", |c| ReportCell::report(c.comparison.expected_out())));
    columns.push(("Actual", |c| ReportCell::new(c.comparison.status(), c.comparison.actual_out())));
    columns.push(("Delta", |c| ReportCell::report(c.comparison.delta_out())));
    columns.push(("Delta %", |c| ReportCell::report(c.comparison.delta_percentage_message())));
    columns.push(("Outcome", |c| ReportCell::new(c.comparison.status(), c.comparison.outcome().as_str())));
    columns.push(("Message", |c| ReportCell::new(ReportStatus::Fail, c.comparison.value_message())));
    TableRenderer::new(columns)
}
