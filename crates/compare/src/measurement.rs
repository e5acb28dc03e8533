//! Timestamp-indexed comparison of two measurement series.
//!
//! Points are matched by exact timestamp. Each matched pair yields a
//! [`MeasurementComparison`] of timestamp, value and quality flag; expected
//! points without a partner are Missing, unmatched actual points Surplus.
//!
//! The compare type and the tolerance data range are fixed once per run from
//! whole-series metadata, so every point is judged on the same terms.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Bound;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::ComparisonConfig;
use crate::error::CompareError;
use crate::evaluation::Evaluation;
use crate::render::{CellFn, RenderedTable, ReportCell, ReportStatus, TableRenderer};
use crate::summary::{compute_summary, ComparisonSummary};
use crate::tolerance::{ResolvedTolerance, Tolerance};
use crate::value::{CompareContext, CompareOutcome, ValueComparison};
use crate::value_type::{infer_compatible_type, parse_double, promote, CompareType};

/// RFC 3339 with a `Z` suffix, the form used in messages and errors.
pub fn timestamp_text(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub value: String,
    pub is_good: bool,
}

impl Measurement {
    pub fn new(timestamp: DateTime<Utc>, value: impl Into<String>, is_good: bool) -> Self {
        Self {
            timestamp,
            value: value.into(),
            is_good,
        }
    }
}

/// Which series a measurement or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesSide {
    Expected,
    Actual,
}

impl SeriesSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expected => "expected",
            Self::Actual => "actual",
        }
    }
}

impl fmt::Display for SeriesSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side's measurements, unique by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSeries {
    side: SeriesSide,
    points: BTreeMap<DateTime<Utc>, Measurement>,
}

impl MeasurementSeries {
    pub fn new(side: SeriesSide) -> Self {
        Self {
            side,
            points: BTreeMap::new(),
        }
    }

    pub fn from_measurements<I>(side: SeriesSide, measurements: I) -> Result<Self, CompareError>
    where
        I: IntoIterator<Item = Measurement>,
    {
        let mut series = Self::new(side);
        for m in measurements {
            series.push(m)?;
        }
        Ok(series)
    }

    pub fn push(&mut self, measurement: Measurement) -> Result<(), CompareError> {
        if self.points.contains_key(&measurement.timestamp) {
            return Err(CompareError::DuplicateKey {
                side: self.side,
                timestamp: timestamp_text(&measurement.timestamp),
            });
        }
        self.points.insert(measurement.timestamp, measurement);
        Ok(())
    }

    pub fn side(&self) -> SeriesSide {
        self.side
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, timestamp: &DateTime<Utc>) -> Option<&Measurement> {
        self.points.get(timestamp)
    }

    /// Measurements in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.points.values()
    }

    /// Type every value converts to; `None` for an empty series.
    pub fn value_type(&self) -> Option<CompareType> {
        infer_compatible_type(self.iter().map(|m| m.value.as_str()))
    }

    /// max − min over the finite numeric values, `None` without any.
    pub fn numeric_range(&self) -> Option<f64> {
        let (min, max) = self
            .iter()
            .filter_map(|m| parse_double(&m.value))
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        Some(max - min)
    }
}

// ---------------------------------------------------------------------------
// Per-timestamp comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementComparison {
    pub timestamp: DateTime<Utc>,
    pub timestamp_comparison: ValueComparison,
    pub value: ValueComparison,
    pub is_good: ValueComparison,
}

impl MeasurementComparison {
    /// Compare the points found at `timestamp` on each side.
    pub fn new(
        timestamp: DateTime<Utc>,
        expected: Option<&Measurement>,
        actual: Option<&Measurement>,
        ctx: CompareContext<'_>,
    ) -> Self {
        let text_ctx = CompareContext::new().with_compare_type(Some(CompareType::String));
        let bool_ctx = CompareContext::new().with_compare_type(Some(CompareType::Bool));
        let flag = |m: &Measurement| m.is_good.to_string();

        Self {
            timestamp,
            timestamp_comparison: ValueComparison::compare(
                expected.map(|m| timestamp_text(&m.timestamp)).as_deref(),
                actual.map(|m| timestamp_text(&m.timestamp)).as_deref(),
                text_ctx,
            ),
            value: ValueComparison::compare(
                expected.map(|m| m.value.as_str()),
                actual.map(|m| m.value.as_str()),
                ctx,
            ),
            is_good: ValueComparison::compare(
                expected.map(flag).as_deref(),
                actual.map(flag).as_deref(),
                bool_ctx,
            ),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.timestamp_comparison.is_ok() && self.value.is_ok() && self.is_good.is_ok()
    }

    /// The first failing part's outcome, else the value outcome.
    pub fn outcome(&self) -> CompareOutcome {
        [&self.timestamp_comparison, &self.value, &self.is_good]
            .into_iter()
            .find(|c| !c.is_ok())
            .unwrap_or(&self.value)
            .outcome()
    }

    pub fn outcome_message(&self) -> String {
        if !self.timestamp_comparison.is_ok() {
            return self.timestamp_comparison.value_message();
        }
        let mut parts = Vec::new();
        if !self.value.is_ok() {
            parts.push(format!("value {}", self.value.value_message()));
        }
        if !self.is_good.is_ok() {
            parts.push(format!("is_good {}", self.is_good.value_message()));
        }
        if parts.is_empty() {
            return self.value.value_message();
        }
        parts.join("; ")
    }
}

// ---------------------------------------------------------------------------
// Ordered results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementComparisonDictionary {
    entries: BTreeMap<DateTime<Utc>, MeasurementComparison>,
}

impl MeasurementComparisonDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a comparison; a timestamp already present is a duplicate from `side`.
    pub fn insert(&mut self, side: SeriesSide, comparison: MeasurementComparison) -> Result<(), CompareError> {
        if self.entries.contains_key(&comparison.timestamp) {
            return Err(CompareError::DuplicateKey {
                side,
                timestamp: timestamp_text(&comparison.timestamp),
            });
        }
        self.entries.insert(comparison.timestamp, comparison);
        Ok(())
    }

    pub fn get(&self, timestamp: &DateTime<Utc>) -> Option<&MeasurementComparison> {
        self.entries.get(timestamp)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeasurementComparison> {
        self.entries.values()
    }

    pub fn failures(&self) -> impl Iterator<Item = &MeasurementComparison> {
        self.iter().filter(|c| !c.is_ok())
    }

    /// Entries with `start <= timestamp <= end`; either bound may be open.
    /// An inverted range is empty.
    pub fn subset(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Self::default();
            }
        }
        let lower = start.map_or(Bound::Unbounded, Bound::Included);
        let upper = end.map_or(Bound::Unbounded, Bound::Included);
        Self {
            entries: self
                .entries
                .range((lower, upper))
                .map(|(ts, c)| (*ts, c.clone()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MeasurementComparisonDictionary {
    type Item = &'a MeasurementComparison;
    type IntoIter = std::collections::btree_map::Values<'a, DateTime<Utc>, MeasurementComparison>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SeriesRun {
    results: MeasurementComparisonDictionary,
    compare_type: Option<CompareType>,
    used_tolerance: Option<ResolvedTolerance>,
}

pub struct TimeSeriesComparison {
    expected: MeasurementSeries,
    actual: MeasurementSeries,
    tolerance: Option<Tolerance>,
    compare_type: Option<CompareType>,
    run: Evaluation<SeriesRun>,
}

impl TimeSeriesComparison {
    pub fn new(expected: MeasurementSeries, actual: MeasurementSeries, tolerance: Option<Tolerance>) -> Self {
        Self {
            expected,
            actual,
            tolerance,
            compare_type: None,
            run: Evaluation::Unevaluated,
        }
    }

    /// Build both series from raw measurements, rejecting duplicate timestamps.
    pub fn from_measurements(
        expected: Vec<Measurement>,
        actual: Vec<Measurement>,
        tolerance: Option<Tolerance>,
    ) -> Result<Self, CompareError> {
        Ok(Self::new(
            MeasurementSeries::from_measurements(SeriesSide::Expected, expected)?,
            MeasurementSeries::from_measurements(SeriesSide::Actual, actual)?,
            tolerance,
        ))
    }

    pub fn from_config(
        expected: MeasurementSeries,
        actual: MeasurementSeries,
        config: &ComparisonConfig,
    ) -> Result<Self, CompareError> {
        Ok(Self::new(expected, actual, Some(config.tolerance()?)).with_compare_type(config.compare_type()?))
    }

    /// Compare values as this type instead of inferring it from both series.
    pub fn with_compare_type(mut self, compare_type: Option<CompareType>) -> Self {
        self.compare_type = compare_type;
        self.run.invalidate();
        self
    }

    pub fn expected(&self) -> &MeasurementSeries {
        &self.expected
    }

    pub fn actual(&self) -> &MeasurementSeries {
        &self.actual
    }

    fn evaluate(&mut self) -> Result<&SeriesRun, CompareError> {
        let Self {
            expected,
            actual,
            tolerance,
            compare_type,
            run,
        } = self;
        run.get_or_try_evaluate(|| compare_series(expected, actual, tolerance.as_ref(), *compare_type))
    }

    /// Every timestamp from either series, passing ones included.
    pub fn query(&mut self) -> Result<&MeasurementComparisonDictionary, CompareError> {
        Ok(&self.evaluate()?.results)
    }

    pub fn failure_count(&mut self) -> Result<usize, CompareError> {
        Ok(self.evaluate()?.results.failures().count())
    }

    pub fn point_count(&mut self) -> Result<usize, CompareError> {
        Ok(self.evaluate()?.results.len())
    }

    /// Tolerance as resolved against the expected series range for the run.
    pub fn used_tolerance(&mut self) -> Result<Option<ResolvedTolerance>, CompareError> {
        Ok(self.evaluate()?.used_tolerance)
    }

    /// Compare type shared by every value comparison of the run.
    pub fn used_compare_type(&mut self) -> Result<Option<CompareType>, CompareError> {
        Ok(self.evaluate()?.compare_type)
    }

    pub fn subset(
        &mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<MeasurementComparisonDictionary, CompareError> {
        Ok(self.query()?.subset(start, end))
    }

    pub fn summary(&mut self) -> Result<ComparisonSummary, CompareError> {
        let results = self.query()?;
        Ok(compute_summary(
            results.len(),
            results.failures().map(MeasurementComparison::outcome),
        ))
    }

    pub fn do_table(&mut self, columns: Option<&[&str]>) -> Result<RenderedTable, CompareError> {
        let results = self.query()?;
        measurement_renderer().render(results, columns)
    }

    pub fn invalidate(&mut self) {
        if self.run.is_evaluated() {
            log::debug!("time series comparison invalidated");
        }
        self.run.invalidate();
    }

    /// Drop the cached results and compare again.
    pub fn run_comparison(&mut self) -> Result<&MeasurementComparisonDictionary, CompareError> {
        self.invalidate();
        self.query()
    }

    pub fn reload(&mut self, expected: MeasurementSeries, actual: MeasurementSeries) {
        self.expected = expected;
        self.actual = actual;
        self.invalidate();
    }
}

fn compare_series(
    expected: &MeasurementSeries,
    actual: &MeasurementSeries,
    tolerance: Option<&Tolerance>,
    compare_type: Option<CompareType>,
) -> Result<SeriesRun, CompareError> {
    let compare_type = compare_type.or_else(|| match (expected.value_type(), actual.value_type()) {
        (Some(e), Some(a)) => Some(promote(Some(e), a)),
        (e, a) => e.or(a),
    });
    let data_range = expected.numeric_range();
    let used_tolerance = tolerance.map(|t| t.resolve(data_range));
    let ctx = CompareContext::new()
        .with_tolerance(tolerance)
        .with_data_range(data_range)
        .with_fixed_range()
        .with_compare_type(compare_type);

    let mut results = MeasurementComparisonDictionary::new();
    let mut consumed = HashSet::new();

    for e in expected.iter() {
        let a = actual.get(&e.timestamp);
        if a.is_some() {
            consumed.insert(e.timestamp);
        }
        let comparison = MeasurementComparison::new(e.timestamp, Some(e), a, ctx);
        if !comparison.is_ok() {
            log::trace!("{}: {}", timestamp_text(&e.timestamp), comparison.outcome_message());
        }
        results.insert(SeriesSide::Expected, comparison)?;
    }

    for a in actual.iter().filter(|a| !consumed.contains(&a.timestamp)) {
        let comparison = MeasurementComparison::new(a.timestamp, None, Some(a), ctx);
        log::trace!("{}: {}", timestamp_text(&a.timestamp), comparison.outcome_message());
        results.insert(SeriesSide::Actual, comparison)?;
    }

    log::debug!(
        "time series comparison: {} points, {} failures, type {:?}, data range {:?}",
        results.len(),
        results.failures().count(),
        compare_type,
        data_range
    );

    Ok(SeriesRun {
        results,
        compare_type,
        used_tolerance,
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn overall_status(c: &MeasurementComparison) -> ReportStatus {
    if c.is_ok() {
        ReportStatus::Pass
    } else {
        ReportStatus::Fail
    }
}

pub fn measurement_renderer() -> TableRenderer<MeasurementComparison> {
    let mut columns: Vec<(&'static str, CellFn<MeasurementComparison>)> = Vec::new();
    columns.push(("Timestamp", |c| ReportCell::new(c.timestamp_comparison.status(), timestamp_text(&c.timestamp))));
    columns.push(("Expected Value", |c| ReportCell::report(c.value.expected_out())));
    columns.push(("Actual Value", |c| ReportCell::new(c.value.status(), c.value.actual_out())));
    columns.push(("Delta", |c| ReportCell::report(c.value.delta_out())));
    columns.push(("Delta %", |c| ReportCell::report(c.value.delta_percentage_message())));
    columns.push(("Expected Good", |c| ReportCell::report(c.is_good.expected_out())));
    columns.push(("Actual Good", |c| ReportCell::new(c.is_good.status(), c.is_good.actual_out())));
    columns.push(("Outcome", |c| ReportCell::new(overall_status(c), c.outcome().as_str())));
    columns.push(("Message", |c| ReportCell::new(overall_status(c), c.outcome_message())));
    TableRenderer::new(columns)
}
