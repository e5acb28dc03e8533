//! `tabcheck-compare`: tolerance-aware comparison engine.
//!
//! Pure engine crate: receives pre-loaded tables and measurement series,
//! returns classified comparison records and report tables.
//! No CLI or IO dependencies.

mod evaluation;

pub mod config;
pub mod error;
pub mod grid;
pub mod measurement;
pub mod numeric;
pub mod render;
pub mod summary;
pub mod tolerance;
pub mod value;
pub mod value_type;

pub use config::ComparisonConfig;
pub use error::CompareError;
pub use grid::{CellComparison, CsvComparison, CsvTable, ErrorDelta};
pub use measurement::{
    Measurement, MeasurementComparison, MeasurementComparisonDictionary, MeasurementSeries,
    SeriesSide, TimeSeriesComparison,
};
pub use render::{RenderedTable, ReportCell, ReportStatus, TableRenderer};
pub use summary::ComparisonSummary;
pub use tolerance::{ResolvedTolerance, Tolerance, ToleranceSpec};
pub use value::{CompareContext, CompareOutcome, ValueComparison};
pub use value_type::{CompareType, TypedValue};
