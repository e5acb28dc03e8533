//! Comparison of a single expected/actual pair.
//!
//! [`ValueComparison::compare`] classifies one pair into a [`CompareOutcome`]
//! and fills in the display strings a report needs. The comparison runs once,
//! in the constructor; the result is immutable afterwards.

use std::fmt;

use serde::Serialize;

use crate::numeric::{delta_within, format_double, format_rounded, fraction_digits, round_to};
use crate::render::ReportStatus;
use crate::tolerance::{ResolvedTolerance, Tolerance};
use crate::value_type::{infer_compatible_type, parse_double, CompareType, TypedValue};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOutcome {
    /// Values are identical.
    Exact,
    WithinTolerance,
    OutsideToleranceIssue,
    /// Type/format mismatch, or a difference with no tolerance band to apply.
    ValueIssue,
    /// Expected present, actual absent.
    Missing,
    /// Actual present, expected absent.
    Surplus,
}

impl CompareOutcome {
    pub const ALL: [CompareOutcome; 6] = [
        Self::Exact,
        Self::WithinTolerance,
        Self::OutsideToleranceIssue,
        Self::ValueIssue,
        Self::Missing,
        Self::Surplus,
    ];

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Exact | Self::WithinTolerance)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::WithinTolerance => "within_tolerance",
            Self::OutsideToleranceIssue => "outside_tolerance",
            Self::ValueIssue => "value_issue",
            Self::Missing => "missing",
            Self::Surplus => "surplus",
        }
    }
}

impl fmt::Display for CompareOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything a comparison needs besides the two values.
///
/// `data_range` is the base relative tolerance clauses scale against. When it
/// is `None` and the comparison is numeric, the expected value is used, unless
/// `fixed_range` is set: then `None` stays `None` for every value of the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareContext<'a> {
    pub tolerance: Option<&'a Tolerance>,
    pub data_range: Option<f64>,
    pub fixed_range: bool,
    pub compare_type: Option<CompareType>,
}

impl<'a> CompareContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: Option<&'a Tolerance>) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_data_range(mut self, data_range: Option<f64>) -> Self {
        self.data_range = data_range;
        self
    }

    /// Use `data_range` as given, without seeding from the expected value.
    pub fn with_fixed_range(mut self) -> Self {
        self.fixed_range = true;
        self
    }

    pub fn with_compare_type(mut self, compare_type: Option<CompareType>) -> Self {
        self.compare_type = compare_type;
        self
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueComparison {
    expected: Option<String>,
    actual: Option<String>,
    compare_type: Option<CompareType>,
    tolerance: Option<ResolvedTolerance>,
    expected_out: String,
    actual_out: String,
    delta_out: String,
    delta_percentage: Option<f64>,
    outcome: CompareOutcome,
}

impl ValueComparison {
    /// Compare without tolerance or type hints.
    pub fn new(expected: Option<&str>, actual: Option<&str>) -> Self {
        Self::compare(expected, actual, CompareContext::default())
    }

    pub fn compare(expected: Option<&str>, actual: Option<&str>, ctx: CompareContext<'_>) -> Self {
        let tolerance = ctx.tolerance.map(|t| t.resolve(ctx.data_range));
        let mut comparison = Self {
            expected: expected.map(str::to_string),
            actual: actual.map(str::to_string),
            compare_type: ctx.compare_type,
            tolerance,
            expected_out: display_value(expected, ctx.compare_type, tolerance.as_ref()),
            actual_out: display_value(actual, ctx.compare_type, tolerance.as_ref()),
            delta_out: String::new(),
            delta_percentage: None,
            outcome: CompareOutcome::Exact,
        };
        comparison.outcome = comparison.run(ctx);
        comparison
    }

    fn run(&mut self, ctx: CompareContext<'_>) -> CompareOutcome {
        let (expected, actual) = match (self.expected.clone(), self.actual.clone()) {
            (None, None) => return CompareOutcome::Exact,
            (None, Some(_)) => return CompareOutcome::Surplus,
            (Some(_), None) => return CompareOutcome::Missing,
            (Some(e), Some(a)) => (e, a),
        };

        if expected == actual {
            return CompareOutcome::Exact;
        }

        let compare_type = match self.compare_type {
            Some(t) => t,
            None => {
                let inferred = infer_compatible_type([expected.as_str(), actual.as_str()])
                    .unwrap_or(CompareType::String);
                self.compare_type = Some(inferred);
                inferred
            }
        };

        let (Ok(expected_value), Ok(actual_value)) =
            (compare_type.convert(&expected), compare_type.convert(&actual))
        else {
            return CompareOutcome::ValueIssue;
        };

        if compare_type.is_numeric() {
            if let Some(tolerance) = ctx.tolerance {
                let data_range = if ctx.fixed_range {
                    ctx.data_range
                } else {
                    ctx.data_range
                        .or_else(|| expected_value.as_f64().filter(|v| v.is_finite()))
                };
                self.tolerance = Some(tolerance.resolve(data_range));
            }
            self.expected_out = display_value(Some(&expected), Some(compare_type), self.tolerance.as_ref());
            self.actual_out = display_value(Some(&actual), Some(compare_type), self.tolerance.as_ref());
        }

        if self.expected_out == self.actual_out {
            // Different spellings of the same value, e.g. "∞" and "Infinity",
            // or a difference that vanished in rounding.
            return if self.actual_out.contains("Infinity") {
                CompareOutcome::Exact
            } else {
                CompareOutcome::WithinTolerance
            };
        }

        let resolved = match self.tolerance {
            Some(t) if compare_type.is_numeric() && !t.is_zero() => t,
            _ => return CompareOutcome::ValueIssue,
        };

        if compare_type.is_floating_point() {
            self.compare_floating(&expected, &actual, &expected_value, &actual_value, resolved)
        } else {
            self.compare_integral(&expected_value, &actual_value, resolved)
        }
    }

    fn compare_floating(
        &mut self,
        expected_text: &str,
        actual_text: &str,
        expected: &TypedValue,
        actual: &TypedValue,
        tolerance: ResolvedTolerance,
    ) -> CompareOutcome {
        let (Some(e), Some(a)) = (expected.as_f64(), actual.as_f64()) else {
            return CompareOutcome::ValueIssue;
        };
        let decimals = tolerance
            .precision
            .unwrap_or_else(|| fraction_digits(expected_text).max(fraction_digits(actual_text)));

        // Rounding is for display only; the verdict uses the exact delta.
        let delta = (e - a).abs();
        self.expected_out = format_double(round_to(e, decimals));
        self.actual_out = format_double(round_to(a, decimals));
        self.delta_out = format_double(round_to(delta, decimals));
        self.delta_percentage = percentage(delta, tolerance.data_range);

        if delta_within(delta, tolerance.value, e.abs().max(a.abs())) {
            CompareOutcome::WithinTolerance
        } else {
            CompareOutcome::OutsideToleranceIssue
        }
    }

    fn compare_integral(
        &mut self,
        expected: &TypedValue,
        actual: &TypedValue,
        tolerance: ResolvedTolerance,
    ) -> CompareOutcome {
        let (Some(e), Some(a)) = (expected.as_i64(), actual.as_i64()) else {
            return CompareOutcome::ValueIssue;
        };
        let delta = e.abs_diff(a);
        // `as` truncates toward zero and saturates.
        let allowed = tolerance.value as u64;

        self.expected_out = e.to_string();
        self.actual_out = a.to_string();
        self.delta_out = delta.to_string();
        self.delta_percentage = percentage(delta as f64, tolerance.data_range);

        if delta <= allowed {
            CompareOutcome::WithinTolerance
        } else {
            CompareOutcome::OutsideToleranceIssue
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn expected(&self) -> Option<&str> {
        self.expected.as_deref()
    }

    pub fn actual(&self) -> Option<&str> {
        self.actual.as_deref()
    }

    /// The type the values were compared as; `None` when the comparison was
    /// decided before a type was needed (absent values, identical text).
    pub fn compare_type(&self) -> Option<CompareType> {
        self.compare_type
    }

    pub fn tolerance(&self) -> Option<&ResolvedTolerance> {
        self.tolerance.as_ref()
    }

    pub fn outcome(&self) -> CompareOutcome {
        self.outcome
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn status(&self) -> ReportStatus {
        if self.is_ok() {
            ReportStatus::Pass
        } else {
            ReportStatus::Fail
        }
    }

    pub fn expected_out(&self) -> &str {
        &self.expected_out
    }

    pub fn actual_out(&self) -> &str {
        &self.actual_out
    }

    pub fn delta_out(&self) -> &str {
        &self.delta_out
    }

    pub fn delta_percentage(&self) -> Option<f64> {
        self.delta_percentage
    }

    pub fn delta_percentage_message(&self) -> String {
        match self.delta_percentage {
            Some(p) => format!("{}%", format_rounded(p, Some(2))),
            None => String::new(),
        }
    }

    pub fn value_message(&self) -> String {
        let expected = &self.expected_out;
        let actual = &self.actual_out;
        match self.outcome {
            CompareOutcome::Exact => expected.clone(),
            CompareOutcome::WithinTolerance => format!("{actual} ~= {expected}"),
            CompareOutcome::OutsideToleranceIssue => format!("{actual} != {expected}"),
            CompareOutcome::ValueIssue => format!("[{actual}] expected [{expected}]"),
            CompareOutcome::Missing => format!("[{expected}] missing"),
            CompareOutcome::Surplus => format!("[{actual}] surplus"),
        }
    }
}

/// Display text for one side: rounded to the tolerance precision when the
/// comparison is floating point and the text is a number, raw otherwise.
fn display_value(
    text: Option<&str>,
    compare_type: Option<CompareType>,
    tolerance: Option<&ResolvedTolerance>,
) -> String {
    let Some(text) = text else {
        return String::new();
    };
    match (tolerance, compare_type) {
        (Some(tolerance), Some(t)) if t.is_floating_point() => match parse_double(text) {
            Some(v) => format_rounded(v, tolerance.precision),
            None => text.to_string(),
        },
        _ => text.to_string(),
    }
}

fn percentage(delta: f64, base: Option<f64>) -> Option<f64> {
    let base = base?.abs();
    if base == 0.0 || !base.is_finite() {
        return None;
    }
    Some(delta / base * 100.0)
}
