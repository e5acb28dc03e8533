//! Tolerance specifications.
//!
//! A tolerance string is a `;`-separated list of clauses. Each clause is an
//! absolute magnitude (`0.5`), a relative one (`2%`) or `epsilon`, optionally
//! followed by `:N` to request rounding to `N` significant digits.
//!
//! Relative clauses scale against a data range. The range is passed to
//! [`Tolerance::resolve`] rather than stored on the tolerance, so one parsed
//! tolerance can be shared by any number of comparisons.

use std::fmt;

use serde::Serialize;

use crate::error::CompareError;

/// One parsed clause of a tolerance string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToleranceSpec {
    pub is_absolute: bool,
    /// Always non-negative. Relative clauses store the fraction (`1%` → 0.01).
    pub magnitude: f64,
    pub significant_digits: Option<u32>,
}

impl ToleranceSpec {
    pub fn absolute(magnitude: f64) -> Self {
        Self {
            is_absolute: true,
            magnitude: magnitude.abs(),
            significant_digits: None,
        }
    }

    pub fn relative(fraction: f64) -> Self {
        Self {
            is_absolute: false,
            magnitude: fraction.abs(),
            significant_digits: None,
        }
    }

    pub fn with_significant_digits(mut self, digits: Option<u32>) -> Self {
        self.significant_digits = digits;
        self
    }

    /// Parse a single clause, e.g. `"0.5"`, `"2%:3"`, `"epsilon"`.
    pub fn parse(clause: &str) -> Result<Self, CompareError> {
        let clause = clause.trim();
        let (body, digits) = match clause.rsplit_once(':') {
            Some((body, digits)) => {
                let digits = digits.trim().parse::<u32>().map_err(|_| CompareError::Format {
                    value: clause.to_string(),
                    target: "significant digits".to_string(),
                })?;
                (body.trim(), Some(digits))
            }
            None => (clause, None),
        };

        let spec = if body.is_empty() {
            Self::absolute(0.0)
        } else if body.eq_ignore_ascii_case("epsilon") {
            Self::absolute(f64::from_bits(1))
        } else if let Some(prefix) = body.strip_suffix('%') {
            Self::relative(parse_magnitude(prefix, clause)? / 100.0)
        } else {
            Self::absolute(parse_magnitude(body, clause)?)
        };

        // An empty clause never rounds.
        if body.is_empty() {
            return Ok(spec);
        }
        Ok(spec.with_significant_digits(digits))
    }

    /// The magnitude this clause contributes for a given data range.
    pub fn applied_value(&self, data_range: Option<f64>) -> f64 {
        if self.is_absolute {
            self.magnitude
        } else {
            data_range.unwrap_or(0.0).abs() * self.magnitude
        }
    }

    /// Decimal precision implied by the significant-digit count at `applied`.
    pub fn precision(&self, applied: f64) -> Option<u32> {
        let digits = self.significant_digits?;
        if applied.abs() <= f64::EPSILON || !applied.is_finite() {
            return None;
        }
        let leading = (-applied.abs().log10()).ceil() as i64;
        Some((leading + i64::from(digits) - 1).max(0) as u32)
    }
}

fn parse_magnitude(text: &str, clause: &str) -> Result<f64, CompareError> {
    let text = text.trim();
    crate::value_type::parse_double(text)
        .filter(|v| !v.is_nan())
        .map(f64::abs)
        .ok_or_else(|| CompareError::Format {
            value: clause.to_string(),
            target: "tolerance".to_string(),
        })
}

/// Effective tolerance for one data range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedTolerance {
    /// Largest applied magnitude across all clauses.
    pub value: f64,
    /// Precision of the clause that produced `value`.
    pub precision: Option<u32>,
    /// The data range the relative clauses were scaled against.
    pub data_range: Option<f64>,
}

impl ResolvedTolerance {
    pub fn zero() -> Self {
        Self {
            value: 0.0,
            precision: None,
            data_range: None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }
}

/// A parsed tolerance string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tolerance {
    text: String,
    specs: Vec<ToleranceSpec>,
}

impl Tolerance {
    pub fn parse(spec: &str) -> Result<Self, CompareError> {
        let specs = spec
            .split(';')
            .map(ToleranceSpec::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            text: spec.trim().to_string(),
            specs,
        })
    }

    pub fn from_specs(specs: Vec<ToleranceSpec>) -> Self {
        let text = specs
            .iter()
            .map(|s| {
                let base = if s.is_absolute {
                    crate::numeric::format_double(s.magnitude)
                } else {
                    format!("{}%", crate::numeric::format_double(s.magnitude * 100.0))
                };
                match s.significant_digits {
                    Some(d) => format!("{base}:{d}"),
                    None => base,
                }
            })
            .collect::<Vec<_>>()
            .join(";");
        Self { text, specs }
    }

    pub fn specs(&self) -> &[ToleranceSpec] {
        &self.specs
    }

    pub fn has_relative_clause(&self) -> bool {
        self.specs.iter().any(|s| !s.is_absolute)
    }

    /// Resolve against a data range. The first clause reaching the maximum
    /// supplies the precision.
    pub fn resolve(&self, data_range: Option<f64>) -> ResolvedTolerance {
        let mut resolved = ResolvedTolerance {
            data_range,
            ..ResolvedTolerance::zero()
        };
        let mut seen_any = false;

        for spec in &self.specs {
            let applied = spec.applied_value(data_range);
            if !seen_any || applied > resolved.value {
                resolved.value = applied;
                resolved.precision = spec.precision(applied);
                seen_any = true;
            }
        }

        if data_range.is_none() && self.has_relative_clause() {
            log::trace!("tolerance '{}' resolved without a data range", self.text);
        }
        resolved
    }

    pub fn value(&self, data_range: Option<f64>) -> f64 {
        self.resolve(data_range).value
    }

    pub fn precision(&self, data_range: Option<f64>) -> Option<u32> {
        self.resolve(data_range).precision
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            text: String::new(),
            specs: vec![ToleranceSpec::absolute(0.0)],
        }
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
