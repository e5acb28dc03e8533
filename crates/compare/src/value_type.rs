//! Type inference over textual values.
//!
//! Every input reaching the comparators is text. Before two values can be
//! compared numerically they are classified into a [`CompareType`], and pairs
//! (or whole series) are folded through a promotion lattice to find a type
//! both sides convert to.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CompareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareType {
    Int,
    Long,
    Double,
    Bool,
    String,
}

impl CompareType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::String => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Double)
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self, Self::Double)
    }

    /// Convert text into this type. Fails with [`CompareError::Format`].
    pub fn convert(&self, text: &str) -> Result<TypedValue, CompareError> {
        let converted = match self {
            Self::Int => parse_int(text).map(TypedValue::Int),
            Self::Long => parse_long(text).map(TypedValue::Long),
            Self::Double => parse_double(text).map(TypedValue::Double),
            Self::Bool => parse_bool(text).map(TypedValue::Bool),
            Self::String => Some(TypedValue::String(text.to_string())),
        };
        converted.ok_or_else(|| CompareError::Format {
            value: text.to_string(),
            target: self.as_str().to_string(),
        })
    }

    /// Convert text into this type, falling back to `default` on failure.
    pub fn convert_or(&self, text: &str, default: TypedValue) -> TypedValue {
        self.convert(text).unwrap_or(default)
    }
}

impl fmt::Display for CompareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareType {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "int32" | "integer" => Ok(Self::Int),
            "long" | "int64" => Ok(Self::Long),
            "double" | "float" | "decimal" => Ok(Self::Double),
            "bool" | "boolean" => Ok(Self::Bool),
            "string" | "text" => Ok(Self::String),
            _ => Err(CompareError::TypeNotRecognized(s.to_string())),
        }
    }
}

/// A value converted into one of the [`CompareType`]s.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    String(String),
}

impl TypedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::Bool(_) | Self::String(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            Self::Double(_) | Self::Bool(_) | Self::String(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub fn parse_int(text: &str) -> Option<i32> {
    text.trim().parse().ok()
}

pub fn parse_long(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Parse a double: invariant grammar first, then the locale-style spellings
/// (infinity symbol, `Infinity`, comma decimal separator).
pub fn parse_double(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return Some(v);
    }
    parse_locale_double(trimmed)
}

fn parse_locale_double(trimmed: &str) -> Option<f64> {
    match trimmed {
        "∞" | "+∞" => return Some(f64::INFINITY),
        "-∞" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    // One comma and no dot: treat the comma as the decimal separator.
    if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
        return trimmed.replace(',', ".").parse().ok();
    }
    None
}

pub fn parse_bool(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

/// Classify one value. The order is significant: an integer-looking string is
/// never classified as a double.
pub fn infer_type(value: &str) -> CompareType {
    if parse_int(value).is_some() {
        CompareType::Int
    } else if parse_long(value).is_some() {
        CompareType::Long
    } else if parse_double(value).is_some() {
        CompareType::Double
    } else if parse_bool(value).is_some() {
        CompareType::Bool
    } else {
        CompareType::String
    }
}

/// Promotion lattice. `String` absorbs every pairing it is part of.
pub fn promote(current: Option<CompareType>, next: CompareType) -> CompareType {
    use CompareType::*;

    let Some(current) = current else {
        return next;
    };
    if current == next {
        return next;
    }
    match (current, next) {
        (Long, Int) | (Int, Long) => Long,
        (Double, Long) | (Long, Double) => Double,
        (Double, Int) | (Int, Double) => Double,
        _ => String,
    }
}

/// Infer `value` and promote it against the type seen so far.
pub fn infer_type_with(value: &str, current: Option<CompareType>) -> CompareType {
    promote(current, infer_type(value))
}

/// Fold the lattice over a whole sequence. `None` for an empty sequence.
pub fn infer_compatible_type<'a, I>(values: I) -> Option<CompareType>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut current = None;
    for value in values {
        let next = infer_type_with(value, current);
        current = Some(next);
        if next == CompareType::String {
            break;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_type_order() {
        assert_eq!(infer_type("42"), CompareType::Int);
        assert_eq!(infer_type("-7"), CompareType::Int);
        assert_eq!(infer_type("3000000000"), CompareType::Long);
        assert_eq!(infer_type("3.5"), CompareType::Double);
        assert_eq!(infer_type("1e3"), CompareType::Double);
        assert_eq!(infer_type("True"), CompareType::Bool);
        assert_eq!(infer_type("abc"), CompareType::String);
        assert_eq!(infer_type(""), CompareType::String);
    }

    #[test]
    fn infer_type_recognizes_locale_infinity() {
        assert_eq!(infer_type("∞"), CompareType::Double);
        assert_eq!(infer_type("-∞"), CompareType::Double);
        assert_eq!(infer_type("Infinity"), CompareType::Double);
        assert_eq!(infer_type("NaN"), CompareType::Double);
        assert_eq!(infer_type("1,5"), CompareType::Double);
    }

    #[test]
    fn thousands_style_commas_are_not_decimals() {
        assert_eq!(infer_type("1,000,000"), CompareType::String);
    }

    #[test]
    fn promote_lattice() {
        use CompareType::*;
        assert_eq!(promote(None, Bool), Bool);
        assert_eq!(promote(Some(Int), Int), Int);
        assert_eq!(promote(Some(Int), Long), Long);
        assert_eq!(promote(Some(Long), Int), Long);
        assert_eq!(promote(Some(Long), Double), Double);
        assert_eq!(promote(Some(Int), Double), Double);
        assert_eq!(promote(Some(Double), Bool), String);
        assert_eq!(promote(Some(Bool), Int), String);
        assert_eq!(promote(Some(String), Int), String);
    }

    #[test]
    fn compatible_type_over_sequence() {
        assert_eq!(
            infer_compatible_type(["1", "3000000000"]),
            Some(CompareType::Long)
        );
        assert_eq!(
            infer_compatible_type(["3000000000", "1"]),
            Some(CompareType::Long)
        );
        assert_eq!(
            infer_compatible_type(["1", "2.5", "3000000000"]),
            Some(CompareType::Double)
        );
        assert_eq!(
            infer_compatible_type(["1.5", "true"]),
            Some(CompareType::String)
        );
        assert_eq!(infer_compatible_type(Vec::<&str>::new()), None);
    }

    #[test]
    fn string_is_absorbing() {
        assert_eq!(
            infer_compatible_type(["1", "x", "2"]),
            Some(CompareType::String)
        );
    }

    #[test]
    fn convert_and_convert_or() {
        assert_eq!(CompareType::Int.convert("12"), Ok(TypedValue::Int(12)));
        assert_eq!(CompareType::Double.convert("∞"), Ok(TypedValue::Double(f64::INFINITY)));
        assert_eq!(CompareType::Bool.convert("FALSE"), Ok(TypedValue::Bool(false)));

        let err = CompareType::Int.convert("12.5").unwrap_err();
        assert_eq!(
            err,
            CompareError::Format {
                value: "12.5".into(),
                target: "int".into()
            }
        );

        assert_eq!(
            CompareType::Long.convert_or("n/a", TypedValue::Long(-1)),
            TypedValue::Long(-1)
        );
    }

    #[test]
    fn compare_type_from_str() {
        assert_eq!("Double".parse::<CompareType>(), Ok(CompareType::Double));
        assert_eq!("int64".parse::<CompareType>(), Ok(CompareType::Long));
        assert_eq!(" boolean ".parse::<CompareType>(), Ok(CompareType::Bool));
        assert_eq!(
            "datetime".parse::<CompareType>(),
            Err(CompareError::TypeNotRecognized("datetime".into()))
        );
    }

    #[test]
    fn typed_value_projections() {
        assert_eq!(TypedValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(TypedValue::Long(3).as_i64(), Some(3));
        assert_eq!(TypedValue::Double(3.5).as_i64(), None);
        assert_eq!(TypedValue::Bool(true).as_f64(), None);
    }
}
