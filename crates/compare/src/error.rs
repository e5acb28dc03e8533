use std::fmt;

use crate::measurement::SeriesSide;

#[derive(Debug, Clone, PartialEq)]
pub enum CompareError {
    /// Text could not be converted to the requested type.
    Format { value: String, target: String },
    /// Two measurements in one series share a timestamp.
    DuplicateKey { side: SeriesSide, timestamp: String },
    /// A requested display column does not exist.
    UnknownColumn { requested: String, valid: Vec<String> },
    /// A compare-type name is not one of the known types.
    TypeNotRecognized(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad tolerance, inverted time range, etc.).
    ConfigValidation(String),
    /// In-memory CSV could not be read.
    Csv(String),
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format { value, target } => {
                write!(f, "cannot convert '{value}' to {target}")
            }
            Self::DuplicateKey { side, timestamp } => {
                write!(f, "{} series: duplicate timestamp {timestamp}", side.as_str())
            }
            Self::UnknownColumn { requested, valid } => {
                write!(
                    f,
                    "unknown column '{requested}', valid columns are: {}",
                    valid.join(", ")
                )
            }
            Self::TypeNotRecognized(name) => write!(f, "type not recognized: {name}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
        }
    }
}

impl std::error::Error for CompareError {}
