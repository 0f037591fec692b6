// src/value.rs

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical text form for timestamps everywhere in an export.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell value as read from the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

/// One record keyed by column name. Iteration order is lexical by column name.
pub type RawRow = BTreeMap<String, Scalar>;

/// A normalized record; same shape as [`RawRow`], different contents.
pub type NormalizedRow = BTreeMap<String, Scalar>;

/// A value that survived numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl From<Number> for Scalar {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Scalar::Int(i),
            Number::Float(f) => Scalar::Float(f),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl Scalar {
    pub fn empty() -> Self {
        Scalar::Text(String::new())
    }

    /// Coerce to a number. `None` marks the value as "not numeric".
    ///
    /// Strings are parsed as base-10 floats; non-finite results (`NaN`, `inf`)
    /// are rejected since a spreadsheet cannot hold them as numbers.
    pub fn to_number(&self) -> Option<Number> {
        match self {
            Scalar::Int(i) => Some(Number::Int(*i)),
            Scalar::Float(f) if f.is_finite() => Some(Number::Float(*f)),
            Scalar::Text(s) if !s.is_empty() => s
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Number::Float),
            _ => None,
        }
    }

    /// Boolean true, the text `true` (any case) or `1`, or the number 1.
    pub fn is_trueish(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Text(s) => s.eq_ignore_ascii_case("true") || s == "1",
            Scalar::Int(i) => *i == 1,
            Scalar::Float(f) => *f == 1.0,
            Scalar::Null | Scalar::Timestamp(_) => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}
