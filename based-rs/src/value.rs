//! Runtime value type for based programs.
//!
//! Every stored name holds exactly one [`Variable`]: either a single 64-bit
//! integer or an ordered array of them.  Shape is checked on every access;
//! nothing is ever coerced between the two.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A based runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    Scalar(i64),
    Array(Vec<i64>),
}

/// The shape of a [`Variable`], used in diagnostics and typed output checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Array,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => f.write_str("integer"),
            Shape::Array => f.write_str("array"),
        }
    }
}

impl fmt::Display for Variable {
    /// Scalars print as the bare number, arrays as space-separated values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Scalar(n) => write!(f, "{n}"),
            Variable::Array(items) => {
                for (i, n) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{n}")?;
                }
                Ok(())
            }
        }
    }
}

impl Variable {
    pub fn shape(&self) -> Shape {
        match self {
            Variable::Scalar(_) => Shape::Scalar,
            Variable::Array(_) => Shape::Array,
        }
    }

    /// The scalar value, or `None` for arrays.
    pub fn as_scalar(&self) -> Option<i64> {
        match self {
            Variable::Scalar(n) => Some(*n),
            Variable::Array(_) => None,
        }
    }

    /// The array elements, or `None` for scalars.
    pub fn as_array(&self) -> Option<&[i64]> {
        match self {
            Variable::Scalar(_) => None,
            Variable::Array(items) => Some(items),
        }
    }
}

impl From<i64> for Variable {
    fn from(n: i64) -> Self {
        Variable::Scalar(n)
    }
}

impl From<Vec<i64>> for Variable {
    fn from(items: Vec<i64>) -> Self {
        Variable::Array(items)
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Error returned when a command-line input value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid input value '{text}': expected an integer or [a,b,...]")]
pub struct ParseVariableError {
    text: String,
}

impl FromStr for Variable {
    type Err = ParseVariableError;

    /// Parse `42`, `-7`, `[1,-1,2]` or `[]`.  Whitespace around elements is
    /// ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVariableError { text: s.to_owned() };
        let trimmed = s.trim();
        if let Some(body) = trimmed.strip_prefix('[') {
            let body = body.strip_suffix(']').ok_or_else(err)?;
            if body.trim().is_empty() {
                return Ok(Variable::Array(Vec::new()));
            }
            body.split(',')
                .map(|item| item.trim().parse::<i64>().map_err(|_| err()))
                .collect::<Result<Vec<_>, _>>()
                .map(Variable::Array)
        } else {
            trimmed.parse().map(Variable::Scalar).map_err(|_| err())
        }
    }
}

// ── Typed extraction ──────────────────────────────────────────────────────────

/// Conversion used by [`Program::fetch_output`](crate::program::Program::fetch_output)
/// to check a produced value against the shape the caller expects.
pub trait FromVariable: Sized {
    /// The shape this type accepts.
    const SHAPE: Shape;

    /// Extract `Self`, or `None` if `var` has another shape.
    fn from_variable(var: &Variable) -> Option<Self>;
}

impl FromVariable for i64 {
    const SHAPE: Shape = Shape::Scalar;

    fn from_variable(var: &Variable) -> Option<Self> {
        var.as_scalar()
    }
}

impl FromVariable for Vec<i64> {
    const SHAPE: Shape = Shape::Array;

    fn from_variable(var: &Variable) -> Option<Self> {
        var.as_array().map(<[i64]>::to_vec)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
