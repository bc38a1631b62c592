//! Fault model.
//!
//! A run fails with exactly one [`Fault`]:
//!
//! | Kind | Raised by |
//! |------|-----------|
//! | [`Fault::Decode`] | [`Program::new`](crate::program::Program::new), for a line matching no grammar |
//! | [`Fault::Runtime`] | a single step (bad operand, missing variable, empty input, …) |
//! | [`Fault::Budget`] | the run loop, when accumulated cost reaches the budget |
//! | [`Fault::Shape`], [`Fault::NoOutput`] | the typed output API |
//!
//! Line numbers are 1-based.  Runtime and budget faults are raised with the
//! 0-based program counter and report `pc + 1`.

use thiserror::Error;

use crate::value::Shape;

/// Default display length for operand text quoted in diagnostics.
pub const DISPLAY_LIMIT: usize = 32;
/// Display length for the offending line of a decode fault.
pub const DECODE_DISPLAY_LIMIT: usize = 60;
/// Display length for a rejected identifier.
pub const IDENT_DISPLAY_LIMIT: usize = 20;

/// Coarse classification of a [`Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Decode,
    Runtime,
    Budget,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("line {line}: '{text}'? unrecognised instruction")]
    Decode { line: i64, text: String },

    #[error("line {line}: {message}")]
    Runtime { line: i64, message: String },

    #[error("line {line}: execution budget exhausted")]
    Budget { line: i64 },

    #[error("expected {expected} output, found {found}")]
    Shape { expected: Shape, found: Shape },

    #[error("no output available")]
    NoOutput,
}

impl Fault {
    /// Decode fault for the line at 0-based `index`.
    pub fn decode(index: usize, text: &str) -> Self {
        Fault::Decode {
            line: i64::try_from(index).map_or(i64::MAX, |i| i.saturating_add(1)),
            text: compress(text, DECODE_DISPLAY_LIMIT),
        }
    }

    /// Runtime fault raised while executing the instruction at `pc`.
    pub fn runtime(pc: i64, message: impl Into<String>) -> Self {
        Fault::Runtime { line: pc.wrapping_add(1), message: message.into() }
    }

    /// Budget fault with the program counter at `pc`.
    pub fn budget(pc: i64) -> Self {
        Fault::Budget { line: pc.wrapping_add(1) }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Decode { .. } => FaultKind::Decode,
            Fault::Runtime { .. } => FaultKind::Runtime,
            Fault::Budget { .. } => FaultKind::Budget,
            Fault::Shape { .. } | Fault::NoOutput => FaultKind::Output,
        }
    }

    /// The 1-based line the fault refers to, if any.
    pub fn line(&self) -> Option<i64> {
        match self {
            Fault::Decode { line, .. } | Fault::Runtime { line, .. } | Fault::Budget { line } => {
                Some(*line)
            }
            Fault::Shape { .. } | Fault::NoOutput => None,
        }
    }
}

/// Truncate `s` to at most `max_len` characters, marking the cut with `...`.
pub fn compress(s: &str, max_len: usize) -> String {
    let max_len = max_len.max(3);
    if s.chars().count() <= max_len {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max_len - 3).collect();
    out.push_str("...");
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
