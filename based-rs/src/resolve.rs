//! Operand resolution.
//!
//! Operands stay raw strings after decoding; each step interprets them in one
//! of two modes:
//!
//! - **value** ([`Resolver::value`]): an integer literal, a scalar
//!   identifier, or an array element `name[index]`.
//! - **reference** ([`Resolver::reference`]): a writable scalar slot, either
//!   a scalar identifier (optionally auto-created as `0`) or an array
//!   element.  Arrays themselves are never auto-created.
//!
//! An array index is itself a literal or a scalar identifier; nested element
//! access (`a[b[0]]`) is rejected.

use std::collections::hash_map::Entry;

use crate::fault::{compress, Fault, DISPLAY_LIMIT, IDENT_DISPLAY_LIMIT};
use crate::value::Variable;
use crate::var::VarStore;

/// Longest accepted run of digits in an integer literal.
pub const MAX_LITERAL_DIGITS: usize = 20;

/// What a reference-mode lookup does when the scalar does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    /// Create it with the value `0` (assignment).
    Create,
    /// Fault (add, sub).
    Fault,
}

// ── Lexical checks ────────────────────────────────────────────────────────────

/// Check that `ident` is a valid identifier: non-empty, ASCII letters, digits
/// and `_` only, not starting with a digit.
pub fn validate_identifier(ident: &str, pc: i64) -> Result<(), Fault> {
    if is_identifier(ident) {
        return Ok(());
    }
    let Some(first) = ident.chars().next() else {
        return Err(Fault::runtime(pc, "expected identifier, found empty string"));
    };
    if !ident.chars().all(is_identifier_char) {
        return Err(Fault::runtime(
            pc,
            format!(
                "invalid identifier '{}', only letters, numbers, and '_' are allowed",
                compress(ident, IDENT_DISPLAY_LIMIT)
            ),
        ));
    }
    if first.is_ascii_digit() {
        return Err(Fault::runtime(
            pc,
            format!(
                "invalid identifier '{}', cannot begin with a number",
                compress(ident, DISPLAY_LIMIT)
            ),
        ));
    }
    Ok(())
}

fn is_identifier_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Same rule as [`validate_identifier`], without building a fault.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if is_identifier_char(c) && !c.is_ascii_digit())
        && chars.all(is_identifier_char)
}

/// `name[index]` shape: contains `[` and ends with `]`.
fn is_array_entry(text: &str) -> bool {
    text.contains('[') && text.ends_with(']')
}

/// Split `name[index]` at the first `[` and the final `]`.
fn split_array_entry(text: &str) -> Option<(&str, &str)> {
    let (name, rest) = text.split_once('[')?;
    Some((name, rest.strip_suffix(']')?))
}

/// Parse an integer literal: optional `-`, then 1 to 20 ASCII digits.
///
/// Digits are accumulated in a wrapping `u64` and reinterpreted as `i64`, so
/// out-of-range literals wrap exactly like native 64-bit arithmetic.
pub fn parse_integer_literal(text: &str, pc: i64) -> Result<i64, Fault> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut acc: u64 = 0;
    for c in digits.chars() {
        let Some(d) = c.to_digit(10) else {
            return Err(Fault::runtime(
                pc,
                format!("failed to parse integer '{}'", compress(digits, DISPLAY_LIMIT)),
            ));
        };
        acc = acc.wrapping_mul(10).wrapping_add(u64::from(d));
    }
    if digits.len() > MAX_LITERAL_DIGITS {
        return Err(Fault::runtime(
            pc,
            format!("integer literal '{}' is too long", compress(digits, DISPLAY_LIMIT)),
        ));
    }
    if digits.is_empty() {
        return Err(Fault::runtime(pc, "empty integer literal"));
    }
    let value = acc as i64;
    Ok(if negative { value.wrapping_neg() } else { value })
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Interprets operands against a variable store on behalf of the instruction
/// at `pc`.  Every fault it raises names that instruction's line.
pub struct Resolver<'a> {
    vars: &'a mut VarStore,
    pc: i64,
}

impl<'a> Resolver<'a> {
    pub fn new(vars: &'a mut VarStore, pc: i64) -> Self {
        Resolver { vars, pc }
    }

    fn fault(&self, message: String) -> Fault {
        Fault::runtime(self.pc, message)
    }

    /// Resolve `operand` to an integer value.
    pub fn value(&self, operand: &str) -> Result<i64, Fault> {
        if is_identifier(operand) {
            return self.scalar(operand);
        }
        if is_array_entry(operand) {
            let (name, index) = self.locate(operand)?;
            return match self.vars.get(name) {
                Some(Variable::Array(items)) => {
                    items.get(index).copied().ok_or_else(|| no_such_array(self.pc, name))
                }
                _ => Err(no_such_array(self.pc, name)),
            };
        }
        parse_integer_literal(operand, self.pc)
    }

    /// Resolve `operand` to a writable integer slot.
    pub fn reference(&mut self, operand: &str, on_missing: OnMissing) -> Result<&mut i64, Fault> {
        if is_identifier(operand) {
            return self.scalar_mut(operand, on_missing);
        }
        if is_array_entry(operand) {
            let (name, index) = self.locate(operand)?;
            let pc = self.pc;
            return match self.vars.get_mut(name) {
                Some(Variable::Array(items)) => {
                    items.get_mut(index).ok_or_else(|| no_such_array(pc, name))
                }
                _ => Err(no_such_array(pc, name)),
            };
        }
        Err(self.fault(format!(
            "cannot parse '{}' as an &mut integer",
            compress(operand, DISPLAY_LIMIT)
        )))
    }

    // ── Scalars ───────────────────────────────────────────────────────────────

    fn scalar(&self, name: &str) -> Result<i64, Fault> {
        match self.vars.get(name) {
            Some(Variable::Scalar(n)) => Ok(*n),
            Some(Variable::Array(_)) => Err(not_an_integer(self.pc, name)),
            None => Err(self.fault(format!(
                "no such integer: '{}'",
                compress(name, DISPLAY_LIMIT)
            ))),
        }
    }

    fn scalar_mut(&mut self, name: &str, on_missing: OnMissing) -> Result<&mut i64, Fault> {
        let pc = self.pc;
        if on_missing == OnMissing::Fault && !self.vars.contains(name) {
            return Err(self.fault(format!(
                "no such integer: '{}'",
                compress(name, DISPLAY_LIMIT)
            )));
        }
        let slot = match self.vars.entry(name) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Variable::Scalar(0)),
        };
        match slot {
            Variable::Scalar(n) => Ok(n),
            Variable::Array(_) => Err(not_an_integer(pc, name)),
        }
    }

    // ── Array elements ────────────────────────────────────────────────────────

    /// Validate `name[index]` and return the array name and a bounds-checked
    /// element index.  Checks run in order: identifier, existence, shape,
    /// index operand, bounds.
    fn locate<'t>(&self, text: &'t str) -> Result<(&'t str, usize), Fault> {
        let Some((name, index)) = split_array_entry(text) else {
            return Err(self.fault(format!(
                "cannot parse '{}' as an array entry",
                compress(text, DISPLAY_LIMIT)
            )));
        };
        validate_identifier(name, self.pc)?;
        let len = match self.vars.get(name) {
            Some(Variable::Array(items)) => items.len(),
            Some(Variable::Scalar(_)) => {
                return Err(self.fault(format!(
                    "'{}' is not an array",
                    compress(name, DISPLAY_LIMIT)
                )))
            }
            None => return Err(no_such_array(self.pc, name)),
        };
        let Some(value) = self.index_value(index)? else {
            return Err(self.fault(format!(
                "invalid index: '{}'",
                compress(index, DISPLAY_LIMIT)
            )));
        };
        match usize::try_from(value) {
            Ok(i) if i < len => Ok((name, i)),
            _ => Err(self.fault(format!(
                "index {}[{}] out of bounds",
                compress(name, DISPLAY_LIMIT),
                value
            ))),
        }
    }

    /// An index operand is a literal or an existing scalar; anything else
    /// yields `None`.
    fn index_value(&self, index: &str) -> Result<Option<i64>, Fault> {
        if index.is_empty() {
            return Err(self.fault("expected number, found empty string".to_owned()));
        }
        if is_identifier(index) {
            return Ok(self.scalar(index).ok());
        }
        Ok(parse_integer_literal(index, self.pc).ok())
    }
}

fn not_an_integer(pc: i64, name: &str) -> Fault {
    Fault::runtime(
        pc,
        format!("variable '{}' is not an integer", compress(name, DISPLAY_LIMIT)),
    )
}

fn no_such_array(pc: i64, name: &str) -> Fault {
    Fault::runtime(pc, format!("no such array: '{}'", compress(name, DISPLAY_LIMIT)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
