//! Instruction decoder.
//!
//! A based program is a sequence of lines.  Each line is split on whitespace
//! and matched, in order, against the fixed grammar below; the first shape
//! whose token count and keyword positions match wins.
//!
//! | Opcode | Tokens | Operands |
//! |--------|--------|----------|
//! | `Input` | `yoink <dest>` | dest |
//! | `Output` | `yeet <src>` | src |
//! | `Assign` | `bruh <dest> is lowkey just <src>` | dest, src |
//! | `Add` | `*slaps <amount> on top of <dest>*` | dest, amount |
//! | `Sub` | `rip this <dest> fell off by <amount>` | dest, amount |
//! | `Compare` | `vibe check <lhs> ratios <rhs>` | lhs, rhs |
//! | `Jump` | `simp for <line>` | line |
//! | `Return` | `go touch some grass` | none |
//!
//! A blank line is a `Nop`; anything else is `Undefined`.  Operands are kept
//! as raw strings and only interpreted when the instruction executes.

use std::fmt;

/// The decoded instruction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Input,
    Output,
    Assign,
    Add,
    Sub,
    Compare,
    Jump,
    Return,
    Undefined,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Nop => "nop",
            Opcode::Input => "input",
            Opcode::Output => "output",
            Opcode::Assign => "assign",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Compare => "compare",
            Opcode::Jump => "jump",
            Opcode::Return => "return",
            Opcode::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// One decoded source line: an opcode plus its raw operand strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    opcode: Opcode,
    operands: Vec<String>,
}

impl Instruction {
    /// Decode a single source line.  Never fails; unmatched lines decode to
    /// [`Opcode::Undefined`].
    pub fn decode(line: &str) -> Self {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (opcode, operands): (Opcode, Vec<&str>) = match tokens[..] {
            [] => (Opcode::Nop, vec![]),
            ["yoink", dest] => (Opcode::Input, vec![dest]),
            ["yeet", src] => (Opcode::Output, vec![src]),
            ["bruh", dest, "is", "lowkey", "just", src] => (Opcode::Assign, vec![dest, src]),
            ["*slaps", amount, "on", "top", "of", dest] if dest.len() >= 2 && dest.ends_with('*') => {
                (Opcode::Add, vec![&dest[..dest.len() - 1], amount])
            }
            ["rip", "this", dest, "fell", "off", "by", amount] => (Opcode::Sub, vec![dest, amount]),
            ["vibe", "check", lhs, "ratios", rhs] => (Opcode::Compare, vec![lhs, rhs]),
            ["simp", "for", target] => (Opcode::Jump, vec![target]),
            ["go", "touch", "some", "grass"] => (Opcode::Return, vec![]),
            _ => (Opcode::Undefined, vec![]),
        };
        Instruction {
            opcode,
            operands: operands.into_iter().map(str::to_owned).collect(),
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Operand strings in execution order (destination first where there is one).
    pub fn operands(&self) -> &[String] {
        &self.operands
    }

    pub fn is_valid(&self) -> bool {
        self.opcode != Opcode::Undefined
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(line: &str) -> (Opcode, Vec<String>) {
        let i = Instruction::decode(line);
        (i.opcode(), i.operands().to_vec())
    }

    fn ops(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn blank_is_nop() {
        assert_eq!(decode(""), (Opcode::Nop, vec![]));
        assert_eq!(decode("   \t "), (Opcode::Nop, vec![]));
    }

    #[test]
    fn input_output() {
        assert_eq!(decode("yoink a"), (Opcode::Input, ops(&["a"])));
        assert_eq!(decode("  yeet   a[2] "), (Opcode::Output, ops(&["a[2]"])));
    }

    #[test]
    fn assign() {
        assert_eq!(
            decode("bruh x is lowkey just -5"),
            (Opcode::Assign, ops(&["x", "-5"]))
        );
    }

    #[test]
    fn add_strips_trailing_star() {
        assert_eq!(
            decode("*slaps 3 on top of total*"),
            (Opcode::Add, ops(&["total", "3"]))
        );
    }

    #[test]
    fn add_requires_star_suffix() {
        assert_eq!(decode("*slaps 3 on top of total").0, Opcode::Undefined);
        assert_eq!(decode("*slaps 3 on top of *").0, Opcode::Undefined);
    }

    #[test]
    fn sub_compare_jump_return() {
        assert_eq!(
            decode("rip this b fell off by a"),
            (Opcode::Sub, ops(&["b", "a"]))
        );
        assert_eq!(
            decode("vibe check x ratios 0"),
            (Opcode::Compare, ops(&["x", "0"]))
        );
        assert_eq!(decode("simp for 12"), (Opcode::Jump, ops(&["12"])));
        assert_eq!(decode("go touch some grass"), (Opcode::Return, vec![]));
    }

    #[test]
    fn wrong_token_count_is_undefined() {
        assert_eq!(decode("yeet").0, Opcode::Undefined);
        assert_eq!(decode("yoink a b").0, Opcode::Undefined);
        assert_eq!(decode("go touch grass").0, Opcode::Undefined);
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(decode("YEET a").0, Opcode::Undefined);
        assert!(!Instruction::decode("Go touch some grass").is_valid());
    }
}
