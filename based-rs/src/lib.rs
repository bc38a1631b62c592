//! Interpreter and judge for the based instruction language.
//!
//! A based program is a list of lines, one instruction each.  Lines are
//! decoded once ([`decode`]), operands are resolved lazily against a
//! per-program variable store ([`resolve`], [`var`]), and the engine
//! ([`program`]) executes one line at a time against a cost budget.  Every
//! failure is a [`Fault`].
//!
//! # Quick start
//!
//! ```rust
//! use based::{Program, Variable};
//!
//! let mut prog = Program::from_source("yoink a\nyeet a[2]\ngo touch some grass").unwrap();
//! prog.add_input(vec![1, -1, 2, -3, 5]);
//! prog.run(1_000).unwrap();
//! assert_eq!(prog.take_output(), Some(Variable::Scalar(2)));
//! ```

pub mod cli;
pub mod config;
pub mod decode;
pub mod fault;
pub mod judge;
pub mod program;
pub mod resolve;
pub mod value;
pub mod var;

// Re-exports for convenience.
pub use decode::{Instruction, Opcode};
pub use fault::Fault;
pub use program::{Program, State};
pub use value::{Shape, Variable};
