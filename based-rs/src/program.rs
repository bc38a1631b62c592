//! Execution engine.
//!
//! A [`Program`] is built once from a finished source listing.  Every line is
//! decoded up front; the instruction and cost tables never change afterwards.
//! Execution is a single-step loop over an explicit program counter:
//!
//! ```text
//! Running ──step──▶ Running
//!    │ └──fault──▶ Faulted   (terminal)
//!    └──return──▶ Halted    (terminal)
//! ```
//!
//! Each executed line costs its byte length plus [`INSTRUCTION_BASE_COST`];
//! [`Program::run`] stops with a budget fault once the accumulated cost
//! reaches the caller's limit without a `Return`.
//!
//! # Example
//!
//! ```rust
//! use based::program::Program;
//!
//! let mut prog = Program::from_source(
//!     "yoink a\nyoink b\n*slaps a on top of b*\nyeet b\ngo touch some grass",
//! ).unwrap();
//! prog.add_input(3);
//! prog.add_input(4);
//! prog.run(10_000).unwrap();
//! assert_eq!(prog.fetch_output::<i64>(), Ok(7));
//! ```

use std::collections::VecDeque;
use std::str::FromStr;

use tracing::{debug, instrument, trace};

use crate::decode::{Instruction, Opcode};
use crate::fault::{compress, Fault, DISPLAY_LIMIT};
use crate::resolve::{is_identifier, parse_integer_literal, validate_identifier, OnMissing, Resolver};
use crate::value::{FromVariable, Variable};
use crate::var::VarStore;

/// Fixed cost added to every executed line on top of its length.
pub const INSTRUCTION_BASE_COST: usize = 5;

// ── State ─────────────────────────────────────────────────────────────────────

/// Execution state.  `Halted` and `Faulted` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
    /// The run failed; the fault is kept so later calls report the same one.
    Faulted(Fault),
}

// ── Program ───────────────────────────────────────────────────────────────────

/// A decoded based program together with its runtime state.
#[derive(Debug, Clone)]
pub struct Program {
    instructions: Vec<Instruction>,
    /// Per-instruction cost, parallel to `instructions`.
    costs: Vec<usize>,
    vars: VarStore,
    input: VecDeque<Variable>,
    output: VecDeque<Variable>,
    /// 0-based index of the next instruction.  Signed: a jump may leave it
    /// anywhere, and the next step faults if it is out of range.
    pc: i64,
    state: State,
    runtime: usize,
    steps: u64,
}

impl Program {
    /// Decode `lines` into a program.
    ///
    /// Fails with [`Fault::Decode`] on the first line that matches no
    /// instruction shape; no partial program is produced.
    pub fn new<S: AsRef<str>>(lines: &[S]) -> Result<Self, Fault> {
        let mut instructions = Vec::with_capacity(lines.len());
        let mut costs = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            let instruction = Instruction::decode(line);
            if !instruction.is_valid() {
                debug!(line = index + 1, text = %compress(line, DISPLAY_LIMIT), "undecodable line");
                return Err(Fault::decode(index, line));
            }
            instructions.push(instruction);
            costs.push(line.len() + INSTRUCTION_BASE_COST);
        }
        debug!(instructions = instructions.len(), "program decoded");
        Ok(Program {
            instructions,
            costs,
            vars: VarStore::new(),
            input: VecDeque::new(),
            output: VecDeque::new(),
            pc: 0,
            state: State::Running,
            runtime: 0,
            steps: 0,
        })
    }

    /// Split `src` into lines and decode them.
    pub fn from_source(src: &str) -> Result<Self, Fault> {
        let lines: Vec<&str> = src.lines().collect();
        Self::new(&lines)
    }

    // ── I/O queues ────────────────────────────────────────────────────────────

    /// Enqueue a scalar (`i64`) or an array (`Vec<i64>`) for `yoink`.
    pub fn add_input(&mut self, value: impl Into<Variable>) {
        self.input.push_back(value.into());
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// Dequeue the earliest output, checked against the expected shape.
    ///
    /// On a shape mismatch the value stays queued and [`Fault::Shape`] is
    /// returned; an empty queue yields [`Fault::NoOutput`].
    pub fn fetch_output<T: FromVariable>(&mut self) -> Result<T, Fault> {
        let front = self.output.front().ok_or(Fault::NoOutput)?;
        let value = T::from_variable(front).ok_or_else(|| Fault::Shape {
            expected: T::SHAPE,
            found: front.shape(),
        })?;
        self.output.pop_front();
        Ok(value)
    }

    /// Dequeue the earliest output whatever its shape.
    pub fn take_output(&mut self) -> Option<Variable> {
        self.output.pop_front()
    }

    // ── Introspection ─────────────────────────────────────────────────────────

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == State::Halted
    }

    pub fn pc(&self) -> i64 {
        self.pc
    }

    /// Accumulated cost of every executed step.
    pub fn runtime(&self) -> usize {
        self.runtime
    }

    /// Number of executed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Cost charged for executing the instruction at `index`.
    pub fn cost(&self, index: usize) -> Option<usize> {
        self.costs.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    /// Run until `Return` or until the accumulated cost reaches `budget`.
    #[instrument(level = "debug", skip(self), fields(instructions = self.instructions.len()))]
    pub fn run(&mut self, budget: usize) -> Result<(), Fault> {
        loop {
            if let State::Faulted(fault) = &self.state {
                return Err(fault.clone());
            }
            if self.is_halted() {
                debug!(steps = self.steps, runtime = self.runtime, "halted");
                return Ok(());
            }
            if self.runtime >= budget {
                let fault = Fault::budget(self.pc);
                debug!(pc = self.pc, runtime = self.runtime, "budget exhausted");
                self.state = State::Faulted(fault.clone());
                return Err(fault);
            }
            self.step()?;
        }
    }

    /// Execute exactly one instruction.  A halted program stays halted; a
    /// faulted one reports its fault again.
    pub fn step(&mut self) -> Result<(), Fault> {
        match &self.state {
            State::Running => {}
            State::Halted => return Ok(()),
            State::Faulted(fault) => return Err(fault.clone()),
        }
        self.execute_one().map_err(|fault| {
            debug!(%fault, "program faulted");
            self.state = State::Faulted(fault.clone());
            fault
        })
    }

    fn execute_one(&mut self) -> Result<(), Fault> {
        let pc = self.pc;
        let index = usize::try_from(pc)
            .ok()
            .filter(|&i| i < self.instructions.len())
            .ok_or_else(|| Fault::runtime(pc, "that's not even a line"))?;

        self.runtime = self.runtime.saturating_add(self.costs[index]);
        self.steps += 1;
        let mut next_pc = pc.wrapping_add(1);

        let instruction = &self.instructions[index];
        let opcode = instruction.opcode();
        trace!(pc, %opcode, runtime = self.runtime, "step");

        match (opcode, instruction.operands()) {
            (Opcode::Nop, []) => {}
            (Opcode::Input, [dest]) => {
                if self.input.is_empty() {
                    return Err(Fault::runtime(pc, "reading from an empty input queue"));
                }
                validate_identifier(dest, pc)?;
                if let Some(value) = self.input.pop_front() {
                    self.vars.bind(dest.clone(), value);
                }
            }
            (Opcode::Output, [src]) => {
                let value = if is_identifier(src) {
                    self.vars.get(src).cloned().ok_or_else(|| {
                        Fault::runtime(
                            pc,
                            format!(
                                "printing a variable that does not exist: '{}'",
                                compress(src, DISPLAY_LIMIT)
                            ),
                        )
                    })?
                } else {
                    Variable::Scalar(Resolver::new(&mut self.vars, pc).value(src)?)
                };
                self.output.push_back(value);
            }
            (Opcode::Assign, [dest, src]) => {
                let mut resolver = Resolver::new(&mut self.vars, pc);
                let value = resolver.value(src)?;
                *resolver.reference(dest, OnMissing::Create)? = value;
            }
            (Opcode::Add, [dest, amount]) => {
                let mut resolver = Resolver::new(&mut self.vars, pc);
                let amount = resolver.value(amount)?;
                let slot = resolver.reference(dest, OnMissing::Fault)?;
                *slot = slot.wrapping_add(amount);
            }
            (Opcode::Sub, [dest, amount]) => {
                let mut resolver = Resolver::new(&mut self.vars, pc);
                let amount = resolver.value(amount)?;
                let slot = resolver.reference(dest, OnMissing::Fault)?;
                *slot = slot.wrapping_sub(amount);
            }
            (Opcode::Compare, [lhs, rhs]) => {
                let resolver = Resolver::new(&mut self.vars, pc);
                // Skip the next line unless lhs > rhs.
                if resolver.value(lhs)? <= resolver.value(rhs)? {
                    next_pc = pc.wrapping_add(2);
                }
            }
            (Opcode::Jump, [target]) => {
                next_pc = parse_integer_literal(target, pc)?.wrapping_sub(1);
            }
            (Opcode::Return, []) => {
                self.state = State::Halted;
            }
            (opcode, _) => {
                return Err(Fault::runtime(pc, format!("malformed {opcode} instruction")));
            }
        }

        self.pc = next_pc;
        Ok(())
    }
}

impl FromStr for Program {
    type Err = Fault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_source(s)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultKind;
    use crate::value::Shape;

    fn program(src: &str) -> Program {
        Program::from_source(src).expect("decode failed")
    }

    fn runtime_message(fault: Fault) -> String {
        match fault {
            Fault::Runtime { message, .. } => message,
            other => panic!("expected runtime fault, got {other:?}"),
        }
    }

    #[test]
    fn sum_of_two_inputs() {
        let mut p = program("yoink a\nyoink b\n*slaps a on top of b*\nyeet b\ngo touch some grass");
        p.add_input(3);
        p.add_input(4);
        p.run(1_000).unwrap();
        assert_eq!(p.fetch_output::<i64>(), Ok(7));
        assert!(!p.has_output());
        assert!(p.is_halted());
    }

    #[test]
    fn decode_fault_aborts_construction() {
        let err = Program::from_source("yoink a\nyeet\ngo touch some grass").unwrap_err();
        assert_eq!(err, Fault::Decode { line: 2, text: "yeet".into() });
    }

    #[test]
    fn output_array_element() {
        let mut p = program("yoink a\nyeet a[2]\ngo touch some grass");
        p.add_input(vec![1, -1, 2, -3, 5]);
        p.run(1_000).unwrap();
        assert_eq!(p.fetch_output::<i64>(), Ok(2));
    }

    #[test]
    fn output_whole_array() {
        let mut p = program("yoink a\nyeet a\ngo touch some grass");
        p.add_input(vec![4, 5]);
        p.run(1_000).unwrap();
        assert_eq!(p.fetch_output::<Vec<i64>>(), Ok(vec![4, 5]));
    }

    #[test]
    fn output_literal() {
        let mut p = program("yeet -12\ngo touch some grass");
        p.run(1_000).unwrap();
        assert_eq!(p.fetch_output::<i64>(), Ok(-12));
    }

    #[test]
    fn fetch_output_shape_mismatch_does_not_consume() {
        let mut p = program("yoink a\nyeet a\ngo touch some grass");
        p.add_input(vec![1]);
        p.run(1_000).unwrap();
        assert_eq!(
            p.fetch_output::<i64>(),
            Err(Fault::Shape { expected: Shape::Scalar, found: Shape::Array })
        );
        assert!(p.has_output());
        assert_eq!(p.fetch_output::<Vec<i64>>(), Ok(vec![1]));
        assert_eq!(p.fetch_output::<i64>(), Err(Fault::NoOutput));
    }

    #[test]
    fn budget_fault_at_first_line() {
        let mut p = program("simp for 1");
        let err = p.run(3).unwrap_err();
        assert_eq!(err, Fault::Budget { line: 1 });
        assert_eq!(p.pc(), 0);
    }

    #[test]
    fn zero_budget_executes_nothing() {
        let mut p = program("go touch some grass");
        assert_eq!(p.run(0), Err(Fault::budget(0)));
        assert_eq!(p.steps(), 0);
    }

    #[test]
    fn cost_is_line_length_plus_base() {
        let mut p = program("bruh x is lowkey just 1\n\ngo touch some grass");
        p.run(1_000).unwrap();
        let expected = ("bruh x is lowkey just 1".len() + INSTRUCTION_BASE_COST)
            + INSTRUCTION_BASE_COST
            + ("go touch some grass".len() + INSTRUCTION_BASE_COST);
        assert_eq!(p.runtime(), expected);
        assert_eq!(p.steps(), 3);
    }

    #[test]
    fn cost_table_and_instructions_match_source() {
        let p = program("yoink a\n\nsimp for 1");
        assert_eq!(p.len(), 3);
        assert_eq!(p.cost(0), Some("yoink a".len() + INSTRUCTION_BASE_COST));
        assert_eq!(p.cost(1), Some(INSTRUCTION_BASE_COST));
        assert_eq!(p.cost(2), Some("simp for 1".len() + INSTRUCTION_BASE_COST));
        assert_eq!(p.cost(3), None);

        let opcodes: Vec<Opcode> = p.instructions().iter().map(Instruction::opcode).collect();
        assert_eq!(opcodes, [Opcode::Input, Opcode::Nop, Opcode::Jump]);
        assert_eq!(p.instructions()[2].operands(), ["1"]);
    }

    #[test]
    fn assign_creates_add_and_sub_require_existing() {
        let mut p = program("bruh x is lowkey just 5\ngo touch some grass");
        p.run(1_000).unwrap();
        assert_eq!(p.variable("x"), Some(&Variable::Scalar(5)));

        let mut p = program("*slaps 1 on top of y*\ngo touch some grass");
        assert_eq!(runtime_message(p.run(1_000).unwrap_err()), "no such integer: 'y'");

        let mut p = program("rip this y fell off by 1\ngo touch some grass");
        assert_eq!(runtime_message(p.run(1_000).unwrap_err()), "no such integer: 'y'");
    }

    #[test]
    fn add_and_sub_wrap() {
        let mut p = program(
            "bruh big is lowkey just 9223372036854775807\n\
             *slaps 1 on top of big*\n\
             bruh small is lowkey just 0\n\
             rip this small fell off by 9223372036854775808\n\
             rip this small fell off by 1\n\
             go touch some grass",
        );
        p.run(10_000).unwrap();
        assert_eq!(p.variable("big"), Some(&Variable::Scalar(i64::MIN)));
        assert_eq!(p.variable("small"), Some(&Variable::Scalar(i64::MAX)));
    }

    #[test]
    fn compare_skips_unless_greater() {
        // 3 > 2: line 2 runs.  2 > 2 is false: line 4 is skipped.
        let mut p = program(
            "vibe check 3 ratios 2\nyeet 1\nvibe check 2 ratios 2\nyeet 2\nyeet 3\ngo touch some grass",
        );
        p.run(1_000).unwrap();
        assert_eq!(p.fetch_output::<i64>(), Ok(1));
        assert_eq!(p.fetch_output::<i64>(), Ok(3));
        assert!(!p.has_output());
    }

    #[test]
    fn jump_targets_one_based_line() {
        let mut p = program("simp for 3\nyeet 1\nyeet 2\ngo touch some grass");
        p.run(1_000).unwrap();
        assert_eq!(p.fetch_output::<i64>(), Ok(2));
        assert!(!p.has_output());
    }

    #[test]
    fn jump_out_of_range_faults_on_next_step() {
        let mut p = program("simp for 0");
        p.step().unwrap();
        assert_eq!(p.pc(), -1);
        let err = p.step().unwrap_err();
        assert_eq!(err, Fault::runtime(-1, "that's not even a line"));
        assert_eq!(err.line(), Some(0));
    }

    #[test]
    fn running_off_the_end_faults() {
        let mut p = program("yeet 1");
        let err = p.run(1_000).unwrap_err();
        assert_eq!(err, Fault::runtime(1, "that's not even a line"));
    }

    #[test]
    fn jump_target_must_be_literal() {
        let mut p = program("bruh x is lowkey just 1\nsimp for x");
        assert!(runtime_message(p.run(1_000).unwrap_err()).contains("failed to parse integer"));
    }

    #[test]
    fn input_empty_queue_faults() {
        let mut p = program("yoink a");
        assert_eq!(
            runtime_message(p.run(1_000).unwrap_err()),
            "reading from an empty input queue"
        );
    }

    #[test]
    fn input_requires_identifier() {
        let mut p = program("yoink a[0]");
        p.add_input(1);
        assert!(runtime_message(p.run(1_000).unwrap_err()).contains("invalid identifier"));
    }

    #[test]
    fn input_rebinds_shape() {
        let mut p = program("yoink a\nyoink a\ngo touch some grass");
        p.add_input(vec![1, 2]);
        p.add_input(9);
        p.run(1_000).unwrap();
        assert_eq!(p.variable("a"), Some(&Variable::Scalar(9)));
    }

    #[test]
    fn output_unknown_identifier_faults() {
        let mut p = program("yeet ghost");
        let err = p.run(1_000).unwrap_err();
        assert_eq!(err.kind(), FaultKind::Runtime);
        assert!(runtime_message(err).contains("does not exist"));
    }

    #[test]
    fn assign_to_array_element() {
        let mut p = program("yoink a\nbruh a[1] is lowkey just a[0]\nyeet a\ngo touch some grass");
        p.add_input(vec![7, 0]);
        p.run(1_000).unwrap();
        assert_eq!(p.fetch_output::<Vec<i64>>(), Ok(vec![7, 7]));
    }

    #[test]
    fn fault_is_sticky() {
        let mut p = program("yoink a\ngo touch some grass");
        let first = p.run(1_000).unwrap_err();
        p.add_input(1);
        assert_eq!(p.run(1_000), Err(first.clone()));
        assert_eq!(p.step(), Err(first.clone()));
        assert_eq!(p.state(), &State::Faulted(first));
    }

    #[test]
    fn halted_program_stays_halted() {
        let mut p = program("go touch some grass\nyeet 1");
        p.run(1_000).unwrap();
        let runtime = p.runtime();
        p.step().unwrap();
        p.run(1_000).unwrap();
        assert_eq!(p.runtime(), runtime);
        assert!(!p.has_output());
    }

    #[test]
    fn fault_line_names_faulting_instruction() {
        let mut p = program("bruh x is lowkey just 1\n\nyeet y");
        assert_eq!(p.run(1_000).unwrap_err().line(), Some(3));
    }

    #[test]
    fn clone_runs_independently() {
        let base = program("yoink a\nyeet a\ngo touch some grass");
        let mut first = base.clone();
        let mut second = base.clone();
        first.add_input(1);
        second.add_input(2);
        first.run(1_000).unwrap();
        second.run(1_000).unwrap();
        assert_eq!(first.fetch_output::<i64>(), Ok(1));
        assert_eq!(second.fetch_output::<i64>(), Ok(2));
        assert_eq!(base.steps(), 0);
    }
}
