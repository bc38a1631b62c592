//! Randomised differential judge.
//!
//! A submission is decoded once and then run against freshly generated test
//! cases for one of four reference problems.  Each trial runs on a clone of
//! the decoded program, so no state leaks between trials.
//!
//! | Task | Inputs | Expected output | Trials | Budget |
//! |------|--------|-----------------|--------|--------|
//! | 1 sum | `a`, `b` | `a + b` | 10 | 100 000 |
//! | 2 abs | `a` | `|a|` | 10 | 100 000 |
//! | 3 max | `n`, `a[n]` | `max(a)` | n = 1..=50 | 100 000 |
//! | 4 k-th largest | `n`, `a[n]`, `k` | k-th largest of `a` | n = 1..=50, `25/n + 1` each | 2 500 000 |
//!
//! Random values are drawn uniformly from `[-10^18, 10^18]` by a generator the
//! caller seeds explicitly; the same seed always produces the same cases.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fault::Fault;
use crate::program::Program;

/// Magnitude bound for generated values.
pub const VALUE_LIMIT: i64 = 1_000_000_000_000_000_000;

/// Largest array length used by the array tasks.
pub const MAX_LEN: usize = 50;

/// Task 4 runs `KTH_TRIALS_NUMERATOR / n + 1` trials for each length `n`.
pub const KTH_TRIALS_NUMERATOR: usize = 25;

// ── Verdicts ──────────────────────────────────────────────────────────────────

/// The program ran to completion but its output was wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Mismatch {
    #[error("nothing was printed")]
    NothingPrinted,
    #[error("printed an entire array")]
    ArrayPrinted,
    #[error("expected {expected}, found {found}")]
    WrongValue { expected: i64, found: i64 },
    #[error("too much output")]
    TooMuchOutput,
}

/// Why a submission was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The interpreter itself failed (decode, runtime or budget).
    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("wrong answer: {0}")]
    WrongAnswer(#[from] Mismatch),

    /// The source mentions the word "based".
    #[error("\"based\"? absolutely nothing to say to that")]
    Based,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task id {0}, expected 1 to 4")]
pub struct UnknownTask(pub u32);

// ── Tasks ─────────────────────────────────────────────────────────────────────

/// A reference problem: enqueues one test case and knows its answer.
pub trait Task {
    /// Feed a fresh test case into `program` and return the expected answer.
    fn prepare<R: Rng + ?Sized>(&self, program: &mut Program, rng: &mut R) -> i64;

    /// Run one trial and compare the single printed integer with the answer.
    fn run_and_check<R: Rng + ?Sized>(
        &self,
        mut program: Program,
        rng: &mut R,
        budget: usize,
    ) -> Result<(), Rejection> {
        let answer = self.prepare(&mut program, rng);
        program.run(budget)?;
        let found = match program.fetch_output::<i64>() {
            Ok(found) => found,
            Err(Fault::NoOutput) => return Err(Mismatch::NothingPrinted.into()),
            Err(Fault::Shape { .. }) => return Err(Mismatch::ArrayPrinted.into()),
            Err(fault) => return Err(fault.into()),
        };
        if found != answer {
            return Err(Mismatch::WrongValue { expected: answer, found }.into());
        }
        if program.has_output() {
            return Err(Mismatch::TooMuchOutput.into());
        }
        Ok(())
    }
}

fn random_value<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    rng.gen_range(-VALUE_LIMIT..=VALUE_LIMIT)
}

fn random_values<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<i64> {
    (0..n).map(|_| random_value(rng)).collect()
}

fn len_input(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Task 1: print `a + b`.
#[derive(Debug, Clone, Copy)]
pub struct Sum;

impl Task for Sum {
    fn prepare<R: Rng + ?Sized>(&self, program: &mut Program, rng: &mut R) -> i64 {
        let a = random_value(rng);
        let b = random_value(rng);
        program.add_input(a);
        program.add_input(b);
        a + b
    }
}

/// Task 2: print `|a|`.
#[derive(Debug, Clone, Copy)]
pub struct Abs;

impl Task for Abs {
    fn prepare<R: Rng + ?Sized>(&self, program: &mut Program, rng: &mut R) -> i64 {
        let a = random_value(rng);
        program.add_input(a);
        a.abs()
    }
}

/// Task 3: print the maximum of an `n`-element array.
#[derive(Debug, Clone, Copy)]
pub struct Max {
    pub n: usize,
}

impl Task for Max {
    fn prepare<R: Rng + ?Sized>(&self, program: &mut Program, rng: &mut R) -> i64 {
        let values = random_values(rng, self.n);
        let answer = values.iter().copied().max().unwrap_or_default();
        program.add_input(len_input(self.n));
        program.add_input(values);
        answer
    }
}

/// Task 4: print the `k`-th largest element of an `n`-element array.
#[derive(Debug, Clone, Copy)]
pub struct KthLargest {
    pub n: usize,
}

impl Task for KthLargest {
    fn prepare<R: Rng + ?Sized>(&self, program: &mut Program, rng: &mut R) -> i64 {
        let n = self.n.max(1);
        let k = rng.gen_range(1..=n);
        let values = random_values(rng, n);
        let mut sorted = values.clone();
        let answer = *sorted.select_nth_unstable(n - k).1;
        program.add_input(len_input(n));
        program.add_input(values);
        program.add_input(len_input(k));
        answer
    }
}

// ── Task selection ────────────────────────────────────────────────────────────

/// The four reference problems by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Sum = 1,
    Abs = 2,
    Max = 3,
    KthLargest = 4,
}

impl TaskKind {
    /// Cost budget for a single trial.
    pub fn budget(self) -> usize {
        match self {
            TaskKind::Sum | TaskKind::Abs | TaskKind::Max => 100_000,
            TaskKind::KthLargest => 2_500_000,
        }
    }
}

impl TryFrom<u32> for TaskKind {
    type Error = UnknownTask;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(TaskKind::Sum),
            2 => Ok(TaskKind::Abs),
            3 => Ok(TaskKind::Max),
            4 => Ok(TaskKind::KthLargest),
            other => Err(UnknownTask(other)),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Sum => "sum",
            TaskKind::Abs => "abs",
            TaskKind::Max => "max",
            TaskKind::KthLargest => "kth-largest",
        };
        f.write_str(name)
    }
}

fn kth_trials(n: usize) -> usize {
    KTH_TRIALS_NUMERATOR / n + 1
}

// ── Judge ─────────────────────────────────────────────────────────────────────

/// Drives submissions through the reference problems with its own seeded
/// generator.
#[derive(Debug, Clone)]
pub struct Judge {
    rng: StdRng,
}

impl Judge {
    pub const DEFAULT_SEED: u64 = 0xba5ed;

    pub fn new(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Judge { rng }
    }

    /// Judge `source` against `kind`.  Returns the first rejection.
    pub fn judge(&mut self, kind: TaskKind, source: &str) -> Result<(), Rejection> {
        if source.to_lowercase().contains("based") {
            warn!(task = %kind, "submission rejected: mentions \"based\"");
            return Err(Rejection::Based);
        }
        let program = Program::from_source(source)?;
        info!(task = %kind, instructions = program.len(), "judging submission");

        let budget = kind.budget();
        let result = match kind {
            TaskKind::Sum => (0..10).try_for_each(|_| self.trial(&Sum, &program, budget)),
            TaskKind::Abs => (0..10).try_for_each(|_| self.trial(&Abs, &program, budget)),
            TaskKind::Max => {
                (1..=MAX_LEN).try_for_each(|n| self.trial(&Max { n }, &program, budget))
            }
            TaskKind::KthLargest => (1..=MAX_LEN).try_for_each(|n| {
                (0..kth_trials(n))
                    .try_for_each(|_| self.trial(&KthLargest { n }, &program, budget))
            }),
        };
        match &result {
            Ok(()) => info!(task = %kind, "accepted"),
            Err(rejection) => info!(task = %kind, %rejection, "rejected"),
        }
        result
    }

    fn trial<T: Task + fmt::Debug>(
        &mut self,
        task: &T,
        program: &Program,
        budget: usize,
    ) -> Result<(), Rejection> {
        let result = task.run_and_check(program.clone(), &mut self.rng, budget);
        if let Err(rejection) = &result {
            debug!(?task, %rejection, "trial failed");
        }
        result
    }
}

impl Default for Judge {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SUM: &str = "yoink a\nyoink b\n*slaps b on top of a*\nyeet a\ngo touch some grass";

    #[test]
    fn kth_trial_counts() {
        assert_eq!(kth_trials(1), 26);
        assert_eq!(kth_trials(12), 3);
        assert_eq!(kth_trials(13), 2);
        assert_eq!(kth_trials(26), 1);
        assert_eq!(kth_trials(MAX_LEN), 1);
        assert_eq!((1..=MAX_LEN).map(kth_trials).sum::<usize>(), 137);
    }

    #[test]
    fn task_ids() {
        assert_eq!(TaskKind::try_from(1), Ok(TaskKind::Sum));
        assert_eq!(TaskKind::try_from(4), Ok(TaskKind::KthLargest));
        assert_eq!(TaskKind::try_from(5), Err(UnknownTask(5)));
        assert_eq!(TaskKind::try_from(0), Err(UnknownTask(0)));
    }

    #[test]
    fn sum_accepted() {
        assert_eq!(Judge::default().judge(TaskKind::Sum, SUM), Ok(()));
    }

    #[test]
    fn sum_program_fails_abs() {
        // Reads a second input that task 2 never provides.
        let err = Judge::default().judge(TaskKind::Abs, SUM).unwrap_err();
        assert!(matches!(err, Rejection::Fault(Fault::Runtime { line: 2, .. })), "{err:?}");
    }

    #[test]
    fn based_is_rejected_before_decoding() {
        let src = "yoink a\nyeet a ; BaSeD\n";
        assert_eq!(Judge::default().judge(TaskKind::Abs, src), Err(Rejection::Based));
    }

    #[test]
    fn decode_fault_is_reported() {
        let err = Judge::default().judge(TaskKind::Sum, "yeet").unwrap_err();
        assert!(matches!(err, Rejection::Fault(Fault::Decode { line: 1, .. })));
    }

    #[test]
    fn nothing_printed() {
        let src = "yoink a\nyoink b\ngo touch some grass";
        assert_eq!(
            Judge::default().judge(TaskKind::Sum, src),
            Err(Rejection::WrongAnswer(Mismatch::NothingPrinted))
        );
    }

    #[test]
    fn array_printed() {
        let src = "yoink n\nyoink a\nyeet a\ngo touch some grass";
        assert_eq!(
            Judge::default().judge(TaskKind::Max, src),
            Err(Rejection::WrongAnswer(Mismatch::ArrayPrinted))
        );
    }

    #[test]
    fn too_much_output() {
        let src = "yoink a\nyoink b\n*slaps b on top of a*\nyeet a\nyeet a\ngo touch some grass";
        assert_eq!(
            Judge::default().judge(TaskKind::Sum, src),
            Err(Rejection::WrongAnswer(Mismatch::TooMuchOutput))
        );
    }

    #[test]
    fn infinite_loop_exhausts_budget() {
        let src = "yoink a\nsimp for 2";
        let err = Judge::default().judge(TaskKind::Abs, src).unwrap_err();
        assert_eq!(err, Rejection::Fault(Fault::Budget { line: 2 }));
    }

    #[test]
    fn same_seed_same_cases() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let base = Program::from_source("go touch some grass").unwrap();
        let (mut pa, mut pb) = (base.clone(), base);
        assert_eq!(
            KthLargest { n: 20 }.prepare(&mut pa, &mut a),
            KthLargest { n: 20 }.prepare(&mut pb, &mut b)
        );
    }

    #[test]
    fn kth_largest_answer_matches_sorted_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut program =
            Program::from_source("yoink n\nyoink a\nyoink k\nyeet a\nyeet k\ngo touch some grass")
                .unwrap();
        let answer = KthLargest { n: 9 }.prepare(&mut program, &mut rng);
        program.run(10_000).unwrap();
        let mut values = program.fetch_output::<Vec<i64>>().unwrap();
        let k = program.fetch_output::<i64>().unwrap() as usize;
        assert!((1..=9).contains(&k));
        values.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(values[k - 1], answer);
    }

    #[test]
    fn generated_values_within_limit() {
        let mut rng = StdRng::seed_from_u64(3);
        for v in random_values(&mut rng, 200) {
            assert!((-VALUE_LIMIT..=VALUE_LIMIT).contains(&v));
        }
    }
}
