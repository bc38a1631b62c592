//! Command-line parsing and command dispatch.
//!
//! Usage:
//!   based [-c <rc>] [-v...] run <file> [-i <input>]... [--budget <n>]
//!   based [-c <rc>] [-v...] judge <task> <file> [--seed <n>]
//!   based [-c <rc>] [-v...] check <file>
//!
//! `<file>` may be `-` for stdin.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;
use tracing::info;

use crate::config::{find_config, Config, ConfigError};
use crate::fault::Fault;
use crate::judge::{Judge, TaskKind, UnknownTask};
use crate::program::Program;
use crate::value::Variable;

/// Exit status for an accepted run, judge or check.
pub const EXIT_OK: u8 = 0;
/// Exit status for a fault or a rejected submission.
pub const EXIT_FAILED: u8 = 1;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "based", version, about = "Run and judge based programs")]
pub struct CliArgs {
    /// rc file to load instead of searching the default locations.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a program and print everything it outputs.
    Run {
        /// Program source (`-` for stdin).
        file: PathBuf,

        /// Input value: an integer (`5`) or an array (`[1,-1,2]`).  Repeatable.
        #[arg(short, long = "input", value_name = "VALUE", allow_hyphen_values = true)]
        inputs: Vec<Variable>,

        /// Cost budget (overrides the rc file).
        #[arg(long)]
        budget: Option<usize>,
    },

    /// Judge a program against one of the reference tasks (1-4).
    Judge {
        #[arg(value_parser = clap::value_parser!(u32).range(1..=4))]
        task: u32,

        /// Program source (`-` for stdin).
        file: PathBuf,

        /// Generator seed (overrides the rc file).
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Decode a program without running it.
    Check {
        /// Program source (`-` for stdin).
        file: PathBuf,
    },
}

/// Inputs used by `based run` when none are given on the command line.
pub fn default_inputs() -> Vec<Variable> {
    vec![
        Variable::Scalar(5),
        Variable::Array(vec![1, -1, 2, -3, 5]),
        Variable::Scalar(3),
    ]
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or a clap error.
pub fn parse_args() -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse()
}

/// Parse a slice of argument strings (exposed for testing).  The first
/// element is the program name.
pub fn parse_argv<I, T>(argv: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    CliArgs::try_parse_from(argv)
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// A failure that ends a command.  Printed by `main` as `based: <error>`.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}: {source}", path.display())]
    Source { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Fault(#[from] Fault),

    #[error(transparent)]
    Task(#[from] UnknownTask),

    #[error("write failed: {0}")]
    Output(#[from] std::io::Error),
}

fn load_source(path: &Path) -> Result<String, CliError> {
    read_source(path).map_err(|source| CliError::Source { path: path.to_owned(), source })
}

/// Run the parsed command, writing results to `out`, and return its exit
/// status.
///
/// For `run`, everything the program printed is written before a fault is
/// returned.
pub fn execute(args: &CliArgs, config: &Config, out: &mut impl Write) -> Result<u8, CliError> {
    match &args.command {
        Command::Run { file, inputs, budget } => {
            let mut program = Program::from_source(&load_source(file)?)?;
            let inputs = if inputs.is_empty() { default_inputs() } else { inputs.clone() };
            for input in inputs {
                program.add_input(input);
            }
            let result = program.run(budget.unwrap_or(config.budget));
            while let Some(value) = program.take_output() {
                writeln!(out, "{value}")?;
            }
            info!(steps = program.steps(), runtime = program.runtime(), "run finished");
            result?;
            Ok(EXIT_OK)
        }
        Command::Judge { task, file, seed } => {
            let kind = TaskKind::try_from(*task)?;
            let src = load_source(file)?;
            let mut judge = Judge::new(seed.unwrap_or(config.seed));
            match judge.judge(kind, &src) {
                Ok(()) => {
                    writeln!(out, "ok")?;
                    Ok(EXIT_OK)
                }
                Err(rejection) => {
                    writeln!(out, "{rejection}")?;
                    Ok(EXIT_FAILED)
                }
            }
        }
        Command::Check { file } => {
            let program = Program::from_source(&load_source(file)?)?;
            writeln!(out, "{} instructions", program.len())?;
            Ok(EXIT_OK)
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Read program source from `path`, or from stdin when `path` is `-`.
pub fn read_source(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut src = String::new();
        std::io::stdin().read_to_string(&mut src)?;
        Ok(src)
    } else {
        std::fs::read_to_string(path)
    }
}

/// Load the explicit rc file, or the first one found in the default
/// locations, or defaults.
pub fn load_config(explicit: Option<&Path>) -> std::io::Result<(Config, Vec<ConfigError>)> {
    match explicit {
        Some(path) => Config::load_file(path),
        None => match find_config() {
            Some(path) => Config::load_file(&path),
            None => Ok((Config::default(), Vec::new())),
        },
    }
}

/// Default log filter: `-v` wins over the rc file's `log` setting.
pub fn log_filter(verbose: u8, config: &Config) -> String {
    match verbose {
        0 => config.log.clone(),
        1 => "debug".to_owned(),
        _ => "trace".to_owned(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
