//! `basedrc` configuration file parser.
//!
//! The rc file uses the same line syntax as a TF-style `.tfrc`:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | set a setting |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! Recognised settings:
//!
//! | Name | Meaning | Default |
//! |------|---------|---------|
//! | `budget` | cost budget for `based run` | 1 000 000 |
//! | `seed` | judge seed (decimal or `0x` hex) | `0xba5ed` |
//! | `log` | default tracing filter | `warn` |

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;

use crate::judge::Judge;

/// Default cost budget for a plain run.
pub const DEFAULT_BUDGET: usize = 1_000_000;

/// Name of the rc file inside the config directory.
pub const RC_FILE_NAME: &str = "basedrc";

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Settings read from a `basedrc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub budget: usize,
    pub seed: u64,
    /// Default `tracing_subscriber::EnvFilter` directive.
    pub log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            budget: DEFAULT_BUDGET,
            seed: Judge::DEFAULT_SEED,
            log: "warn".to_owned(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an rc string.
    ///
    /// Returns the config and one [`ConfigError`] per bad recognised line;
    /// bad lines leave the corresponding setting at its previous value.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let Some(directive) = raw.trim().strip_prefix('/') else { continue };
            let mut words = directive.split_whitespace();
            if words.next() != Some("set") {
                continue;
            }
            let words: Vec<&str> = words.collect();
            if let Err(message) = parse_set(&words).and_then(|(name, value)| config.apply(name, &value)) {
                errors.push(ConfigError { line: i + 1, message });
            }
        }

        (config, errors)
    }

    /// Read and parse an rc file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    fn apply(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "budget" => {
                self.budget = value
                    .parse()
                    .map_err(|_| format!("/set: invalid budget '{value}'"))?;
            }
            "seed" => {
                self.seed = parse_u64(value).ok_or_else(|| format!("/set: invalid seed '{value}'"))?;
            }
            "log" => self.log = value.to_owned(),
            other => return Err(format!("/set: unknown setting '{other}'")),
        }
        Ok(())
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_u64(s: &str) -> Option<u64> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

// ── /set ─────────────────────────────────────────────────────────────────────

/// Parse `/set <name>=<value>` or `/set <name> <value...>` from the words
/// after `/set`.
fn parse_set<'a>(words: &[&'a str]) -> Result<(&'a str, String), String> {
    let (name, value) = match words {
        [] => return Err("/set: requires an argument".into()),
        [first, rest @ ..] => match first.split_once('=') {
            Some((name, value)) => (name, value.to_owned()),
            None if !rest.is_empty() => (*first, rest.join(" ")),
            None => return Err(format!("/set: missing value for '{first}'")),
        },
    };
    if name.is_empty() {
        return Err("/set: setting name cannot be empty".into());
    }
    Ok((name, value))
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the rc file in the standard locations: the platform config
/// directory (`~/.config/based/basedrc` on Linux), then `./.basedrc`.
pub fn find_config() -> Option<PathBuf> {
    let platform = ProjectDirs::from("", "", "based").map(|dirs| dirs.config_dir().join(RC_FILE_NAME));
    platform
        .into_iter()
        .chain(std::iter::once(PathBuf::from(".basedrc")))
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
