//! Variable store.
//!
//! Identifiers come straight from untrusted program text, so the table is a
//! `HashMap` built with [`RandomState`]: SipHash-1-3 keyed with per-process
//! random keys.  Crafted identifiers cannot be chosen to collide without
//! knowing those keys.

use std::collections::hash_map::{Entry, RandomState};
use std::collections::HashMap;

use crate::value::Variable;

/// Identifier → [`Variable`] table owned by one program.
#[derive(Debug, Clone, Default)]
pub struct VarStore {
    vars: HashMap<String, Variable, RandomState>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) a variable, replacing any previous shape.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Variable>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.vars.get_mut(name)
    }

    /// Entry for in-place creation, used by auto-creating writes.
    pub fn entry(&mut self, name: &str) -> Entry<'_, String, Variable> {
        self.vars.entry(name.to_owned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
